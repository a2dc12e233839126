//! Birthday buttons and the new-birthday form
//!
//! Handles: `bd:*`
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Delete asks for confirmation
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{info, warn};

use super::{parse_arg, split_action};
use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::{escape_markdown, Button, Form, FormField, FormValues, Keyboard, Screen, Style};
use crate::features::birthdays::{
    birthday_screen, list_screen, saved_text, sort_by_next_occurrence, validate_birthday_form,
    BirthdayForm, NAME_MAX_CHARS,
};

pub const FORM_ID: &str = "bd:form";

pub struct BirthdaysHandler;

fn birthday_form(draft: Option<&FormValues>) -> Form {
    let prefill = |field: &str| draft.map(|d| d.get(field));
    Form::new(FORM_ID, "New birthday")
        .field(
            FormField::short("name", "Name")
                .placeholder("Alice")
                .max_length(NAME_MAX_CHARS as u64)
                .value(prefill("name")),
        )
        .field(
            FormField::short("date", "Date (DD.MM.YYYY or DD.MM)")
                .placeholder("15.06.1990")
                .max_length(10)
                .value(prefill("date")),
        )
}

fn to_list_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("🎂 To list", "bd:list:0"),
        Button::new("◀️ Menu", "menu:main"),
    ])
}

fn not_found() -> Reply {
    Reply::Update(Screen::new("❌ Birthday not found.", to_list_keyboard()))
}

impl BirthdaysHandler {
    async fn today(&self, ctx: &CommandContext, user_id: u64) -> Result<NaiveDate> {
        let tz = ctx.user_timezone(user_id).await?;
        Ok(Utc::now().with_timezone(&tz).date_naive())
    }

    async fn list(&self, ctx: &CommandContext, user_id: u64, page: usize) -> Result<Reply> {
        let today = self.today(ctx, user_id).await?;
        let mut birthdays = ctx.database.get_user_birthdays(user_id).await?;
        sort_by_next_occurrence(&mut birthdays, today);
        Ok(Reply::Update(list_screen(&birthdays, page, today)))
    }

    async fn view(&self, ctx: &CommandContext, user_id: u64, birthday_id: i64) -> Result<Reply> {
        let Some(birthday) = ctx.database.get_birthday(birthday_id, user_id).await? else {
            return Ok(not_found());
        };
        let today = self.today(ctx, user_id).await?;
        Ok(Reply::Update(birthday_screen(&birthday, today)))
    }

    async fn confirm_delete(&self, ctx: &CommandContext, user_id: u64, birthday_id: i64) -> Result<Reply> {
        let Some(birthday) = ctx.database.get_birthday(birthday_id, user_id).await? else {
            return Ok(not_found());
        };
        Ok(Reply::Update(Screen::new(
            format!("🗑 Delete the birthday of **{}**?", escape_markdown(&birthday.name)),
            Keyboard::new().row(vec![
                Button::new("✅ Yes, delete", format!("bd:delete_yes:{birthday_id}")).style(Style::Danger),
                Button::new("❌ No", format!("bd:view:{birthday_id}")),
            ]),
        )))
    }

    async fn delete(&self, ctx: &CommandContext, user_id: u64, birthday_id: i64) -> Result<Reply> {
        let Some(birthday) = ctx.database.get_birthday(birthday_id, user_id).await? else {
            return Ok(not_found());
        };
        if !ctx.database.delete_birthday(birthday_id, user_id).await? {
            return Ok(not_found());
        }
        info!("User {user_id} deleted birthday {birthday_id}");
        Ok(Reply::Update(Screen::new(
            format!("🗑 Birthday of **{}** deleted.", escape_markdown(&birthday.name)),
            to_list_keyboard(),
        )))
    }
}

#[async_trait]
impl InteractionHandler for BirthdaysHandler {
    fn prefix(&self) -> &'static str {
        "bd"
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        let (name, mut args) = split_action(action);
        match name {
            "list" => {
                let page = parse_arg::<usize>(args.next()).unwrap_or(0);
                self.list(ctx, user_id, page).await
            }
            "view" => self.view(ctx, user_id, parse_arg(args.next())?).await,
            "delete" => self.confirm_delete(ctx, user_id, parse_arg(args.next())?).await,
            "delete_yes" => self.delete(ctx, user_id, parse_arg(args.next())?).await,
            "add" => Ok(Reply::Form(birthday_form(ctx.draft(user_id, FORM_ID).as_ref()))),
            "noop" => Ok(Reply::Ack),
            _ => Ok(Reply::Notice("Unknown birthday action.".to_string())),
        }
    }

    async fn handle_form(
        &self,
        ctx: &CommandContext,
        user_id: u64,
        action: &str,
        values: &FormValues,
    ) -> Result<Reply> {
        if action != "form" {
            return Ok(Reply::Notice("Unknown birthday form.".to_string()));
        }

        let form = BirthdayForm {
            name: values.get("name").to_string(),
            date: values.get("date").to_string(),
        };
        let today = self.today(ctx, user_id).await?;

        match validate_birthday_form(&form, today) {
            Ok((name, date)) => {
                let birthday_id = ctx.database.add_birthday(user_id, &name, date).await?;
                ctx.clear_draft(user_id, FORM_ID);
                info!("User {user_id} saved birthday {birthday_id}");
                Ok(Reply::Update(Screen::new(saved_text(&name, &date, today), to_list_keyboard())))
            }
            Err(e) => {
                warn!("Rejected birthday form from user {user_id}: {e}");
                ctx.save_draft(user_id, FORM_ID, values.clone());
                Ok(Reply::retry(format!("❌ {e}"), "bd:add", "bd:list:0"))
            }
        }
    }
}

//! Task buttons and the new-task form
//!
//! Handles: `task:*`
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Rejected forms are re-opened with the previous input
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};

use super::{parse_arg, split_action};
use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::datetime::format_local;
use crate::core::{escape_markdown, Button, Form, FormField, FormValues, Keyboard, Screen};
use crate::features::tasks::{
    action_keyboard, created_text, delete_confirm_screen, list_screen, postpone_screen,
    postponed_due, sort_by_urgency, task_screen, validate_task_form, TaskForm,
    DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};

pub const FORM_ID: &str = "task:form";

pub struct TasksHandler;

fn task_form(draft: Option<&FormValues>) -> Form {
    let prefill = |field: &str| draft.map(|d| d.get(field));
    Form::new(FORM_ID, "New task")
        .field(
            FormField::short("title", "Title")
                .placeholder("Buy groceries")
                .max_length(TITLE_MAX_CHARS as u64)
                .value(prefill("title")),
        )
        .field(
            FormField::paragraph("description", "Description (optional)")
                .placeholder("Milk, bread, eggs")
                .max_length(DESCRIPTION_MAX_CHARS as u64)
                .optional()
                .value(prefill("description")),
        )
        .field(
            FormField::short("due", "Due (DD.MM.YYYY HH:MM)")
                .placeholder("15.10.2025 14:30")
                .max_length(16)
                .value(prefill("due")),
        )
}

fn not_found() -> Reply {
    Reply::Update(Screen::new(
        "❌ Task not found. It may have been deleted.",
        Keyboard::new().row(vec![Button::new("📋 To list", "task:list:0")]),
    ))
}

fn after_change(text: String) -> Screen {
    Screen::new(
        text,
        Keyboard::new().row(vec![
            Button::new("📋 To list", "task:list:0"),
            Button::new("◀️ Menu", "menu:main"),
        ]),
    )
}

impl TasksHandler {
    async fn list(&self, ctx: &CommandContext, user_id: u64, page: usize) -> Result<Reply> {
        let now = Utc::now();
        let tz = ctx.user_timezone(user_id).await?;
        let mut tasks = ctx.database.get_user_tasks(user_id).await?;
        sort_by_urgency(&mut tasks, now);
        Ok(Reply::Update(list_screen(&tasks, page, now, tz)))
    }

    async fn view(&self, ctx: &CommandContext, user_id: u64, task_id: i64) -> Result<Reply> {
        let Some(task) = ctx.database.get_task(task_id, user_id).await? else {
            return Ok(not_found());
        };
        let tz = ctx.user_timezone(user_id).await?;
        Ok(Reply::Update(task_screen(&task, Utc::now(), tz)))
    }

    async fn complete(&self, ctx: &CommandContext, user_id: u64, task_id: i64) -> Result<Reply> {
        let Some(task) = ctx.database.get_task(task_id, user_id).await? else {
            return Ok(not_found());
        };
        if !ctx.database.complete_task(task_id, user_id).await? {
            return Ok(not_found());
        }
        info!("User {user_id} completed task {task_id}");
        Ok(Reply::Update(after_change(format!(
            "✅ **Task completed!**\n\n{}",
            escape_markdown(&task.title)
        ))))
    }

    async fn delay(&self, ctx: &CommandContext, user_id: u64, task_id: i64, minutes: i64) -> Result<Reply> {
        let Some(task) = ctx.database.get_task(task_id, user_id).await? else {
            return Ok(not_found());
        };
        let new_due = postponed_due(&task, minutes, Utc::now());
        if !ctx.database.postpone_task(task_id, user_id, new_due).await? {
            return Ok(not_found());
        }
        let tz = ctx.user_timezone(user_id).await?;
        info!("User {user_id} postponed task {task_id} by {minutes} min");
        Ok(Reply::Update(Screen::new(
            format!(
                "⏰ **Task postponed**\n\n**{}**\nNew due time: {}",
                escape_markdown(&task.title),
                format_local(new_due, tz)
            ),
            action_keyboard(task_id, true),
        )))
    }

    async fn delete(&self, ctx: &CommandContext, user_id: u64, task_id: i64) -> Result<Reply> {
        let Some(task) = ctx.database.get_task(task_id, user_id).await? else {
            return Ok(not_found());
        };
        if !ctx.database.delete_task(task_id, user_id).await? {
            return Ok(not_found());
        }
        info!("User {user_id} deleted task {task_id}");
        Ok(Reply::Update(after_change(format!(
            "🗑 **Task deleted**\n\n{}",
            escape_markdown(&task.title)
        ))))
    }

    async fn confirm_delete(&self, ctx: &CommandContext, user_id: u64, task_id: i64) -> Result<Reply> {
        Ok(match ctx.database.get_task(task_id, user_id).await? {
            Some(task) => Reply::Update(delete_confirm_screen(&task)),
            None => not_found(),
        })
    }

    async fn postpone_menu(&self, ctx: &CommandContext, user_id: u64, task_id: i64) -> Result<Reply> {
        Ok(match ctx.database.get_task(task_id, user_id).await? {
            Some(task) => Reply::Update(postpone_screen(&task)),
            None => not_found(),
        })
    }
}

#[async_trait]
impl InteractionHandler for TasksHandler {
    fn prefix(&self) -> &'static str {
        "task"
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        let (name, mut args) = split_action(action);
        match name {
            "list" => {
                let page = parse_arg::<usize>(args.next()).unwrap_or(0);
                self.list(ctx, user_id, page).await
            }
            "view" => self.view(ctx, user_id, parse_arg(args.next())?).await,
            "done" => self.complete(ctx, user_id, parse_arg(args.next())?).await,
            "postpone" => self.postpone_menu(ctx, user_id, parse_arg(args.next())?).await,
            "delay" => {
                let task_id = parse_arg(args.next())?;
                let minutes = parse_arg(args.next())?;
                self.delay(ctx, user_id, task_id, minutes).await
            }
            "delete" => self.confirm_delete(ctx, user_id, parse_arg(args.next())?).await,
            "delete_yes" => self.delete(ctx, user_id, parse_arg(args.next())?).await,
            "add" => Ok(Reply::Form(task_form(ctx.draft(user_id, FORM_ID).as_ref()))),
            "noop" => Ok(Reply::Ack),
            _ => Ok(Reply::Notice("Unknown task action.".to_string())),
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
            return Ok(Reply::Notice("Unknown task form.".to_string()));
        }

        let form = TaskForm {
            title: values.get("title").to_string(),
            description: values.get("description").to_string(),
            due: values.get("due").to_string(),
        };
        let tz = ctx.user_timezone(user_id).await?;

        match validate_task_form(&form, tz, Utc::now()) {
            Ok(task) => {
                let task_id = ctx
                    .database
                    .add_task(user_id, &task.title, task.description.as_deref(), task.due_at)
                    .await?;
                ctx.clear_draft(user_id, FORM_ID);
                info!("User {user_id} created task {task_id}");
                Ok(Reply::Update(after_change(created_text(&task, tz))))
            }
            Err(e) => {
                warn!("Rejected task form from user {user_id}: {e}");
                ctx.save_draft(user_id, FORM_ID, values.clone());
                Ok(Reply::retry(format!("❌ {e}"), "task:add", "task:list:0"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::test_context;
    use chrono::Duration;

    fn form(title: &str, due: &str) -> FormValues {
        [("title", title), ("description", ""), ("due", due)]
            .into_iter()
            .collect()
    }

    fn text(reply: &Reply) -> &str {
        &reply.screen().expect("screen reply").text
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let ctx = test_context().await;
        let reply = TasksHandler
            .handle_form(&ctx, 1, "form", &form("Pay rent", "01.01.2099 10:00"))
            .await
            .unwrap();
        assert!(text(&reply).contains("Task created"));

        let list = TasksHandler.handle_button(&ctx, 1, "list:0").await.unwrap();
        assert!(text(&list).contains("Pay rent"));

        let other = TasksHandler.handle_button(&ctx, 2, "list:0").await.unwrap();
        assert!(text(&other).contains("no active tasks"));
    }

    #[tokio::test]
    async fn test_rejected_form_is_prefilled_on_retry() {
        let ctx = test_context().await;
        let reply = TasksHandler
            .handle_form(&ctx, 1, "form", &form("Pay rent", "31.02.2099 10:00"))
            .await
            .unwrap();
        let screen = reply.screen().unwrap();
        assert!(screen.text.starts_with("❌"));
        assert!(screen.keyboard.find("task:add").is_some());

        let Reply::Form(form) = TasksHandler.handle_button(&ctx, 1, "add").await.unwrap() else {
            panic!("expected a form");
        };
        assert_eq!(form.custom_id, FORM_ID);
        assert_eq!(form.fields[0].value.as_deref(), Some("Pay rent"));
        assert_eq!(form.fields[2].value.as_deref(), Some("31.02.2099 10:00"));
    }

    #[tokio::test]
    async fn test_past_due_rejected() {
        let ctx = test_context().await;
        let reply = TasksHandler
            .handle_form(&ctx, 1, "form", &form("Old task", "01.01.2000 10:00"))
            .await
            .unwrap();
        assert!(text(&reply).contains("must be in the future"));
        assert!(ctx.database.get_user_tasks(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_done_removes_from_list() {
        let ctx = test_context().await;
        let due = Utc::now() + Duration::hours(2);
        let id = ctx.database.add_task(1, "Call mom", None, due).await.unwrap();

        let reply = TasksHandler.handle_button(&ctx, 1, &format!("done:{id}")).await.unwrap();
        assert!(text(&reply).contains("Task completed"));
        assert!(ctx.database.get_user_tasks(1).await.unwrap().is_empty());

        // Another user cannot touch the task
        let foreign = TasksHandler.handle_button(&ctx, 2, &format!("view:{id}")).await.unwrap();
        assert!(text(&foreign).contains("not found"));
    }

    #[tokio::test]
    async fn test_delay_moves_due_time() {
        let ctx = test_context().await;
        let due = Utc::now() + Duration::hours(1);
        let id = ctx.database.add_task(1, "Water plants", None, due).await.unwrap();

        let reply = TasksHandler
            .handle_button(&ctx, 1, &format!("delay:{id}:30"))
            .await
            .unwrap();
        assert!(text(&reply).contains("Task postponed"));

        let task = ctx.database.get_task(id, 1).await.unwrap().unwrap();
        let moved = task.due_at - due;
        assert!(moved >= Duration::minutes(29) && moved <= Duration::minutes(31));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let ctx = test_context().await;
        let id = ctx
            .database
            .add_task(1, "Temp", None, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let confirm = TasksHandler.handle_button(&ctx, 1, &format!("delete:{id}")).await.unwrap();
        assert!(confirm.screen().unwrap().keyboard.find(&format!("task:delete_yes:{id}")).is_some());
        assert!(ctx.database.get_task(id, 1).await.unwrap().is_some());

        TasksHandler.handle_button(&ctx, 1, &format!("delete_yes:{id}")).await.unwrap();
        assert!(ctx.database.get_task(id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_id_is_error() {
        let ctx = test_context().await;
        assert!(TasksHandler.handle_button(&ctx, 1, "view:abc").await.is_err());
        assert_eq!(TasksHandler.handle_button(&ctx, 1, "noop").await.unwrap(), Reply::Ack);
    }
}

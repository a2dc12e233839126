//! Settings buttons and forms
//!
//! Handles: `settings:*`
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Timezone setting, city checked against the weather service
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

use super::split_action;
use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::datetime::parse_timezone;
use crate::core::{escape_markdown, Button, Form, FormField, FormValues, Keyboard, Screen, Style};
use crate::features::weather::is_city_not_found;

pub const CITY_FORM_ID: &str = "settings:city_form";
pub const TIMEZONE_FORM_ID: &str = "settings:tz_form";

pub struct SettingsHandler;

fn city_form(draft: Option<&FormValues>) -> Form {
    Form::new(CITY_FORM_ID, "Weather city").field(
        FormField::short("city", "City")
            .placeholder("Volgograd")
            .max_length(85)
            .value(draft.map(|d| d.get("city"))),
    )
}

fn timezone_form(draft: Option<&FormValues>) -> Form {
    Form::new(TIMEZONE_FORM_ID, "Timezone").field(
        FormField::short("timezone", "IANA timezone name")
            .placeholder("Europe/Moscow")
            .max_length(64)
            .value(draft.map(|d| d.get("timezone"))),
    )
}

fn back_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("⚙️ Settings", "settings:open"),
        Button::new("◀️ Menu", "menu:main"),
    ])
}

impl SettingsHandler {
    async fn overview(&self, ctx: &CommandContext, user_id: u64) -> Result<Screen> {
        let settings = ctx.database.get_settings(user_id).await?;
        let city = ctx.user_city(user_id).await?;
        let timezone = ctx.user_timezone(user_id).await?;

        let location = match settings.as_ref().and_then(|s| s.location) {
            Some(location) => settings
                .as_ref()
                .and_then(|s| s.location_label.clone())
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| format!("{:.5}, {:.5}", location.latitude, location.longitude)),
            None => "not set".to_string(),
        };

        Ok(Screen::new(
            format!(
                "⚙️ **Settings**\n\n\
                 🏙 **City:** {}\n\
                 🕐 **Timezone:** {}\n\
                 📍 **Location:** {}",
                escape_markdown(&city),
                timezone.name(),
                escape_markdown(&location)
            ),
            Keyboard::new()
                .row(vec![
                    Button::new("🏙 Change city", "settings:city").style(Style::Primary),
                    Button::new("🕐 Change timezone", "settings:timezone").style(Style::Primary),
                ])
                .row(vec![
                    Button::new("📍 Location", "places:location"),
                    Button::new("◀️ Back", "menu:main"),
                ]),
        ))
    }

    async fn submit_city(&self, ctx: &CommandContext, user_id: u64, values: &FormValues) -> Result<Reply> {
        let city = values.get("city").trim();
        if city.is_empty() {
            ctx.save_draft(user_id, CITY_FORM_ID, values.clone());
            return Ok(Reply::retry("❌ The city can't be empty.", "settings:city", "settings:open"));
        }

        // The weather service is the source of truth for known cities
        let canonical = match ctx.weather.current(city).await {
            Ok(weather) => weather.city,
            Err(e) if is_city_not_found(&e) => {
                ctx.save_draft(user_id, CITY_FORM_ID, values.clone());
                return Ok(Reply::retry(
                    format!("❌ City **{}** was not found.", escape_markdown(city)),
                    "settings:city",
                    "settings:open",
                ));
            }
            Err(e) => {
                warn!("Couldn't check city '{city}' for user {user_id}: {e:#}");
                return Ok(Reply::failure("❌ Couldn't check the city. Please try again later."));
            }
        };

        ctx.clear_draft(user_id, CITY_FORM_ID);
        let text = if ctx.database.set_city(user_id, &canonical).await? {
            info!("User {user_id} set city to {canonical}");
            format!("✅ City set to **{}**.", escape_markdown(&canonical))
        } else {
            format!("ℹ️ City is already **{}**, nothing changed.", escape_markdown(&canonical))
        };
        Ok(Reply::Update(Screen::new(text, back_keyboard())))
    }

    async fn submit_timezone(&self, ctx: &CommandContext, user_id: u64, values: &FormValues) -> Result<Reply> {
        let input = values.get("timezone");
        let Some(tz) = parse_timezone(input) else {
            ctx.save_draft(user_id, TIMEZONE_FORM_ID, values.clone());
            return Ok(Reply::retry(
                format!(
                    "❌ Unknown timezone `{}`. Use an IANA name such as `Europe/Moscow` or `Asia/Tokyo`.",
                    input.trim().replace('`', "")
                ),
                "settings:timezone",
                "settings:open",
            ));
        };

        ctx.clear_draft(user_id, TIMEZONE_FORM_ID);
        let text = if ctx.database.set_timezone(user_id, tz.name()).await? {
            info!("User {user_id} set timezone to {}", tz.name());
            format!("✅ Timezone set to **{}**.", tz.name())
        } else {
            format!("ℹ️ Timezone is already **{}**, nothing changed.", tz.name())
        };
        Ok(Reply::Update(Screen::new(text, back_keyboard())))
    }
}

#[async_trait]
impl InteractionHandler for SettingsHandler {
    fn prefix(&self) -> &'static str {
        "settings"
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        match action {
            "open" => Ok(Reply::Update(self.overview(ctx, user_id).await?)),
            "city" => Ok(Reply::Form(city_form(ctx.draft(user_id, CITY_FORM_ID).as_ref()))),
            "timezone" => Ok(Reply::Form(timezone_form(ctx.draft(user_id, TIMEZONE_FORM_ID).as_ref()))),
            _ => Ok(Reply::Notice("Unknown settings action.".to_string())),
        }
    }

    async fn handle_form(
        &self,
        ctx: &CommandContext,
        user_id: u64,
        action: &str,
        values: &FormValues,
    ) -> Result<Reply> {
        let (name, _) = split_action(action);
        match name {
            "city_form" => self.submit_city(ctx, user_id, values).await,
            "tz_form" => self.submit_timezone(ctx, user_id, values).await,
            _ => Ok(Reply::Notice("Unknown settings form.".to_string())),
        }
    }
}

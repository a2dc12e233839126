//! Weather buttons
//!
//! Handles: `weather:*`
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Both actions are deferred while the weather service answers
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::{escape_markdown, Button, Keyboard, Screen};
use crate::features::weather::{format_current, format_forecast, is_city_not_found};

pub struct WeatherHandler;

fn weather_keyboard(showing_forecast: bool) -> Keyboard {
    let toggle = if showing_forecast {
        Button::new("🌤 Current weather", "weather:current")
    } else {
        Button::new("📅 5-day forecast", "weather:forecast")
    };
    Keyboard::new()
        .row(vec![toggle, Button::new("⚙️ Change city", "settings:city")])
        .row(vec![Button::new("◀️ Back", "menu:main")])
}

fn service_error(city: &str, error: &anyhow::Error) -> Reply {
    if is_city_not_found(error) {
        return Reply::Update(Screen::new(
            format!(
                "❌ City **{}** was not found. Set another city in the settings.",
                escape_markdown(city)
            ),
            Keyboard::new().row(vec![
                Button::new("⚙️ Change city", "settings:city"),
                Button::new("◀️ Back", "menu:main"),
            ]),
        ));
    }
    warn!("Weather request for '{city}' failed: {error:#}");
    Reply::failure("❌ Couldn't get weather data. Please try again later.")
}

#[async_trait]
impl InteractionHandler for WeatherHandler {
    fn prefix(&self) -> &'static str {
        "weather"
    }

    fn reaches_network(&self, action: &str) -> bool {
        matches!(action, "current" | "forecast")
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        let city = ctx.user_city(user_id).await?;
        match action {
            "current" => Ok(match ctx.weather.current(&city).await {
                Ok(weather) => Reply::Update(Screen::new(format_current(&weather), weather_keyboard(false))),
                Err(e) => service_error(&city, &e),
            }),
            "forecast" => Ok(match ctx.weather.forecast(&city).await {
                Ok(entries) => Reply::Update(Screen::new(
                    format_forecast(&city, &entries),
                    weather_keyboard(true),
                )),
                Err(e) => service_error(&city, &e),
            }),
            _ => Ok(Reply::Notice("Unknown weather action.".to_string())),
        }
    }
}

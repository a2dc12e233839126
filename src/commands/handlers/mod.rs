//! Per-feature handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 3.0.0: Button and form handlers for every assistant feature
//! - 2.0.0: Start handler for /start, /help and /menu
//! - 1.0.0: Initial extraction from the monolithic command handler

pub mod birthdays;
pub mod currency;
pub mod places;
pub mod settings;
pub mod start;
pub mod tasks;
pub mod weather;

use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::sync::Arc;

use super::handler::{InteractionHandler, SlashCommandHandler};

/// Create all slash command handlers
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![Arc::new(start::StartHandler)]
}

/// Create all button/form handlers
pub fn create_interaction_handlers() -> Vec<Arc<dyn InteractionHandler>> {
    vec![
        Arc::new(start::StartHandler),
        Arc::new(tasks::TasksHandler),
        Arc::new(birthdays::BirthdaysHandler),
        Arc::new(weather::WeatherHandler),
        Arc::new(currency::CurrencyHandler),
        Arc::new(places::PlacesHandler),
        Arc::new(settings::SettingsHandler),
    ]
}

/// Parse one `:`-separated argument of a custom id
pub(crate) fn parse_arg<T: FromStr>(value: Option<&str>) -> Result<T> {
    let raw = value.ok_or_else(|| anyhow!("Missing argument in custom id"))?;
    raw.parse::<T>()
        .map_err(|_| anyhow!("Malformed argument '{raw}' in custom id"))
}

/// Split an action into its name and the remaining arguments
pub(crate) fn split_action(action: &str) -> (&str, std::str::Split<'_, char>) {
    let mut parts = action.split(':');
    let name = parts.next().unwrap_or("");
    (name, parts)
}

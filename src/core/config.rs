//! Environment-driven configuration
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add WEATHER_LANG for weather descriptions
//! - 1.1.0: Add scheduler tuning variables (poll interval, birthday lead/hour, morning hour)
//! - 1.0.0: Initial release

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use std::path::PathBuf;

pub const DEFAULT_CITY: &str = "Volzhskiy";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
pub const DEFAULT_DATABASE_PATH: &str = "./bot_database.db";
pub const DEFAULT_WEATHER_LANG: &str = "en";

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_user_id: u64,
    pub weather_api_key: String,
    pub weather_lang: String,
    pub default_city: String,
    pub default_timezone: Tz,
    pub log_level: String,
    pub database_path: PathBuf,
    pub discord_guild_id: Option<u64>,
    pub task_poll_interval_secs: u64,
    pub birthday_lead_days: i64,
    pub birthday_notify_hour: u32,
    pub morning_message_hour: u32,
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let admin_user_id = require("ADMIN_USER_ID")?
            .parse::<u64>()
            .context("ADMIN_USER_ID must be a numeric user id")?;

        let timezone_name = get("DEFAULT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let default_timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| anyhow!("DEFAULT_TIMEZONE '{timezone_name}' is not a known timezone"))?;

        let discord_guild_id = get("DISCORD_GUILD_ID")
            .map(|id| id.parse::<u64>())
            .transpose()
            .context("DISCORD_GUILD_ID must be numeric")?;

        let birthday_notify_hour = parse_or::<u32>(get("BIRTHDAY_NOTIFY_HOUR"), 9, "BIRTHDAY_NOTIFY_HOUR")?;
        let morning_message_hour = parse_or::<u32>(get("MORNING_MESSAGE_HOUR"), 8, "MORNING_MESSAGE_HOUR")?;
        for (name, hour) in [
            ("BIRTHDAY_NOTIFY_HOUR", birthday_notify_hour),
            ("MORNING_MESSAGE_HOUR", morning_message_hour),
        ] {
            if hour > 23 {
                return Err(anyhow!("{name} must be between 0 and 23, got {hour}"));
            }
        }

        let task_poll_interval_secs =
            parse_or::<u64>(get("TASK_POLL_INTERVAL_SECS"), 300, "TASK_POLL_INTERVAL_SECS")?;
        if task_poll_interval_secs == 0 {
            return Err(anyhow!("TASK_POLL_INTERVAL_SECS must be greater than zero"));
        }

        let birthday_lead_days = parse_or::<i64>(get("BIRTHDAY_LEAD_DAYS"), 1, "BIRTHDAY_LEAD_DAYS")?;
        if !(0..=30).contains(&birthday_lead_days) {
            return Err(anyhow!("BIRTHDAY_LEAD_DAYS must be between 0 and 30"));
        }

        Ok(Config {
            bot_token: require("BOT_TOKEN")?,
            admin_user_id,
            weather_api_key: require("WEATHER_API_KEY")?,
            weather_lang: get("WEATHER_LANG").unwrap_or_else(|| DEFAULT_WEATHER_LANG.to_string()),
            default_city: get("DEFAULT_CITY").unwrap_or_else(|| DEFAULT_CITY.to_string()),
            default_timezone,
            log_level: get("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            discord_guild_id,
            task_poll_interval_secs,
            birthday_lead_days,
            birthday_notify_hour,
            morning_message_hour,
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow!("{name} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

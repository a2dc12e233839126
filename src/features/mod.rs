//! # Features
//!
//! Every user-facing capability of the assistant lives in its own module.
//! Feature metadata below mirrors the module headers and is shown by `/help`.

pub mod birthdays;
pub mod currency;
pub mod places;
pub mod rate_limiting;
pub mod reminders;
pub mod tasks;
pub mod weather;

pub use currency::{CurrencyClient, RateTable};
pub use places::{PlaceCategory, PlaceSearch, PlacesClient};
pub use rate_limiting::RateLimiter;
pub use reminders::{ReminderScheduler, SchedulerSettings, ServiceSummary};
pub use weather::WeatherClient;

/// Metadata for a feature module
#[derive(Debug, Clone, Copy)]
pub struct FeatureInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub since: &'static str,
    pub toggleable: bool,
}

const FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        id: "tasks",
        name: "Tasks",
        version: "1.2.0",
        since: "0.1.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "birthdays",
        name: "Birthdays",
        version: "1.1.0",
        since: "0.1.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "weather",
        name: "Weather",
        version: "1.1.0",
        since: "0.1.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "currency",
        name: "Currency",
        version: "1.1.0",
        since: "0.1.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "places",
        name: "Places",
        version: "1.1.0",
        since: "0.2.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "reminders",
        name: "Reminders",
        version: "2.0.0",
        since: "0.1.0",
        toggleable: false,
    },
    FeatureInfo {
        id: "rate_limiting",
        name: "Rate Limiting",
        version: "2.0.0",
        since: "0.1.0",
        toggleable: false,
    },
];

pub fn get_features() -> &'static [FeatureInfo] {
    FEATURES
}

pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_ids_unique() {
        let mut ids: Vec<&str> = get_features().iter().map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), get_features().len());
    }
}

//! Shared context for command and interaction handlers
//!
//! - **Version**: 2.0.1
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.1: Drop the unused start time
//! - 2.0.0: Service clients, form drafts and the place result cache
//! - 1.0.0: Initial implementation with core shared state

use anyhow::Result;
use chrono_tz::Tz;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

use crate::core::{Config, FormValues};
use crate::database::Database;
use crate::features::{CurrencyClient, PlaceSearch, PlacesClient, RateLimiter, WeatherClient};

/// Shared context for all handlers
///
/// Holds the database, the external service clients, the configured
/// defaults and per-user interaction state:
/// - form drafts, so a form re-opened after a validation error is pre-filled
/// - the last place search, so result pages can be flipped without a new query
pub struct CommandContext {
    pub database: Database,
    pub weather: Arc<WeatherClient>,
    pub currency: Arc<CurrencyClient>,
    pub places: Arc<PlacesClient>,
    pub default_city: String,
    pub default_timezone: Tz,
    pub rate_limiter: RateLimiter,
    drafts: DashMap<(u64, &'static str), FormValues>,
    place_results: DashMap<u64, PlaceSearch>,
}

impl CommandContext {
    pub fn new(
        config: &Config,
        database: Database,
        weather: Arc<WeatherClient>,
        currency: Arc<CurrencyClient>,
        places: Arc<PlacesClient>,
    ) -> Self {
        Self {
            database,
            weather,
            currency,
            places,
            default_city: config.default_city.clone(),
            default_timezone: config.default_timezone,
            rate_limiter: RateLimiter::default(),
            drafts: DashMap::new(),
            place_results: DashMap::new(),
        }
    }

    /// Build the context and the service clients from configuration
    pub fn from_config(config: &Config, database: Database) -> Result<Self> {
        let weather = Arc::new(WeatherClient::new(&config.weather_api_key, &config.weather_lang)?);
        let currency = Arc::new(CurrencyClient::new()?);
        let places = Arc::new(PlacesClient::new()?);
        Ok(Self::new(config, database, weather, currency, places))
    }

    pub async fn user_timezone(&self, user_id: u64) -> Result<Tz> {
        self.database.user_timezone(user_id, self.default_timezone).await
    }

    pub async fn user_city(&self, user_id: u64) -> Result<String> {
        self.database.user_city(user_id, &self.default_city).await
    }

    /// Remember rejected form input
    pub fn save_draft(&self, user_id: u64, form_id: &'static str, values: FormValues) {
        debug!("Saving {form_id} draft for user {user_id}");
        self.drafts.insert((user_id, form_id), values);
    }

    pub fn draft(&self, user_id: u64, form_id: &'static str) -> Option<FormValues> {
        self.drafts.get(&(user_id, form_id)).map(|d| d.value().clone())
    }

    pub fn clear_draft(&self, user_id: u64, form_id: &'static str) {
        self.drafts.remove(&(user_id, form_id));
    }

    pub fn store_place_search(&self, user_id: u64, search: PlaceSearch) {
        self.place_results.insert(user_id, search);
    }

    pub fn place_search(&self, user_id: u64) -> Option<PlaceSearch> {
        self.place_results.get(&user_id).map(|s| s.value().clone())
    }

    pub fn clear_place_search(&self, user_id: u64) {
        self.place_results.remove(&user_id);
    }
}

/// Context with clients pointed at an address nothing listens on, so a
/// test that reaches the network fails fast instead of hanging
#[cfg(test)]
pub(crate) async fn test_context() -> CommandContext {
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    let config = Config::from_lookup(|key| match key {
        "BOT_TOKEN" => Some("token".to_string()),
        "ADMIN_USER_ID" => Some("42".to_string()),
        "WEATHER_API_KEY" => Some("key".to_string()),
        _ => None,
    })
    .unwrap();
    let database = Database::in_memory().await.unwrap();
    let weather = WeatherClient::new("key", "en").unwrap().with_base_url(UNREACHABLE);
    let currency = CurrencyClient::new().unwrap().with_url(UNREACHABLE);
    let places = PlacesClient::new().unwrap().with_urls(UNREACHABLE, UNREACHABLE);

    CommandContext::new(&config, database, Arc::new(weather), Arc::new(currency), Arc::new(places))
}

//! Morning summary text: weather for the default city plus major rates

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;
use std::sync::Arc;

use crate::features::currency::{format_morning_rates, CurrencyClient};
use crate::features::weather::{format_morning_line, WeatherClient};

#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn morning_summary(&self, today: NaiveDate) -> Result<String>;
}

/// Builds the summary from the live weather and currency services.
/// A failing service only blanks its own section.
pub struct ServiceSummary {
    weather: Arc<WeatherClient>,
    currency: Arc<CurrencyClient>,
    city: String,
}

impl ServiceSummary {
    pub fn new(weather: Arc<WeatherClient>, currency: Arc<CurrencyClient>, city: impl Into<String>) -> Self {
        Self {
            weather,
            currency,
            city: city.into(),
        }
    }
}

pub fn compose_summary(today: NaiveDate, weather: Option<String>, rates: Option<String>) -> String {
    let date = today.format("%d.%m.%Y");
    let weather = weather.unwrap_or_else(|| "❌ Weather data is unavailable.".to_string());
    let rates = rates.unwrap_or_else(|| "❌ Currency rates are unavailable.".to_string());
    format!("🌅 **Good morning!**\n\n🌤 **Weather for {date}:**\n{weather}\n\n💱 **Major rates for {date}:**\n{rates}")
}

#[async_trait]
impl SummarySource for ServiceSummary {
    async fn morning_summary(&self, today: NaiveDate) -> Result<String> {
        let weather = match self.weather.current(&self.city).await {
            Ok(current) => Some(format_morning_line(&current)),
            Err(e) => {
                warn!("Morning summary: weather for '{}' failed: {e:#}", self.city);
                None
            }
        };

        let rates = match self.currency.rates().await {
            Ok(table) if !table.is_empty() => Some(format_morning_rates(&table)),
            Ok(_) => None,
            Err(e) => {
                warn!("Morning summary: currency rates failed: {e:#}");
                None
            }
        };

        Ok(compose_summary(today, weather, rates))
    }
}

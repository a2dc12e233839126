//! Central Bank of Russia daily rates
//!
//! Reads the JSON mirror of the CBR `XML_daily` feed. Every rate is quoted
//! in roubles for `Nominal` units of the currency.

use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::RateTable;
use crate::core::http;

pub const CBR_DAILY_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

/// Rates change once a day; refetching more often only adds latency
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Deserialize)]
pub(crate) struct DailyResponse {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Valute", default)]
    valute: HashMap<String, Valute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Valute {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: f64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: f64,
}

impl From<DailyResponse> for RateTable {
    fn from(raw: DailyResponse) -> Self {
        let date = raw.date.get(..10).unwrap_or(&raw.date).to_string();
        let mut table = RateTable::new(date);
        for valute in raw.valute.into_values() {
            table.insert(&valute.char_code, &valute.name, valute.value, valute.nominal);
        }
        table
    }
}

pub struct CurrencyClient {
    http: reqwest::Client,
    url: String,
    cache: Mutex<Option<(Instant, Arc<RateTable>)>>,
}

impl CurrencyClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            url: CBR_DAILY_URL.to_string(),
            cache: Mutex::new(None),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Latest rate table, served from cache while fresh
    pub async fn rates(&self) -> Result<Arc<RateTable>> {
        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, table)) = cache.as_ref() {
            if fetched_at.elapsed() < CACHE_TTL {
                debug!("Serving cached currency rates from {}", table.date);
                return Ok(table.clone());
            }
        }

        let raw: DailyResponse = http::get_json(self.http.get(&self.url)).await?;
        let table = Arc::new(RateTable::from(raw));
        info!("Fetched {} currency rates for {}", table.len(), table.date);

        *cache = Some((Instant::now(), table.clone()));
        Ok(table)
    }

    /// Put a table in the cache as if it had just been fetched
    #[cfg(test)]
    pub(crate) async fn seed(&self, table: RateTable) {
        *self.cache.lock().await = Some((Instant::now(), Arc::new(table)));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daily_fixture() {
        let raw: DailyResponse = serde_json::from_str(fixtures::DAILY).unwrap();
        let table = RateTable::from(raw);

        assert_eq!(table.date, "2025-03-11");
        assert_eq!(table.len(), 4);
        assert_eq!(table.rate_to_rub("USD"), Some(90.0));
        // Nominal is applied: 100 JPY cost 60 RUB
        assert_eq!(table.rate_to_rub("JPY"), Some(0.6));
        assert_eq!(table.rate_to_rub("RUB"), Some(1.0));
        assert_eq!(table.rate_to_rub("XXX"), None);
    }
}

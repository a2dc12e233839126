//! OpenWeatherMap client
//!
//! Current conditions (`/weather`) and the 3-hourly 5-day forecast
//! (`/forecast`), metric units.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

use crate::core::http;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// The provider does not know the requested city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityNotFound(pub String);

impl fmt::Display for CityNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "city '{}' not found", self.0)
    }
}

impl std::error::Error for CityNotFound {}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub city: String,
    pub country: Option<String>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    /// Wall-clock time at the forecast location
    pub local_time: NaiveDateTime,
    pub temperature: f64,
    pub description: String,
    pub icon: String,
}

// Wire types

#[derive(Debug, Deserialize)]
pub(crate) struct Condition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Sys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentResponse {
    name: String,
    #[serde(default)]
    sys: Sys,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastItem {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForecastCity {
    /// UTC offset in seconds
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastItem>,
    #[serde(default)]
    city: ForecastCity,
}

fn first_condition(conditions: Vec<Condition>) -> (String, String) {
    conditions
        .into_iter()
        .next()
        .map(|c| (c.description, c.icon))
        .unwrap_or_default()
}

impl From<CurrentResponse> for CurrentWeather {
    fn from(raw: CurrentResponse) -> Self {
        let (description, icon) = first_condition(raw.weather);
        CurrentWeather {
            city: raw.name,
            country: raw.sys.country.filter(|c| !c.is_empty()),
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity: raw.main.humidity,
            pressure: raw.main.pressure,
            wind_speed: raw.wind.speed,
            description,
            icon,
        }
    }
}

impl ForecastResponse {
    pub(crate) fn into_entries(self) -> Vec<ForecastEntry> {
        let offset = FixedOffset::east_opt(self.city.timezone).unwrap_or(Utc.fix());

        self.list
            .into_iter()
            .filter_map(|item| {
                let utc = DateTime::<Utc>::from_timestamp(item.dt, 0)?;
                let (description, icon) = first_condition(item.weather);
                Some(ForecastEntry {
                    local_time: utc.with_timezone(&offset).naive_local(),
                    temperature: item.main.temp,
                    description,
                    icon,
                })
            })
            .collect()
    }
}

pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    lang: String,
    base_url: String,
}

impl WeatherClient {
    pub fn new(api_key: impl Into<String>, lang: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            api_key: api_key.into(),
            lang: lang.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, endpoint: &str, city: &str) -> Result<reqwest::Response> {
        debug!("Weather request: /{endpoint} for '{city}'");
        let request = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ]);
        let response = http::send(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("Weather API does not know city '{city}'");
            return Err(CityNotFound(city.to_string()).into());
        }
        Ok(response)
    }

    /// Current conditions for a city
    pub async fn current(&self, city: &str) -> Result<CurrentWeather> {
        let response = self.fetch("weather", city).await?;
        let raw: CurrentResponse = http::read_json(response).await?;
        Ok(raw.into())
    }

    /// 3-hourly forecast entries for the next five days
    pub async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>> {
        let response = self.fetch("forecast", city).await?;
        let raw: ForecastResponse = http::read_json(response).await?;
        Ok(raw.into_entries())
    }
}

/// True when the error chain says the city is unknown
pub fn is_city_not_found(error: &anyhow::Error) -> bool {
    error.downcast_ref::<CityNotFound>().is_some()
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const CURRENT: &str = r#"{
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": 11.6, "feels_like": 10.9, "temp_min": 10.2, "temp_max": 12.8,
                 "pressure": 1012, "humidity": 81},
        "wind": {"speed": 4.63, "deg": 230},
        "dt": 1741608000,
        "sys": {"country": "GB", "sunrise": 1741588000, "sunset": 1741630000},
        "timezone": 0,
        "name": "London",
        "cod": 200
    }"#;

    /// Two days at 3-hour steps, UTC+3
    pub const FORECAST: &str = r#"{
        "cod": "200",
        "list": [
            {"dt": 1741597200, "main": {"temp": 2.0}, "weather": [{"description": "clear sky", "icon": "01n"}]},
            {"dt": 1741608000, "main": {"temp": 6.5}, "weather": [{"description": "few clouds", "icon": "02d"}]},
            {"dt": 1741618800, "main": {"temp": 8.1}, "weather": [{"description": "scattered clouds", "icon": "03d"}]},
            {"dt": 1741683600, "main": {"temp": 1.0}, "weather": [{"description": "mist", "icon": "50n"}]},
            {"dt": 1741694400, "main": {"temp": 4.4}, "weather": [{"description": "snow", "icon": "13d"}]}
        ],
        "city": {"name": "Moscow", "country": "RU", "timezone": 10800}
    }"#;
}

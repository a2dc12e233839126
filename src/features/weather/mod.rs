//! # Weather Feature
//!
//! Current conditions and a 5-day forecast for the user's city.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: One midday entry per forecast day, short block for the morning summary
//! - 1.0.0: Initial release

pub mod client;

pub use client::{is_city_not_found, CityNotFound, CurrentWeather, ForecastEntry, WeatherClient};

use chrono::{NaiveDate, Timelike};

/// Days shown in the forecast
pub const FORECAST_DAYS: usize = 5;

/// Emoji for an OpenWeatherMap icon code (`01d`, `10n`, ...)
pub fn weather_emoji(icon: &str) -> &'static str {
    match icon.get(..2).unwrap_or("") {
        "01" => "☀️",
        "02" => "⛅",
        "03" | "04" => "☁️",
        "09" => "🌧",
        "10" => "🌦",
        "11" => "⛈",
        "13" => "❄️",
        "50" => "🌫",
        _ => "🌤",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn place_name(weather: &CurrentWeather) -> String {
    match &weather.country {
        Some(country) => format!("{}, {country}", weather.city),
        None => weather.city.clone(),
    }
}

pub fn format_current(weather: &CurrentWeather) -> String {
    format!(
        "{} **Weather in {}**\n\n\
         🌡 **Temperature:** {:.1}°C\n\
         🤚 **Feels like:** {:.1}°C\n\
         ☁️ **Conditions:** {}\n\
         💧 **Humidity:** {:.0}%\n\
         🌬 **Wind:** {:.1} m/s\n\
         📊 **Pressure:** {:.0} hPa",
        weather_emoji(&weather.icon),
        place_name(weather),
        weather.temperature,
        weather.feels_like,
        capitalize(&weather.description),
        weather.humidity,
        weather.wind_speed,
        weather.pressure,
    )
}

/// Pick one entry per local day, the one closest to noon, for the first
/// [`FORECAST_DAYS`] days
pub fn daily_forecast(entries: &[ForecastEntry]) -> Vec<&ForecastEntry> {
    let mut days: Vec<(NaiveDate, &ForecastEntry)> = Vec::new();

    for entry in entries {
        let date = entry.local_time.date();
        let distance = |e: &ForecastEntry| (e.local_time.hour() as i32 - 12).abs();

        match days.iter_mut().find(|(day, _)| *day == date) {
            Some((_, best)) => {
                if distance(entry) < distance(*best) {
                    *best = entry;
                }
            }
            None => days.push((date, entry)),
        }
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|(_, entry)| entry)
        .collect()
}

pub fn format_forecast(city: &str, entries: &[ForecastEntry]) -> String {
    let days = daily_forecast(entries);
    if days.is_empty() {
        return format!("📅 No forecast available for {city}.");
    }

    let mut text = format!("📅 **{FORECAST_DAYS}-day forecast for {city}**\n\n");
    for entry in days {
        text.push_str(&format!(
            "{} **{}** ({})\n🌡 {:.1}°C, {}\n\n",
            weather_emoji(&entry.icon),
            entry.local_time.format("%d.%m"),
            entry.local_time.format("%A"),
            entry.temperature,
            entry.description,
        ));
    }
    text.trim_end().to_string()
}

/// One-line weather for the morning summary
pub fn format_morning_line(weather: &CurrentWeather) -> String {
    format!(
        "{} {}: {:.0}°C, {} (feels like {:.0}°C)",
        weather_emoji(&weather.icon),
        weather.city,
        weather.temperature,
        weather.description,
        weather.feels_like,
    )
}

#[cfg(test)]
mod tests {
    use super::client::{fixtures, CurrentResponse, ForecastResponse};
    use super::*;

    fn current() -> CurrentWeather {
        let raw: CurrentResponse = serde_json::from_str(fixtures::CURRENT).unwrap();
        raw.into()
    }

    fn forecast() -> Vec<ForecastEntry> {
        let raw: ForecastResponse = serde_json::from_str(fixtures::FORECAST).unwrap();
        raw.into_entries()
    }

    #[test]
    fn test_weather_emoji() {
        assert_eq!(weather_emoji("01d"), "☀️");
        assert_eq!(weather_emoji("04n"), "☁️");
        assert_eq!(weather_emoji("13d"), "❄️");
        assert_eq!(weather_emoji("99x"), "🌤");
        assert_eq!(weather_emoji(""), "🌤");
    }

    #[test]
    fn test_format_current() {
        let text = format_current(&current());
        assert!(text.starts_with("🌦 **Weather in London, GB**"));
        assert!(text.contains("11.6°C"));
        assert!(text.contains("Light rain"));
        assert!(text.contains("81%"));
        assert!(text.contains("1012 hPa"));
    }

    #[test]
    fn test_daily_forecast_picks_midday() {
        let entries = forecast();
        let days = daily_forecast(&entries);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].local_time.hour(), 12);
        assert_eq!(days[0].description, "clear sky");
        assert_eq!(days[1].description, "mist");
    }

    #[test]
    fn test_format_forecast() {
        let text = format_forecast("Moscow", &forecast());
        assert!(text.contains("forecast for Moscow"));
        assert!(text.contains("**10.03** (Monday)"));
        assert!(text.contains("**11.03** (Tuesday)"));

        assert!(format_forecast("Moscow", &[]).contains("No forecast"));
    }

    #[test]
    fn test_morning_line() {
        assert_eq!(
            format_morning_line(&current()),
            "🌦 London: 12°C, light rain (feels like 11°C)"
        );
    }
}

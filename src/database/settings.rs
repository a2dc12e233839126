//! Per-user settings repository
//!
//! Every setter is an upsert that only touches the row when the value
//! actually changes, so repeating a write is a no-op.

use anyhow::Result;
use chrono_tz::Tz;
use log::warn;
use sqlite::State;

use super::{from_db_id, to_db_id, Database};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub user_id: u64,
    pub city: Option<String>,
    pub timezone: Option<String>,
    pub location: Option<Location>,
    pub location_label: Option<String>,
    pub updated_at: String,
}

impl Database {
    pub async fn get_settings(&self, user_id: u64) -> Result<Option<UserSettings>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT user_id, city, timezone, latitude, longitude, location_label, updated_at
             FROM user_settings WHERE user_id = ?",
        )?;
        statement.bind((1, to_db_id(user_id)))?;

        if let State::Done = statement.next()? {
            return Ok(None);
        }

        let latitude = statement.read::<Option<f64>, _>("latitude")?;
        let longitude = statement.read::<Option<f64>, _>("longitude")?;
        let location = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(Some(UserSettings {
            user_id: from_db_id(statement.read::<i64, _>("user_id")?),
            city: statement.read::<Option<String>, _>("city")?,
            timezone: statement.read::<Option<String>, _>("timezone")?,
            location,
            location_label: statement.read::<Option<String>, _>("location_label")?,
            updated_at: statement.read::<String, _>("updated_at")?,
        }))
    }

    /// The user's timezone, falling back to `default` when unset or unknown
    pub async fn user_timezone(&self, user_id: u64, default: Tz) -> Result<Tz> {
        let stored = self.get_settings(user_id).await?.and_then(|s| s.timezone);
        Ok(match stored {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                warn!("Stored timezone '{name}' of user {user_id} is unknown, using {}", default.name());
                default
            }),
            None => default,
        })
    }

    /// The user's city, falling back to `default`
    pub async fn user_city(&self, user_id: u64, default: &str) -> Result<String> {
        Ok(self
            .get_settings(user_id)
            .await?
            .and_then(|s| s.city)
            .unwrap_or_else(|| default.to_string()))
    }

    /// Returns true when the stored city changed
    pub async fn set_city(&self, user_id: u64, city: &str) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO user_settings (user_id, city) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                city = excluded.city,
                updated_at = CURRENT_TIMESTAMP
             WHERE user_settings.city IS NOT excluded.city",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, city))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Returns true when the stored timezone changed
    pub async fn set_timezone(&self, user_id: u64, timezone: &str) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO user_settings (user_id, timezone) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                timezone = excluded.timezone,
                updated_at = CURRENT_TIMESTAMP
             WHERE user_settings.timezone IS NOT excluded.timezone",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, timezone))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Save the last location used for place search
    pub async fn set_location(
        &self,
        user_id: u64,
        location: Location,
        label: Option<&str>,
    ) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO user_settings (user_id, latitude, longitude, location_label)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                location_label = excluded.location_label,
                updated_at = CURRENT_TIMESTAMP
             WHERE user_settings.latitude IS NOT excluded.latitude
                OR user_settings.longitude IS NOT excluded.longitude
                OR user_settings.location_label IS NOT excluded.location_label",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, location.latitude))?;
        statement.bind((3, location.longitude))?;
        statement.bind((4, label))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }
}

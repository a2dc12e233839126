//! Daily message log
//!
//! One row per (user, local date, kind) marks that a once-a-day message went
//! out. Rows for the morning summary also keep the message reference so the
//! message can be deleted later; the row itself stays until pruned so the
//! summary is not sent twice on the same day.

use anyhow::Result;
use chrono::NaiveDate;
use sqlite::{State, Statement};

use super::{from_db_id, to_db_id, Database};
use crate::core::datetime::DATE_STORAGE_FORMAT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyMessage {
    pub user_id: u64,
    pub sent_on: NaiveDate,
    pub kind: String,
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
}

impl DailyMessage {
    fn from_row(statement: &Statement) -> Result<Self> {
        let sent_on = statement.read::<String, _>("sent_on")?;
        Ok(DailyMessage {
            user_id: from_db_id(statement.read::<i64, _>("user_id")?),
            sent_on: NaiveDate::parse_from_str(&sent_on, DATE_STORAGE_FORMAT)?,
            kind: statement.read::<String, _>("kind")?,
            channel_id: statement.read::<Option<i64>, _>("channel_id")?.map(from_db_id),
            message_id: statement.read::<Option<i64>, _>("message_id")?.map(from_db_id),
        })
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_STORAGE_FORMAT).to_string()
}

impl Database {
    pub async fn has_daily_marker(&self, user_id: u64, date: NaiveDate, kind: &str) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT 1 FROM daily_messages WHERE user_id = ? AND sent_on = ? AND kind = ?",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, date_key(date).as_str()))?;
        statement.bind((3, kind))?;
        Ok(matches!(statement.next()?, State::Row))
    }

    /// Record a daily message. Returns false when one was already recorded
    /// for the same user, date and kind.
    pub async fn record_daily_message(
        &self,
        user_id: u64,
        date: NaiveDate,
        kind: &str,
        message_ref: Option<(u64, u64)>,
    ) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT OR IGNORE INTO daily_messages (user_id, sent_on, kind, channel_id, message_id)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, date_key(date).as_str()))?;
        statement.bind((3, kind))?;
        statement.bind((4, message_ref.map(|(channel, _)| to_db_id(channel))))?;
        statement.bind((5, message_ref.map(|(_, message)| to_db_id(message))))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Messages of `kind` sent on or before `cutoff` that still have a
    /// message reference to delete
    pub async fn pending_cleanup(&self, kind: &str, cutoff: NaiveDate) -> Result<Vec<DailyMessage>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT user_id, sent_on, kind, channel_id, message_id FROM daily_messages
             WHERE kind = ? AND sent_on <= ? AND message_id IS NOT NULL
             ORDER BY sent_on ASC",
        )?;
        statement.bind((1, kind))?;
        statement.bind((2, date_key(cutoff).as_str()))?;

        let mut messages = Vec::new();
        while let State::Row = statement.next()? {
            messages.push(DailyMessage::from_row(&statement)?);
        }
        Ok(messages)
    }

    /// Forget the message reference once the message is deleted, keeping the
    /// marker for the day
    pub async fn clear_daily_message_ref(
        &self,
        user_id: u64,
        date: NaiveDate,
        kind: &str,
    ) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "UPDATE daily_messages SET channel_id = NULL, message_id = NULL
             WHERE user_id = ? AND sent_on = ? AND kind = ?",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, date_key(date).as_str()))?;
        statement.bind((3, kind))?;
        statement.next()?;
        Ok(())
    }

    /// Drop markers older than `before` that no longer carry a message
    pub async fn prune_daily_markers(&self, before: NaiveDate) -> Result<usize> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare("DELETE FROM daily_messages WHERE sent_on < ? AND message_id IS NULL")?;
        statement.bind((1, date_key(before).as_str()))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_marker_recorded_once() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.has_daily_marker(1, day(10), "morning").await.unwrap());

        assert!(db.record_daily_message(1, day(10), "morning", Some((5, 99))).await.unwrap());
        assert!(!db.record_daily_message(1, day(10), "morning", Some((5, 100))).await.unwrap());
        assert!(db.has_daily_marker(1, day(10), "morning").await.unwrap());

        // Different kind and different day are separate markers
        assert!(!db.has_daily_marker(1, day(10), "birthday_today:3").await.unwrap());
        assert!(!db.has_daily_marker(1, day(11), "morning").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_marker() {
        let db = Database::in_memory().await.unwrap();
        db.record_daily_message(1, day(9), "morning", Some((5, 77))).await.unwrap();
        db.record_daily_message(1, day(10), "morning", Some((5, 78))).await.unwrap();

        let pending = db.pending_cleanup("morning", day(9)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_id, Some(77));
        assert_eq!(pending[0].channel_id, Some(5));
        assert_eq!(pending[0].sent_on, day(9));

        db.clear_daily_message_ref(1, day(9), "morning").await.unwrap();
        assert!(db.pending_cleanup("morning", day(9)).await.unwrap().is_empty());
        assert!(db.has_daily_marker(1, day(9), "morning").await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_old_markers() {
        let db = Database::in_memory().await.unwrap();
        db.record_daily_message(1, day(1), "birthday_eve:1", None).await.unwrap();
        db.record_daily_message(1, day(2), "morning", Some((5, 1))).await.unwrap();
        db.record_daily_message(1, day(20), "birthday_today:1", None).await.unwrap();

        assert_eq!(db.prune_daily_markers(day(15)).await.unwrap(), 1);
        assert!(db.has_daily_marker(1, day(2), "morning").await.unwrap());
        assert!(db.has_daily_marker(1, day(20), "birthday_today:1").await.unwrap());
    }
}

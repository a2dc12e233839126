//! # Database
//!
//! SQLite persistence for tasks, birthdays, user settings and the daily
//! message log. One connection is shared behind an async mutex; clones of
//! [`Database`] are cheap handles to the same connection.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Daily message log keyed by (user, date, kind)
//! - 1.0.0: Initial schema with tasks, birthdays and user settings

mod birthdays;
mod daily_messages;
mod settings;
mod tasks;

pub use birthdays::Birthday;
pub use daily_messages::DailyMessage;
pub use settings::{Location, UserSettings};
pub use tasks::{Task, TaskStatus};

use anyhow::{Context, Result};
use log::info;
use sqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        due_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        last_reminded_at TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, status);
    CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(status, due_at);

    CREATE TABLE IF NOT EXISTS birthdays (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        day INTEGER NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, name)
    );

    CREATE TABLE IF NOT EXISTS user_settings (
        user_id INTEGER PRIMARY KEY,
        city TEXT,
        timezone TEXT,
        latitude REAL,
        longitude REAL,
        location_label TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS daily_messages (
        user_id INTEGER NOT NULL,
        sent_on TEXT NOT NULL,
        kind TEXT NOT NULL,
        channel_id INTEGER,
        message_id INTEGER,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (user_id, sent_on, kind)
    );
";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let connection = sqlite::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let database = Self::from_connection(connection)?;
        info!("Database ready at {}", path.display());
        Ok(database)
    }

    /// In-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        let connection = sqlite::open(":memory:").context("Failed to open in-memory database")?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection
            .execute("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
            .context("Failed to configure database")?;
        connection
            .execute(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Id of the last inserted row on this connection
    fn last_insert_id(connection: &Connection) -> Result<i64> {
        let mut statement = connection.prepare("SELECT last_insert_rowid()")?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)?)
    }
}

/// SQLite stores integers as i64; Discord ids fit in the positive range
pub(crate) fn to_db_id(id: u64) -> i64 {
    id as i64
}

pub(crate) fn from_db_id(id: i64) -> u64 {
    id as u64
}

//! Birthday repository

use anyhow::{anyhow, Result};
use sqlite::{State, Statement};

use super::{from_db_id, to_db_id, Database};
use crate::core::datetime::MonthDay;

const BIRTHDAY_COLUMNS: &str = "id, user_id, name, day, month, year";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Birthday {
    pub id: i64,
    pub user_id: u64,
    pub name: String,
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

impl Birthday {
    pub fn date(&self) -> MonthDay {
        MonthDay {
            day: self.day,
            month: self.month,
            year: self.year,
        }
    }

    fn from_row(statement: &Statement) -> Result<Self> {
        Ok(Birthday {
            id: statement.read::<i64, _>("id")?,
            user_id: from_db_id(statement.read::<i64, _>("user_id")?),
            name: statement.read::<String, _>("name")?,
            day: statement.read::<i64, _>("day")? as u32,
            month: statement.read::<i64, _>("month")? as u32,
            year: statement.read::<Option<i64>, _>("year")?.map(|y| y as i32),
        })
    }
}

fn collect_birthdays(statement: &mut Statement) -> Result<Vec<Birthday>> {
    let mut birthdays = Vec::new();
    while let State::Row = statement.next()? {
        birthdays.push(Birthday::from_row(statement)?);
    }
    Ok(birthdays)
}

impl Database {
    /// Insert a birthday or overwrite the date of an existing one with the
    /// same name. Returns the row id.
    pub async fn add_birthday(&self, user_id: u64, name: &str, date: MonthDay) -> Result<i64> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO birthdays (user_id, name, day, month, year)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, name) DO UPDATE SET
                day = excluded.day,
                month = excluded.month,
                year = excluded.year",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, name))?;
        statement.bind((3, date.day as i64))?;
        statement.bind((4, date.month as i64))?;
        statement.bind((5, date.year.map(i64::from)))?;
        statement.next()?;
        drop(statement);

        // last_insert_rowid is not updated by the conflict branch
        let mut lookup =
            connection.prepare("SELECT id FROM birthdays WHERE user_id = ? AND name = ?")?;
        lookup.bind((1, to_db_id(user_id)))?;
        lookup.bind((2, name))?;
        match lookup.next()? {
            State::Row => Ok(lookup.read::<i64, _>("id")?),
            State::Done => Err(anyhow!("birthday '{name}' missing after upsert")),
        }
    }

    /// Birthdays of a user in calendar order
    pub async fn get_user_birthdays(&self, user_id: u64) -> Result<Vec<Birthday>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {BIRTHDAY_COLUMNS} FROM birthdays
             WHERE user_id = ?
             ORDER BY month ASC, day ASC, name ASC"
        ))?;
        statement.bind((1, to_db_id(user_id)))?;
        collect_birthdays(&mut statement)
    }

    pub async fn get_birthday(&self, birthday_id: i64, user_id: u64) -> Result<Option<Birthday>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {BIRTHDAY_COLUMNS} FROM birthdays WHERE id = ? AND user_id = ?"
        ))?;
        statement.bind((1, birthday_id))?;
        statement.bind((2, to_db_id(user_id)))?;
        Ok(collect_birthdays(&mut statement)?.into_iter().next())
    }

    pub async fn delete_birthday(&self, birthday_id: i64, user_id: u64) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("DELETE FROM birthdays WHERE id = ? AND user_id = ?")?;
        statement.bind((1, birthday_id))?;
        statement.bind((2, to_db_id(user_id)))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Every stored birthday, used by the birthday poll
    pub async fn get_all_birthdays(&self) -> Result<Vec<Birthday>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {BIRTHDAY_COLUMNS} FROM birthdays ORDER BY user_id, month, day"
        ))?;
        collect_birthdays(&mut statement)
    }
}

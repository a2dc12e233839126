//! Task repository

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use sqlite::{State, Statement};

use super::{from_db_id, to_db_id, Database};
use crate::core::datetime::{format_stored, parse_stored};

const TASK_COLUMNS: &str =
    "id, user_id, title, description, due_at, status, last_reminded_at, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Done,
    /// Pending with the due time in the past; never stored
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
            TaskStatus::Overdue => "overdue",
        }
    }

    fn from_stored(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(TaskStatus::Pending),
            "done" => Ok(TaskStatus::Done),
            other => Err(anyhow!("unknown task status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub user_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub due_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Status as shown to the user: pending tasks past their due time are overdue
    pub fn effective_status(&self, now: DateTime<Utc>) -> TaskStatus {
        match self.status {
            TaskStatus::Pending if self.due_at <= now => TaskStatus::Overdue,
            status => status,
        }
    }

    /// Whether a reminder went out within `window` before `now`
    pub fn reminded_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.last_reminded_at
            .map(|at| now - at < window)
            .unwrap_or(false)
    }

    fn from_row(statement: &Statement) -> Result<Self> {
        let last_reminded_at = statement
            .read::<Option<String>, _>("last_reminded_at")?
            .map(|value| parse_stored(&value))
            .transpose()?;

        Ok(Task {
            id: statement.read::<i64, _>("id")?,
            user_id: from_db_id(statement.read::<i64, _>("user_id")?),
            title: statement.read::<String, _>("title")?,
            description: statement.read::<Option<String>, _>("description")?,
            due_at: parse_stored(&statement.read::<String, _>("due_at")?)?,
            status: TaskStatus::from_stored(&statement.read::<String, _>("status")?)?,
            last_reminded_at,
            created_at: parse_stored(&statement.read::<String, _>("created_at")?)?,
        })
    }
}

fn collect_tasks(statement: &mut Statement) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    while let State::Row = statement.next()? {
        tasks.push(Task::from_row(statement)?);
    }
    Ok(tasks)
}

impl Database {
    /// Create a pending task and return its id
    pub async fn add_task(
        &self,
        user_id: u64,
        title: &str,
        description: Option<&str>,
        due_at: DateTime<Utc>,
    ) -> Result<i64> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO tasks (user_id, title, description, due_at, status)
             VALUES (?, ?, ?, ?, 'pending')",
        )?;
        statement.bind((1, to_db_id(user_id)))?;
        statement.bind((2, title))?;
        statement.bind((3, description))?;
        statement.bind((4, format_stored(due_at).as_str()))?;
        statement.next()?;
        drop(statement);

        Self::last_insert_id(&connection)
    }

    /// Fetch a task owned by `user_id`
    pub async fn get_task(&self, task_id: i64, user_id: u64) -> Result<Option<Task>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"
        ))?;
        statement.bind((1, task_id))?;
        statement.bind((2, to_db_id(user_id)))?;
        Ok(collect_tasks(&mut statement)?.into_iter().next())
    }

    /// Pending tasks of a user, soonest due first
    pub async fn get_user_tasks(&self, user_id: u64) -> Result<Vec<Task>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND status = 'pending'
             ORDER BY due_at ASC, id ASC"
        ))?;
        statement.bind((1, to_db_id(user_id)))?;
        collect_tasks(&mut statement)
    }

    /// Due-poll: pending tasks whose due time is at or before `now`
    pub async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE status = 'pending' AND due_at <= ?
             ORDER BY due_at ASC, id ASC"
        ))?;
        statement.bind((1, format_stored(now).as_str()))?;
        collect_tasks(&mut statement)
    }

    /// Mark a task done. Returns false when the task does not exist for this user
    pub async fn complete_task(&self, task_id: i64, user_id: u64) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare("UPDATE tasks SET status = 'done' WHERE id = ? AND user_id = ?")?;
        statement.bind((1, task_id))?;
        statement.bind((2, to_db_id(user_id)))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Move the due time and reset the reminder throttle
    pub async fn postpone_task(
        &self,
        task_id: i64,
        user_id: u64,
        new_due: DateTime<Utc>,
    ) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "UPDATE tasks SET due_at = ?, last_reminded_at = NULL, status = 'pending'
             WHERE id = ? AND user_id = ?",
        )?;
        statement.bind((1, format_stored(new_due).as_str()))?;
        statement.bind((2, task_id))?;
        statement.bind((3, to_db_id(user_id)))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    /// Record that a reminder was sent for the task
    pub async fn mark_task_reminded(&self, task_id: i64, at: DateTime<Utc>) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("UPDATE tasks SET last_reminded_at = ? WHERE id = ?")?;
        statement.bind((1, format_stored(at).as_str()))?;
        statement.bind((2, task_id))?;
        statement.next()?;
        Ok(())
    }

    /// Delete a task owned by `user_id`
    pub async fn delete_task(&self, task_id: i64, user_id: u64) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("DELETE FROM tasks WHERE id = ? AND user_id = ?")?;
        statement.bind((1, task_id))?;
        statement.bind((2, to_db_id(user_id)))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get_task() {
        let db = Database::in_memory().await.unwrap();
        let id = db
            .add_task(1, "Buy milk", Some("2 liters"), at(18, 0))
            .await
            .unwrap();

        let task = db.get_task(id, 1).await.unwrap().unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("2 liters"));
        assert_eq!(task.due_at, at(18, 0));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.last_reminded_at.is_none());

        // Other users cannot see it
        assert!(db.get_task(id, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_poll_boundary() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_task(1, "Call mom", None, at(12, 0)).await.unwrap();

        assert!(db.due_tasks(at(11, 59)).await.unwrap().is_empty());

        let due = db.due_tasks(at(12, 0)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, id);

        assert_eq!(db.due_tasks(at(15, 0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_task_leaves_due_poll() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_task(1, "Pay rent", None, at(9, 0)).await.unwrap();
        assert_eq!(db.due_tasks(at(10, 0)).await.unwrap().len(), 1);

        assert!(db.complete_task(id, 1).await.unwrap());
        assert!(db.due_tasks(at(10, 0)).await.unwrap().is_empty());
        assert!(db.get_user_tasks(1).await.unwrap().is_empty());

        let task = db.get_task(id, 1).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.effective_status(at(23, 0)), TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_complete_requires_owner() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_task(1, "Secret", None, at(9, 0)).await.unwrap();

        assert!(!db.complete_task(id, 2).await.unwrap());
        assert!(!db.delete_task(id, 2).await.unwrap());
        assert_eq!(db.due_tasks(at(10, 0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_postpone_resets_reminder() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_task(1, "Stretch", None, at(9, 0)).await.unwrap();
        db.mark_task_reminded(id, at(9, 5)).await.unwrap();

        let task = db.get_task(id, 1).await.unwrap().unwrap();
        assert_eq!(task.last_reminded_at, Some(at(9, 5)));

        assert!(db.postpone_task(id, 1, at(10, 0)).await.unwrap());
        let task = db.get_task(id, 1).await.unwrap().unwrap();
        assert_eq!(task.due_at, at(10, 0));
        assert!(task.last_reminded_at.is_none());
        assert!(db.due_tasks(at(9, 30)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_tasks_ordered_by_due() {
        let db = Database::in_memory().await.unwrap();
        db.add_task(1, "Later", None, at(20, 0)).await.unwrap();
        db.add_task(1, "Sooner", None, at(8, 0)).await.unwrap();
        db.add_task(2, "Someone else", None, at(7, 0)).await.unwrap();

        let titles: Vec<String> = db
            .get_user_tasks(1)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_task(1, "Temp", None, at(9, 0)).await.unwrap();
        assert!(db.delete_task(id, 1).await.unwrap());
        assert!(!db.delete_task(id, 1).await.unwrap());
        assert!(db.get_task(id, 1).await.unwrap().is_none());
    }

    #[test]
    fn test_effective_status_and_throttle() {
        let task = Task {
            id: 1,
            user_id: 1,
            title: "t".into(),
            description: None,
            due_at: at(12, 0),
            status: TaskStatus::Pending,
            last_reminded_at: Some(at(12, 30)),
            created_at: at(8, 0),
        };
        assert_eq!(task.effective_status(at(11, 0)), TaskStatus::Pending);
        assert_eq!(task.effective_status(at(12, 0)), TaskStatus::Overdue);
        assert!(task.reminded_within(Duration::hours(1), at(13, 0)));
        assert!(!task.reminded_within(Duration::hours(1), at(13, 30)));
    }
}

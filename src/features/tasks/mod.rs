//! # Tasks Feature
//!
//! Personal to-do items with a due time, reminders and postponing.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Postpone counts from now when the task is already overdue
//! - 1.1.0: Urgency markers and numbered task buttons
//! - 1.0.0: Initial release

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::core::datetime::{format_local, format_time_left, parse_due};
use crate::core::keyboard::{nav_row, paginate, truncate_chars, Button, Keyboard, Screen, Style};
use crate::core::response::escape_markdown;
use crate::database::{Task, TaskStatus};

pub const TASKS_PER_PAGE: usize = 5;
pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// A due task is reminded again only after this long
pub const REMINDER_THROTTLE_MINUTES: i64 = 60;

/// Postpone choices offered on the postpone screen, in minutes
pub const POSTPONE_PRESETS: [(&str, i64); 6] = [
    ("5 min", 5),
    ("10 min", 10),
    ("30 min", 30),
    ("1 hour", 60),
    ("3 hours", 180),
    ("1 day", 1440),
];

/// Raw form input, also kept as a draft to refill the form after an error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub due: String,
}

/// A validated task ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_at: DateTime<Utc>,
}

pub fn validate_title(input: &str) -> Result<String> {
    let title = input.trim();
    let len = title.chars().count();
    if len < TITLE_MIN_CHARS {
        return Err(anyhow!("The title must be at least {TITLE_MIN_CHARS} characters long"));
    }
    if len > TITLE_MAX_CHARS {
        return Err(anyhow!("The title must be at most {TITLE_MAX_CHARS} characters long"));
    }
    Ok(title.to_string())
}

/// Empty input or a single `-` means no description
pub fn validate_description(input: &str) -> Result<Option<String>> {
    let description = input.trim();
    if description.is_empty() || description == "-" {
        return Ok(None);
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(anyhow!(
            "The description must be at most {DESCRIPTION_MAX_CHARS} characters long"
        ));
    }
    Ok(Some(description.to_string()))
}

pub fn validate_due(input: &str, tz: Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let due = parse_due(input, tz)
        .map_err(|e| anyhow!("Invalid date ({e}). Example: 15.10.2025 14:30"))?;
    if due <= now {
        return Err(anyhow!("The due time must be in the future"));
    }
    Ok(due)
}

pub fn validate_task_form(form: &TaskForm, tz: Tz, now: DateTime<Utc>) -> Result<NewTask> {
    Ok(NewTask {
        title: validate_title(&form.title)?,
        description: validate_description(&form.description)?,
        due_at: validate_due(&form.due, tz, now)?,
    })
}

/// New due time after postponing by `minutes`. Overdue tasks are pushed
/// from now so the reminder does not fire straight away.
pub fn postponed_due(task: &Task, minutes: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    task.due_at.max(now) + Duration::minutes(minutes)
}

/// Overdue first (most overdue on top), then soonest due
pub fn sort_by_urgency(tasks: &mut [Task], now: DateTime<Utc>) {
    tasks.sort_by_key(|task| (task.due_at > now, task.due_at, task.id));
}

pub fn status_marker(task: &Task, now: DateTime<Utc>) -> &'static str {
    match task.effective_status(now) {
        TaskStatus::Done => "✅",
        TaskStatus::Overdue => "🔴",
        TaskStatus::Pending if task.due_at - now < Duration::minutes(60) => "🟡",
        TaskStatus::Pending => "🟢",
    }
}

fn time_left_label(task: &Task, now: DateTime<Utc>) -> String {
    match format_time_left(task.due_at, now).as_str() {
        "overdue" => "⏰ overdue".to_string(),
        left => format!("⏳ {left}"),
    }
}

fn list_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("➕ Add task", "task:add").style(Style::Success),
        Button::new("◀️ Back", "menu:main"),
    ])
}

/// Task list page; `tasks` must already be in display order
pub fn list_screen(tasks: &[Task], page: usize, now: DateTime<Utc>, tz: Tz) -> Screen {
    if tasks.is_empty() {
        return Screen::new(
            "📋 **You have no active tasks**\n\nAdd a new task to get started!",
            list_keyboard(),
        );
    }

    let page = paginate(tasks, page, TASKS_PER_PAGE);
    let mut text = format!(
        "📋 **Your tasks** (page {}/{})\n\n",
        page.index + 1,
        page.total_pages
    );

    let mut numbers = Vec::with_capacity(page.items.len());
    for (i, task) in page.items.iter().enumerate() {
        let number = page.offset + i + 1;
        text.push_str(&format!(
            "`{number}` {} **{}**\n      {} • {}\n\n",
            status_marker(task, now),
            escape_markdown(&truncate_chars(&task.title, 50)),
            format_local(task.due_at, tz),
            time_left_label(task, now),
        ));
        numbers.push(Button::new(number.to_string(), format!("task:view:{}", task.id)));
    }

    let keyboard = Keyboard::new()
        .row(numbers)
        .row(nav_row(&page, |p| format!("task:list:{p}"), "task:noop"))
        .extend(list_keyboard());

    Screen::new(text.trim_end(), keyboard)
}

/// Complete / postpone / delete buttons for one task
pub fn action_keyboard(task_id: i64, with_back: bool) -> Keyboard {
    let mut buttons = vec![
        Button::new("✅ Done", format!("task:done:{task_id}")).style(Style::Success),
        Button::new("⏰ Postpone", format!("task:postpone:{task_id}")).style(Style::Primary),
        Button::new("🗑 Delete", format!("task:delete:{task_id}")).style(Style::Danger),
    ];
    if with_back {
        buttons.push(Button::new("◀️ To list", "task:list:0"));
    }
    Keyboard::new().row(buttons)
}

fn status_line(task: &Task, now: DateTime<Utc>) -> String {
    match task.effective_status(now) {
        TaskStatus::Done => "✅ Done".to_string(),
        TaskStatus::Overdue => "🔴 Overdue!".to_string(),
        TaskStatus::Pending => format!(
            "{} {} left",
            status_marker(task, now),
            format_time_left(task.due_at, now)
        ),
    }
}

fn task_details(task: &Task, now: DateTime<Utc>, tz: Tz) -> String {
    let description = task
        .description
        .as_deref()
        .map(escape_markdown)
        .unwrap_or_else(|| "Not specified".to_string());
    format!(
        "**{}**\n\n**Description:** {}\n**Due:** {}\n**Status:** {}",
        escape_markdown(&task.title),
        description,
        format_local(task.due_at, tz),
        status_line(task, now)
    )
}

pub fn task_screen(task: &Task, now: DateTime<Utc>, tz: Tz) -> Screen {
    Screen::new(task_details(task, now, tz), action_keyboard(task.id, true))
}

pub fn postpone_screen(task: &Task) -> Screen {
    let presets: Vec<Button> = POSTPONE_PRESETS
        .iter()
        .map(|(label, minutes)| Button::new(*label, format!("task:delay:{}:{minutes}", task.id)))
        .collect();
    let keyboard = Keyboard::adjusted(presets, &[3]).row(vec![Button::new(
        "◀️ Back",
        format!("task:view:{}", task.id),
    )]);

    Screen::new(
        format!(
            "⏰ **Postpone task**\n\n**{}**\n\nHow long should it wait?",
            escape_markdown(&task.title)
        ),
        keyboard,
    )
}

pub fn delete_confirm_screen(task: &Task) -> Screen {
    Screen::new(
        format!("🗑 Delete **{}**?", escape_markdown(&task.title)),
        Keyboard::new().row(vec![
            Button::new("✅ Yes, delete", format!("task:delete_yes:{}", task.id)).style(Style::Danger),
            Button::new("❌ No", format!("task:view:{}", task.id)),
        ]),
    )
}

pub fn created_text(task: &NewTask, tz: Tz) -> String {
    format!(
        "✅ **Task created!**\n\n**Title:** {}\n**Description:** {}\n**Due:** {}",
        escape_markdown(&task.title),
        task.description
            .as_deref()
            .map(escape_markdown)
            .unwrap_or_else(|| "Not specified".to_string()),
        format_local(task.due_at, tz)
    )
}

/// Direct message sent when a task falls due
pub fn reminder_screen(task: &Task, now: DateTime<Utc>, tz: Tz) -> Screen {
    Screen::new(
        format!("⏰ **Task reminder**\n\n{}", task_details(task, now, tz)),
        action_keyboard(task.id, false),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Moscow;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn task(id: i64, title: &str, due: DateTime<Utc>) -> Task {
        Task {
            id,
            user_id: 1,
            title: title.to_string(),
            description: None,
            due_at: due,
            status: TaskStatus::Pending,
            last_reminded_at: None,
            created_at: now() - Duration::days(1),
        }
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("ab").is_err());
        assert!(validate_title("  ab  ").is_err());
        assert_eq!(validate_title(" abc ").unwrap(), "abc");
        assert!(validate_title(&"x".repeat(200)).is_ok());
        assert!(validate_title(&"x".repeat(201)).is_err());
        // Counted in characters, not bytes
        assert!(validate_title("ёжик").is_ok());
    }

    #[test]
    fn test_description_validation() {
        assert_eq!(validate_description("-").unwrap(), None);
        assert_eq!(validate_description("   ").unwrap(), None);
        assert_eq!(validate_description(" notes ").unwrap().as_deref(), Some("notes"));
        assert!(validate_description(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_due_must_be_future() {
        // 12:00 Moscow is 09:00 UTC, equal to now
        assert!(validate_due("10.03.2025 12:00", Moscow, now()).is_err());
        let due = validate_due("10.03.2025 12:01", Moscow, now()).unwrap();
        assert_eq!(due, now() + Duration::minutes(1));
        assert!(validate_due("2025-03-10 12:00", Moscow, now()).is_err());
    }

    #[test]
    fn test_validate_form() {
        let form = TaskForm {
            title: "Buy milk".into(),
            description: "-".into(),
            due: "11.03.2025 10:00".into(),
        };
        let task = validate_task_form(&form, Moscow, now()).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(task.description.is_none());

        let bad = TaskForm {
            title: "ok".into(),
            ..form
        };
        assert!(validate_task_form(&bad, Moscow, now()).is_err());
    }

    #[test]
    fn test_postponed_due() {
        let future = task(1, "Later", now() + Duration::hours(2));
        assert_eq!(postponed_due(&future, 30, now()), now() + Duration::minutes(150));

        let overdue = task(2, "Late", now() - Duration::hours(5));
        assert_eq!(postponed_due(&overdue, 10, now()), now() + Duration::minutes(10));
    }

    #[test]
    fn test_sort_by_urgency() {
        let mut tasks = vec![
            task(1, "Soon", now() + Duration::minutes(30)),
            task(2, "Very late", now() - Duration::days(2)),
            task(3, "Next week", now() + Duration::days(7)),
            task(4, "Late", now() - Duration::hours(1)),
        ];
        sort_by_urgency(&mut tasks, now());
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_status_markers() {
        assert_eq!(status_marker(&task(1, "a", now() - Duration::minutes(1)), now()), "🔴");
        assert_eq!(status_marker(&task(1, "a", now() + Duration::minutes(59)), now()), "🟡");
        assert_eq!(status_marker(&task(1, "a", now() + Duration::hours(2)), now()), "🟢");
    }

    #[test]
    fn test_list_screen_pages_and_buttons() {
        let tasks: Vec<Task> = (1..=7)
            .map(|i| task(i, &format!("Task {i}"), now() + Duration::hours(i)))
            .collect();

        let screen = list_screen(&tasks, 0, now(), Moscow);
        assert!(screen.text.contains("(page 1/2)"));
        assert!(screen.text.contains("**Task 5**"));
        assert!(!screen.text.contains("**Task 6**"));
        assert_eq!(screen.keyboard.rows()[0].len(), 5);
        assert!(screen.keyboard.find("task:view:1").is_some());
        assert!(screen.keyboard.find("task:list:1").is_some());
        assert!(screen.keyboard.validate().is_ok());

        let second = list_screen(&tasks, 1, now(), Moscow);
        assert!(second.text.contains("`6`"));
        assert!(second.keyboard.find("task:view:7").is_some());
        assert!(second.keyboard.find("task:list:0").is_some());
    }

    #[test]
    fn test_empty_list_screen() {
        let screen = list_screen(&[], 0, now(), Moscow);
        assert!(screen.text.contains("no active tasks"));
        assert!(screen.keyboard.find("task:add").is_some());
    }

    #[test]
    fn test_task_and_postpone_screens() {
        let t = task(9, "Call *mom*", now() + Duration::hours(3));

        let screen = task_screen(&t, now(), Moscow);
        assert!(screen.text.contains("Call \\*mom\\*"));
        assert!(screen.text.contains("10.03.2025 15:00"));
        assert!(screen.text.contains("3h left"));
        assert!(screen.keyboard.find("task:done:9").is_some());
        assert!(screen.keyboard.find("task:list:0").is_some());

        let postpone = postpone_screen(&t);
        assert!(postpone.keyboard.find("task:delay:9:5").is_some());
        assert!(postpone.keyboard.find("task:delay:9:1440").is_some());
        assert!(postpone.keyboard.validate().is_ok());

        let reminder = reminder_screen(&t, now(), Moscow);
        assert!(reminder.text.starts_with("⏰ **Task reminder**"));
        assert!(reminder.keyboard.find("task:list:0").is_none());
    }
}

//! Periodic reminder loop
//!
//! Every tick polls due tasks, upcoming birthdays and the morning summary,
//! then deletes yesterday's morning message. Once-a-day messages are guarded
//! by markers in the daily message log, so a restart or a short poll interval
//! never sends the same notice twice.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use serenity::http::Http;
use std::collections::HashMap;
use std::sync::Arc;

use super::notifier::{Notifier, SerenityNotifier};
use super::summary::SummarySource;
use crate::core::config::Config;
use crate::core::datetime::next_occurrence;
use crate::core::{Button, Keyboard, Screen};
use crate::database::Database;
use crate::features::birthdays::{advance_notice, days_until_birthday, today_notice};
use crate::features::tasks::{reminder_screen, REMINDER_THROTTLE_MINUTES};

pub const MORNING_KIND: &str = "morning";
/// Markers without a message are kept this long
pub const MARKER_RETENTION_DAYS: i64 = 30;
/// Morning messages older than this are forgotten even if deletion fails
const STALE_CLEANUP_DAYS: i64 = 2;

/// Local time after which today's morning message is cleaned up
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}

pub fn birthday_eve_kind(birthday_id: i64) -> String {
    format!("birthday_eve:{birthday_id}")
}

pub fn birthday_today_kind(birthday_id: i64) -> String {
    format!("birthday_today:{birthday_id}")
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub poll_interval: std::time::Duration,
    pub birthday_lead_days: i64,
    pub birthday_notify_hour: u32,
    pub morning_hour: u32,
    pub admin_user_id: u64,
    pub default_timezone: Tz,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(config.task_poll_interval_secs),
            birthday_lead_days: config.birthday_lead_days,
            birthday_notify_hour: config.birthday_notify_hour,
            morning_hour: config.morning_message_hour,
            admin_user_id: config.admin_user_id,
            default_timezone: config.default_timezone,
        }
    }
}

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub task_reminders: usize,
    pub birthday_notices: usize,
    pub morning_sent: bool,
    pub cleaned_up: usize,
    pub failures: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub struct ReminderScheduler {
    database: Database,
    settings: SchedulerSettings,
    summary: Arc<dyn SummarySource>,
}

impl ReminderScheduler {
    pub fn new(database: Database, settings: SchedulerSettings, summary: Arc<dyn SummarySource>) -> Self {
        Self {
            database,
            settings,
            summary,
        }
    }

    /// Run forever, delivering through Discord
    pub async fn run(self, http: Arc<Http>) {
        let notifier = SerenityNotifier::new(http);
        let mut interval = tokio::time::interval(self.settings.poll_interval);

        info!(
            "Reminder scheduler started (every {}s)",
            self.settings.poll_interval.as_secs()
        );

        loop {
            interval.tick().await;
            let report = self.tick(&notifier, Utc::now()).await;
            if report.is_idle() {
                debug!("Scheduler tick: nothing to do");
            } else {
                info!("Scheduler tick: {report:?}");
            }
        }
    }

    /// One pass over every job. A failing job is logged and the rest still run.
    pub async fn tick(&self, notifier: &dyn Notifier, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        if let Err(e) = self.poll_due_tasks(notifier, now, &mut report).await {
            error!("Task due-poll failed: {e:#}");
            report.failures += 1;
        }
        if let Err(e) = self.poll_birthdays(notifier, now, &mut report).await {
            error!("Birthday poll failed: {e:#}");
            report.failures += 1;
        }
        if let Err(e) = self.cleanup_morning_messages(notifier, now, &mut report).await {
            error!("Morning message cleanup failed: {e:#}");
            report.failures += 1;
        }
        if let Err(e) = self.send_morning_summary(notifier, now, &mut report).await {
            error!("Morning summary failed: {e:#}");
            report.failures += 1;
        }

        report
    }

    async fn timezone_of(&self, user_id: u64, cache: &mut HashMap<u64, Tz>) -> Result<Tz> {
        if let Some(tz) = cache.get(&user_id) {
            return Ok(*tz);
        }
        let tz = self
            .database
            .user_timezone(user_id, self.settings.default_timezone)
            .await?;
        cache.insert(user_id, tz);
        Ok(tz)
    }

    async fn poll_due_tasks(
        &self,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let throttle = Duration::minutes(REMINDER_THROTTLE_MINUTES);
        let mut timezones = HashMap::new();

        for task in self.database.due_tasks(now).await? {
            if task.reminded_within(throttle, now) {
                continue;
            }

            let tz = self.timezone_of(task.user_id, &mut timezones).await?;
            match notifier.send(task.user_id, &reminder_screen(&task, now, tz)).await {
                Ok(_) => {
                    self.database.mark_task_reminded(task.id, now).await?;
                    info!("Sent reminder for task {} to user {}", task.id, task.user_id);
                    report.task_reminders += 1;
                }
                Err(e) => {
                    error!("Failed to send reminder for task {} to user {}: {e:#}", task.id, task.user_id);
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn poll_birthdays(
        &self,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let lead = self.settings.birthday_lead_days;
        let mut timezones = HashMap::new();

        for birthday in self.database.get_all_birthdays().await? {
            let tz = self.timezone_of(birthday.user_id, &mut timezones).await?;
            let local = now.with_timezone(&tz);
            if local.hour() < self.settings.birthday_notify_hour {
                continue;
            }
            let today = local.date_naive();

            let days = days_until_birthday(&birthday, today);
            let (kind, text) = if days == 0 {
                (birthday_today_kind(birthday.id), today_notice(&birthday, today))
            } else if lead > 0 && days == lead {
                let Some(occurs_on) = next_occurrence(birthday.day, birthday.month, today) else {
                    continue;
                };
                (birthday_eve_kind(birthday.id), advance_notice(&birthday, lead, occurs_on))
            } else {
                continue;
            };

            if self.database.has_daily_marker(birthday.user_id, today, &kind).await? {
                continue;
            }

            let screen = Screen::new(
                text,
                Keyboard::new().row(vec![Button::new("🎂 Birthdays", "bd:list:0")]),
            );
            match notifier.send(birthday.user_id, &screen).await {
                Ok(_) => {
                    self.database
                        .record_daily_message(birthday.user_id, today, &kind, None)
                        .await?;
                    info!("Sent {kind} notice to user {}", birthday.user_id);
                    report.birthday_notices += 1;
                }
                Err(e) => {
                    error!("Failed to send {kind} notice to user {}: {e:#}", birthday.user_id);
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn send_morning_summary(
        &self,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let admin = self.settings.admin_user_id;
        let tz = self.database.user_timezone(admin, self.settings.default_timezone).await?;
        let local = now.with_timezone(&tz);
        if local.hour() < self.settings.morning_hour || local.time() >= end_of_day() {
            return Ok(());
        }

        let today = local.date_naive();
        if self.database.has_daily_marker(admin, today, MORNING_KIND).await? {
            return Ok(());
        }

        let text = self.summary.morning_summary(today).await?;
        match notifier.send(admin, &Screen::text_only(text)).await {
            Ok(sent) => {
                self.database
                    .record_daily_message(
                        admin,
                        today,
                        MORNING_KIND,
                        Some((sent.channel_id, sent.message_id)),
                    )
                    .await?;
                info!("Morning summary sent to admin (message {})", sent.message_id);
                report.morning_sent = true;
            }
            Err(e) => {
                // No marker, so the next tick retries
                error!("Failed to send morning summary: {e:#}");
                report.failures += 1;
            }
        }
        Ok(())
    }

    async fn cleanup_morning_messages(
        &self,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let admin = self.settings.admin_user_id;
        let tz = self.database.user_timezone(admin, self.settings.default_timezone).await?;
        let local = now.with_timezone(&tz);
        let today = local.date_naive();
        let cutoff = if local.time() >= end_of_day() {
            today
        } else {
            today - Duration::days(1)
        };

        for message in self.database.pending_cleanup(MORNING_KIND, cutoff).await? {
            let (Some(channel_id), Some(message_id)) = (message.channel_id, message.message_id) else {
                continue;
            };

            match notifier.delete(channel_id, message_id).await {
                Ok(()) => {
                    self.forget(message.user_id, message.sent_on).await?;
                    info!("Deleted morning message {message_id} from {}", message.sent_on);
                    report.cleaned_up += 1;
                }
                Err(e) if message.sent_on < today - Duration::days(STALE_CLEANUP_DAYS) => {
                    warn!("Giving up on morning message {message_id} from {}: {e:#}", message.sent_on);
                    self.forget(message.user_id, message.sent_on).await?;
                }
                Err(e) => {
                    warn!("Failed to delete morning message {message_id}: {e:#}");
                    report.failures += 1;
                }
            }
        }

        let pruned = self
            .database
            .prune_daily_markers(today - Duration::days(MARKER_RETENTION_DAYS))
            .await?;
        if pruned > 0 {
            debug!("Pruned {pruned} old daily markers");
        }
        Ok(())
    }

    async fn forget(&self, user_id: u64, sent_on: NaiveDate) -> Result<()> {
        self.database
            .clear_daily_message_ref(user_id, sent_on, MORNING_KIND)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::datetime::MonthDay;
    use crate::features::reminders::notifier::SentMessage;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    const ADMIN: u64 = 42;
    const USER: u64 = 7;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(u64, Screen)>>,
        deleted: Mutex<Vec<(u64, u64)>>,
        next_id: AtomicU64,
        failing: AtomicBool,
        failing_delete: AtomicBool,
    }

    impl RecordingNotifier {
        fn sent_to(&self, user_id: u64) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == user_id)
                .map(|(_, screen)| screen.text.clone())
                .collect()
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, user_id: u64, screen: &Screen) -> Result<SentMessage> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow!("Cannot send messages to this user"));
            }
            self.sent.lock().unwrap().push((user_id, screen.clone()));
            let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1000;
            Ok(SentMessage {
                channel_id: 500 + user_id,
                message_id,
            })
        }

        async fn delete(&self, channel_id: u64, message_id: u64) -> Result<()> {
            if self.failing_delete.load(Ordering::SeqCst) {
                return Err(anyhow!("Missing Permissions"));
            }
            self.deleted.lock().unwrap().push((channel_id, message_id));
            Ok(())
        }
    }

    struct FixedSummary;

    #[async_trait]
    impl SummarySource for FixedSummary {
        async fn morning_summary(&self, today: NaiveDate) -> Result<String> {
            Ok(format!("Good morning {today}"))
        }
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            poll_interval: std::time::Duration::from_secs(300),
            birthday_lead_days: 1,
            birthday_notify_hour: 9,
            morning_hour: 8,
            admin_user_id: ADMIN,
            default_timezone: chrono_tz::Europe::Moscow,
        }
    }

    async fn scheduler() -> (ReminderScheduler, Database) {
        scheduler_with(settings()).await
    }

    async fn scheduler_with(settings: SchedulerSettings) -> (ReminderScheduler, Database) {
        let db = Database::in_memory().await.unwrap();
        let scheduler = ReminderScheduler::new(db.clone(), settings, Arc::new(FixedSummary));
        (scheduler, db)
    }

    /// UTC instant for a Moscow (UTC+3) wall-clock time
    fn moscow(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        chrono_tz::Europe::Moscow
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_task_reminded_once_due_and_throttled() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();
        let due = moscow(2025, 3, 10, 12, 0);
        let id = db.add_task(USER, "Pay rent", None, due).await.unwrap();

        let early = scheduler.tick(&notifier, due - Duration::minutes(1)).await;
        assert_eq!(early.task_reminders, 0);

        let report = scheduler.tick(&notifier, due).await;
        assert_eq!(report.task_reminders, 1);
        let texts = notifier.sent_to(USER);
        assert!(texts[0].contains("Pay rent"));

        // Within the throttle window nothing is resent
        let again = scheduler.tick(&notifier, due + Duration::minutes(30)).await;
        assert_eq!(again.task_reminders, 0);

        let later = scheduler.tick(&notifier, due + Duration::minutes(61)).await;
        assert_eq!(later.task_reminders, 1);

        assert!(db.complete_task(id, USER).await.unwrap());
        let done = scheduler.tick(&notifier, due + Duration::hours(5)).await;
        assert_eq!(done.task_reminders, 0);
        assert_eq!(notifier.sent_to(USER).len(), 2);
    }

    #[tokio::test]
    async fn test_birthday_advance_notice_sent_once() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();
        db.add_birthday(USER, "Alice", MonthDay { day: 11, month: 3, year: Some(1990) })
            .await
            .unwrap();

        // Before the notify hour
        scheduler.tick(&notifier, moscow(2025, 3, 10, 8, 30)).await;
        assert!(notifier.sent_to(USER).is_empty());

        let first = scheduler.tick(&notifier, moscow(2025, 3, 10, 9, 0)).await;
        assert_eq!(first.birthday_notices, 1);
        for hour in 10..=23 {
            let report = scheduler.tick(&notifier, moscow(2025, 3, 10, hour, 0)).await;
            assert_eq!(report.birthday_notices, 0);
        }
        let texts = notifier.sent_to(USER);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Tomorrow it's **Alice**'s birthday"));

        // Two days before and on the day itself no advance notice goes out
        scheduler.tick(&notifier, moscow(2025, 3, 9, 12, 0)).await;
        scheduler.tick(&notifier, moscow(2025, 3, 11, 12, 0)).await;
        scheduler.tick(&notifier, moscow(2025, 3, 11, 18, 0)).await;
        let texts = notifier.sent_to(USER);
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("Today is Alice's birthday!"));

        // Next year it fires again
        let next_year = scheduler.tick(&notifier, moscow(2026, 3, 10, 9, 30)).await;
        assert_eq!(next_year.birthday_notices, 1);
    }

    #[tokio::test]
    async fn test_advance_notice_uses_lead_days() {
        let (scheduler, db) = scheduler_with(SchedulerSettings {
            birthday_lead_days: 3,
            ..settings()
        })
        .await;
        let notifier = RecordingNotifier::default();
        db.add_birthday(USER, "Dave", MonthDay { day: 14, month: 3, year: None })
            .await
            .unwrap();

        let early = scheduler.tick(&notifier, moscow(2025, 3, 10, 12, 0)).await;
        assert_eq!(early.birthday_notices, 0);

        let report = scheduler.tick(&notifier, moscow(2025, 3, 11, 9, 0)).await;
        assert_eq!(report.birthday_notices, 1);
        scheduler.tick(&notifier, moscow(2025, 3, 11, 20, 0)).await;
        let texts = notifier.sent_to(USER);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("In 3 days it's **Dave**'s birthday (14.03)"));

        // No notice one or two days before, then the greeting on the day
        scheduler.tick(&notifier, moscow(2025, 3, 12, 12, 0)).await;
        scheduler.tick(&notifier, moscow(2025, 3, 13, 12, 0)).await;
        assert_eq!(notifier.sent_to(USER).len(), 1);
        let on_the_day = scheduler.tick(&notifier, moscow(2025, 3, 14, 12, 0)).await;
        assert_eq!(on_the_day.birthday_notices, 1);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();
        db.add_birthday(USER, "Bob", MonthDay { day: 11, month: 3, year: None })
            .await
            .unwrap();

        notifier.failing.store(true, Ordering::SeqCst);
        let failed = scheduler.tick(&notifier, moscow(2025, 3, 10, 10, 0)).await;
        assert_eq!(failed.birthday_notices, 0);
        assert!(failed.failures >= 1);

        notifier.failing.store(false, Ordering::SeqCst);
        let retried = scheduler.tick(&notifier, moscow(2025, 3, 10, 10, 5)).await;
        assert_eq!(retried.birthday_notices, 1);
    }

    #[tokio::test]
    async fn test_morning_summary_and_cleanup() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();

        scheduler.tick(&notifier, moscow(2025, 3, 10, 7, 0)).await;
        assert!(notifier.sent_to(ADMIN).is_empty());

        let report = scheduler.tick(&notifier, moscow(2025, 3, 10, 8, 0)).await;
        assert!(report.morning_sent);
        let again = scheduler.tick(&notifier, moscow(2025, 3, 10, 12, 0)).await;
        assert!(!again.morning_sent);
        assert_eq!(notifier.sent_to(ADMIN), vec!["Good morning 2025-03-10".to_string()]);

        // Deleted at the end of the day, marker kept so it is not resent
        let evening = scheduler.tick(&notifier, moscow(2025, 3, 10, 23, 59)).await;
        assert_eq!(evening.cleaned_up, 1);
        assert_eq!(notifier.deleted.lock().unwrap().as_slice(), &[(500 + ADMIN, 1000)]);
        assert!(db.has_daily_marker(ADMIN, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), MORNING_KIND)
            .await
            .unwrap());
        assert_eq!(notifier.sent_count(), 1);

        let next_day = scheduler.tick(&notifier, moscow(2025, 3, 11, 8, 1)).await;
        assert!(next_day.morning_sent);
        assert_eq!(next_day.cleaned_up, 0);
    }

    #[tokio::test]
    async fn test_failed_delete_is_retried_then_abandoned() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();
        notifier.failing_delete.store(true, Ordering::SeqCst);

        // Message 1000 is sent on the 10th
        scheduler.tick(&notifier, moscow(2025, 3, 10, 8, 0)).await;
        let evening = scheduler.tick(&notifier, moscow(2025, 3, 10, 23, 59)).await;
        assert_eq!(evening.cleaned_up, 0);
        assert_eq!(evening.failures, 1);

        // Still pending the next days; 1001 and 1002 are sent on the 11th and 12th
        let retry = scheduler.tick(&notifier, moscow(2025, 3, 11, 8, 0)).await;
        assert_eq!((retry.cleaned_up, retry.failures), (0, 1));
        let pending = db
            .pending_cleanup(MORNING_KIND, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap())
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        scheduler.tick(&notifier, moscow(2025, 3, 12, 8, 0)).await;

        // On the 13th the message from the 10th is older than two days and is dropped
        let give_up = scheduler.tick(&notifier, moscow(2025, 3, 13, 8, 0)).await;
        assert_eq!(give_up.failures, 2);
        let pending = db
            .pending_cleanup(MORNING_KIND, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
            .await
            .unwrap();
        let ids: Vec<Option<u64>> = pending.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![Some(1001), Some(1002)]);

        notifier.failing_delete.store(false, Ordering::SeqCst);
        let recovered = scheduler.tick(&notifier, moscow(2025, 3, 13, 8, 5)).await;
        assert_eq!(recovered.cleaned_up, 2);
        assert_eq!(
            notifier.deleted.lock().unwrap().as_slice(),
            &[(500 + ADMIN, 1001), (500 + ADMIN, 1002)]
        );
    }

    #[tokio::test]
    async fn test_user_timezone_controls_notify_hour() {
        let (scheduler, db) = scheduler().await;
        let notifier = RecordingNotifier::default();
        db.set_timezone(USER, "Asia/Tokyo").await.unwrap();
        db.add_birthday(USER, "Carol", MonthDay { day: 11, month: 3, year: None })
            .await
            .unwrap();

        // 08:30 in Moscow is 14:30 in Tokyo
        let report = scheduler.tick(&notifier, moscow(2025, 3, 10, 8, 30)).await;
        assert_eq!(report.birthday_notices, 1);
    }
}

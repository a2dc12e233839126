//! # Reminders Feature
//!
//! Background scheduler for task reminders, birthday notices and the daily
//! morning summary.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Birthday notices, morning summary and cleanup of old summaries
//! - 1.1.0: Deliveries go through the `Notifier` trait
//! - 1.0.0: Task due reminders

pub mod notifier;
pub mod scheduler;
pub mod summary;

pub use notifier::{Notifier, SentMessage, SerenityNotifier};
pub use scheduler::{ReminderScheduler, SchedulerSettings, TickReport};
pub use summary::{ServiceSummary, SummarySource};

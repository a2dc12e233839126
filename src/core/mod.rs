//! # Core Module
//!
//! Configuration, date handling, keyboards and message utilities shared by
//! every feature.
//!
//! - **Version**: 1.4.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.4.0: Add modal form descriptions with pre-filled values
//! - 1.3.0: Add shared HTTP client helpers for the external services
//! - 1.2.0: Add keyboard/screen module for platform-neutral menus
//! - 1.1.0: Add datetime module with fixed input formats
//! - 1.0.0: Initial creation with config and response modules

pub mod config;
pub mod datetime;
pub mod form;
pub mod http;
pub mod keyboard;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use form::{Form, FormField, FormValues};
pub use keyboard::{Button, Keyboard, Screen, Style};
pub use response::{escape_markdown, truncate_for_message, MESSAGE_LIMIT};

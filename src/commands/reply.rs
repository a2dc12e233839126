//! What a handler wants sent back for an interaction
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Drop `Send`; every screen edits the message it came from
//! - 1.0.0: Initial release

use crate::core::{Button, Form, Keyboard, Screen, Style};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Replace the message the button belongs to
    Update(Screen),
    /// Open a modal form
    Form(Form),
    /// Short note only the user sees
    Notice(String),
    /// Acknowledge without changing anything
    Ack,
}

impl Reply {
    /// Failure text with a way back to the main menu
    pub fn failure(text: impl Into<String>) -> Self {
        Reply::Update(Screen::new(
            text,
            Keyboard::new().row(vec![Button::new("◀️ Main menu", "menu:main")]),
        ))
    }

    /// Rejected form input: explain and offer to re-open the form
    pub fn retry(text: impl Into<String>, retry_id: impl Into<String>, back_id: impl Into<String>) -> Self {
        Reply::Update(Screen::new(
            text,
            Keyboard::new().row(vec![
                Button::new("🔁 Try again", retry_id).style(Style::Primary),
                Button::new("◀️ Back", back_id),
            ]),
        ))
    }

    /// Screen shown to the user, if any
    pub fn screen(&self) -> Option<&Screen> {
        match self {
            Reply::Update(screen) => Some(screen),
            _ => None,
        }
    }
}

/// Generic message for an unexpected service failure
pub const SERVICE_FAILURE: &str = "❌ Something went wrong. Please try again later.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_has_both_buttons() {
        let reply = Reply::retry("❌ Bad date", "task:add", "task:list:0");
        let screen = reply.screen().unwrap();
        assert!(screen.keyboard.find("task:add").is_some());
        assert!(screen.keyboard.find("task:list:0").is_some());
    }
}

//! Handler traits for slash commands and component interactions
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.1.0: `reaches_network` marks button actions that are answered after a deferral
//! - 2.0.0: Add `InteractionHandler` for buttons and modal forms keyed by custom-id prefix
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;
use super::reply::Reply;
use crate::core::FormValues;

/// Trait for slash command handlers
///
/// Each command handler implements this trait to process one or more slash commands.
/// Handlers are registered with a CommandRegistry and dispatched based on command name.
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    fn command_names(&self) -> &'static [&'static str];

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;
}

/// Trait for feature handlers reached through buttons and forms
///
/// Custom ids have the shape `prefix:action[:args]`. The dispatcher strips
/// `prefix:` and hands the rest over as `action`.
///
/// ```ignore
/// pub struct WeatherHandler;
///
/// #[async_trait]
/// impl InteractionHandler for WeatherHandler {
///     fn prefix(&self) -> &'static str {
///         "weather"
///     }
///
///     async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
///         // "current", "forecast", ...
///         Ok(Reply::Ack)
///     }
/// }
/// ```
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    fn prefix(&self) -> &'static str;

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply>;

    /// Whether a button action calls an external service
    ///
    /// Such actions are deferred before the handler runs, since Discord drops
    /// interactions that get no response within three seconds. They must not
    /// answer with a form.
    fn reaches_network(&self, _action: &str) -> bool {
        false
    }

    async fn handle_form(
        &self,
        _ctx: &CommandContext,
        _user_id: u64,
        _action: &str,
        _values: &FormValues,
    ) -> Result<Reply> {
        Ok(Reply::Notice("This form has expired. Please open it again.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both traits are used as trait objects
    fn _assert_object_safe(_: &dyn SlashCommandHandler, _: &dyn InteractionHandler) {}
}

//! # Command System
//!
//! Slash commands, button clicks and form submissions.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Button and form handlers routed by custom id prefix
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 2.0.0: Remove bang commands, slash-only command system
//! - 1.0.0: Initial reorganization with modular command structure

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod reply;
pub mod slash;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use handler::{InteractionHandler, SlashCommandHandler};
pub use registry::{CommandRegistry, HandlerRegistry};
pub use reply::Reply;

pub use slash::{create_slash_commands, register_global_commands, register_guild_commands};

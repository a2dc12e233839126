//! Command and interaction handler registries
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Add `HandlerRegistry` for custom-id prefix dispatch
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{InteractionHandler, SlashCommandHandler};

/// Registry mapping command names to handlers
///
/// Multiple command names can map to the same handler if they share logic.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for all names returned by `command_names()`
    pub fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered command names (not unique handlers)
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry mapping custom-id prefixes to interaction handlers
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn InteractionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its prefix, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn InteractionHandler>) {
        self.handlers.insert(handler.prefix(), handler);
    }

    /// Split `prefix:action` and find the handler for the prefix
    pub fn route<'a>(&self, custom_id: &'a str) -> Option<(Arc<dyn InteractionHandler>, &'a str)> {
        let (prefix, action) = custom_id.split_once(':').unwrap_or((custom_id, ""));
        self.handlers
            .get(prefix)
            .map(|handler| (Arc::clone(handler), action))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::CommandContext;
    use crate::commands::reply::Reply;
    use anyhow::Result;
    use async_trait::async_trait;
    use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
    use serenity::prelude::Context;

    struct MockHandler {
        names: &'static [&'static str],
    }

    #[async_trait]
    impl SlashCommandHandler for MockHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.names
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    struct MockInteraction;

    #[async_trait]
    impl InteractionHandler for MockInteraction {
        fn prefix(&self) -> &'static str {
            "task"
        }

        async fn handle_button(&self, _ctx: &CommandContext, _user_id: u64, _action: &str) -> Result<Reply> {
            Ok(Reply::Ack)
        }
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_multiple_names() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler {
            names: &["start", "menu"],
        }));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("start"));
        assert!(registry.contains("menu"));
        assert!(registry.get("help").is_none());
    }

    #[test]
    fn test_route_by_prefix() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(MockInteraction));

        let (handler, action) = registry.route("task:delay:7:30").unwrap();
        assert_eq!(handler.prefix(), "task");
        assert_eq!(action, "delay:7:30");

        let (_, action) = registry.route("task").unwrap();
        assert_eq!(action, "");

        assert!(registry.route("bd:list:0").is_none());
        assert!(registry.route("taskx:list").is_none());
    }
}

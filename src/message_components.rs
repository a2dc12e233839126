//! # Interaction Dispatch
//!
//! Routes slash commands, button clicks and modal submissions to their
//! handlers and turns the handler's [`Reply`] into a Discord response.
//!
//! - **Version**: 3.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.1.0: Network-bound buttons and all modal submissions are deferred, then edited
//! - 3.0.0: Prefix routing through `HandlerRegistry`, replies rendered in one place
//! - 2.0.0: Modal submissions
//! - 1.0.0: Button interactions

use anyhow::Result;
use log::{debug, error, info, warn};
use serenity::builder::{CreateComponents, CreateInteractionResponse, EditInteractionResponse};
use serenity::model::application::component::{ActionRow, ActionRowComponent};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::modal::ModalSubmitInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::handlers::{create_all_handlers, create_interaction_handlers};
use crate::commands::reply::SERVICE_FAILURE;
use crate::commands::{CommandContext, CommandRegistry, HandlerRegistry, Reply};
use crate::core::{truncate_for_message, FormValues, Screen};

/// Dispatcher for every interaction the bot receives
pub struct MessageComponentHandler {
    ctx: Arc<CommandContext>,
    commands: CommandRegistry,
    handlers: HandlerRegistry,
}

impl MessageComponentHandler {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        let mut commands = CommandRegistry::new();
        for handler in create_all_handlers() {
            commands.register(handler);
        }
        let mut handlers = HandlerRegistry::new();
        for handler in create_interaction_handlers() {
            handlers.register(handler);
        }
        info!(
            "Interaction dispatch ready: {} slash commands, {} button prefixes",
            commands.len(),
            handlers.len()
        );

        Self {
            ctx,
            commands,
            handlers,
        }
    }

    pub fn context(&self) -> &Arc<CommandContext> {
        &self.ctx
    }

    pub async fn handle_slash_command(&self, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<()> {
        let request_id = Uuid::new_v4();
        let user_id = command.user.id.0;
        info!(
            "[{request_id}] 📥 Slash command received | Command: {} | User: {user_id}",
            command.data.name
        );

        let notice = match self.rate_limit_notice(request_id, user_id) {
            Some(notice) => Some(notice),
            None if self.commands.get(&command.data.name).is_none() => {
                warn!("[{request_id}] Unknown command: {}", command.data.name);
                Some(Reply::Notice("Unknown command.".to_string()))
            }
            None => None,
        };
        if let Some(notice) = notice {
            command
                .create_interaction_response(&ctx.http, |response| build_response(response, notice, false))
                .await?;
            return Ok(());
        }

        if let Some(handler) = self.commands.get(&command.data.name) {
            handler.handle(Arc::clone(&self.ctx), ctx, command).await?;
        }
        debug!("[{request_id}] ✅ Slash command handled");
        Ok(())
    }

    /// Handle a button click
    pub async fn handle_component_interaction(
        &self,
        ctx: &Context,
        interaction: &MessageComponentInteraction,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        let custom_id = interaction.data.custom_id.as_str();
        let user_id = interaction.user.id.0;
        info!("[{request_id}] 📥 Component interaction | Id: {custom_id} | User: {user_id}");

        let reply = match self.rate_limit_notice(request_id, user_id) {
            Some(notice) => notice,
            None if self.defers_button(custom_id) => {
                // Immediately defer the interaction to prevent timeout
                interaction
                    .create_interaction_response(&ctx.http, |response| build_deferred(response, true))
                    .await?;
                debug!("[{request_id}] ⏳ Component deferred");

                match self.dispatch_button(request_id, user_id, custom_id).await {
                    Reply::Update(screen) => {
                        interaction
                            .edit_original_interaction_response(&ctx.http, |edit| edit_with_screen(edit, &screen))
                            .await?;
                    }
                    Reply::Notice(text) => {
                        interaction
                            .create_followup_message(&ctx.http, |message| {
                                message.content(truncate_for_message(&text)).ephemeral(true)
                            })
                            .await?;
                    }
                    Reply::Form(_) | Reply::Ack => {}
                }
                debug!("[{request_id}] ✅ Deferred component response sent");
                return Ok(());
            }
            None => self.dispatch_button(request_id, user_id, custom_id).await,
        };

        interaction
            .create_interaction_response(&ctx.http, |response| build_response(response, reply, true))
            .await?;
        debug!("[{request_id}] ✅ Component response sent");
        Ok(())
    }

    /// Handle a modal form submission
    pub async fn handle_modal_submit(&self, ctx: &Context, interaction: &ModalSubmitInteraction) -> Result<()> {
        let request_id = Uuid::new_v4();
        let custom_id = interaction.data.custom_id.as_str();
        let user_id = interaction.user.id.0;
        info!("[{request_id}] 📥 Modal submit | Id: {custom_id} | User: {user_id}");

        // A form opened from a message button edits that message
        let from_message = interaction.message.is_some();
        if let Some(notice) = self.rate_limit_notice(request_id, user_id) {
            interaction
                .create_interaction_response(&ctx.http, |response| build_response(response, notice, from_message))
                .await?;
            return Ok(());
        }

        // Submissions often check input against an external service
        interaction
            .create_interaction_response(&ctx.http, |response| build_deferred(response, from_message))
            .await?;

        let values = form_values(&interaction.data.components);
        match self.dispatch_form(request_id, user_id, custom_id, &values).await {
            Reply::Update(screen) => {
                interaction
                    .edit_original_interaction_response(&ctx.http, |edit| edit_with_screen(edit, &screen))
                    .await?;
            }
            Reply::Notice(text) if from_message => {
                interaction
                    .create_followup_message(&ctx.http, |message| {
                        message.content(truncate_for_message(&text)).ephemeral(true)
                    })
                    .await?;
            }
            // The deferred placeholder is already private
            Reply::Notice(text) => {
                interaction
                    .edit_original_interaction_response(&ctx.http, |edit| {
                        edit.content(truncate_for_message(&text))
                            .set_components(CreateComponents::default())
                    })
                    .await?;
            }
            Reply::Form(_) | Reply::Ack => {}
        }
        debug!("[{request_id}] ✅ Modal response sent");
        Ok(())
    }

    fn rate_limit_notice(&self, request_id: Uuid, user_id: u64) -> Option<Reply> {
        if self.ctx.rate_limiter.check(user_id) {
            return None;
        }
        let wait = self.ctx.rate_limiter.retry_after(user_id).as_secs().max(1);
        warn!("[{request_id}] 🚫 Rate limit exceeded for user: {user_id}");
        Some(Reply::Notice(format!(
            "⏳ You're clicking too fast! Try again in {wait} s."
        )))
    }

    /// Whether a button is answered only after deferring
    fn defers_button(&self, custom_id: &str) -> bool {
        self.handlers
            .route(custom_id)
            .is_some_and(|(handler, action)| handler.reaches_network(action))
    }

    async fn dispatch_button(&self, request_id: Uuid, user_id: u64, custom_id: &str) -> Reply {
        let Some((handler, action)) = self.handlers.route(custom_id) else {
            warn!("[{request_id}] No handler for component '{custom_id}'");
            return Reply::Notice("This button is no longer supported.".to_string());
        };

        match handler.handle_button(&self.ctx, user_id, action).await {
            Ok(Reply::Form(_)) if handler.reaches_network(action) => {
                error!("[{request_id}] ❌ Deferred component '{custom_id}' answered with a form");
                Reply::failure(SERVICE_FAILURE)
            }
            Ok(reply) => reply,
            Err(e) => {
                error!("[{request_id}] ❌ Component '{custom_id}' failed for user {user_id}: {e:#}");
                Reply::failure(SERVICE_FAILURE)
            }
        }
    }

    async fn dispatch_form(&self, request_id: Uuid, user_id: u64, custom_id: &str, values: &FormValues) -> Reply {
        let Some((handler, action)) = self.handlers.route(custom_id) else {
            warn!("[{request_id}] No handler for modal '{custom_id}'");
            return Reply::Notice("This form is no longer supported.".to_string());
        };

        match handler.handle_form(&self.ctx, user_id, action, values).await {
            // Discord does not allow answering a modal with another modal
            Ok(Reply::Form(_)) => Reply::Notice("Please press the button again to open the form.".to_string()),
            Ok(reply) => reply,
            Err(e) => {
                error!("[{request_id}] ❌ Modal '{custom_id}' failed for user {user_id}: {e:#}");
                Reply::failure(SERVICE_FAILURE)
            }
        }
    }
}

/// Collect submitted text inputs keyed by their custom id
fn form_values(rows: &[ActionRow]) -> FormValues {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((input.custom_id.clone(), input.value.clone())),
            _ => None,
        })
        .collect()
}

fn response_kind(reply: &Reply, from_message: bool) -> InteractionResponseType {
    match reply {
        Reply::Update(_) if from_message => InteractionResponseType::UpdateMessage,
        Reply::Update(_) | Reply::Notice(_) => InteractionResponseType::ChannelMessageWithSource,
        Reply::Form(_) => InteractionResponseType::Modal,
        Reply::Ack => InteractionResponseType::DeferredUpdateMessage,
    }
}

/// Fill an interaction response from a reply
fn build_response<'a, 'b>(
    response: &'b mut CreateInteractionResponse<'a>,
    reply: Reply,
    from_message: bool,
) -> &'b mut CreateInteractionResponse<'a> {
    response.kind(response_kind(&reply, from_message));
    match reply {
        Reply::Update(screen) => response.interaction_response_data(|message| {
            message
                .content(truncate_for_message(&screen.text))
                .set_components(screen.keyboard.to_components())
        }),
        Reply::Form(form) => response.interaction_response_data(|modal| {
            modal
                .custom_id(&form.custom_id)
                .title(&form.title)
                .set_components(form.to_components())
        }),
        Reply::Notice(text) => response.interaction_response_data(|message| {
            message.content(truncate_for_message(&text)).ephemeral(true)
        }),
        Reply::Ack => response,
    }
}

fn deferred_kind(from_message: bool) -> InteractionResponseType {
    if from_message {
        InteractionResponseType::DeferredUpdateMessage
    } else {
        InteractionResponseType::DeferredChannelMessageWithSource
    }
}

/// Acknowledge now and edit the response once the handler is done
fn build_deferred<'a, 'b>(
    response: &'b mut CreateInteractionResponse<'a>,
    from_message: bool,
) -> &'b mut CreateInteractionResponse<'a> {
    response.kind(deferred_kind(from_message));
    if !from_message {
        response.interaction_response_data(|message| message.ephemeral(true));
    }
    response
}

fn edit_with_screen<'a>(edit: &'a mut EditInteractionResponse, screen: &Screen) -> &'a mut EditInteractionResponse {
    edit.content(truncate_for_message(&screen.text))
        .set_components(screen.keyboard.to_components())
}

//! Entry commands and the main menu
//!
//! Handles: start, help, menu
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Menus opened in a guild channel are visible only to the caller
//! - 1.1.0: `/help` lists feature versions
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::builder::CreateInteractionResponse;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{InteractionHandler, SlashCommandHandler};
use crate::commands::reply::Reply;
use crate::core::{escape_markdown, truncate_for_message, Button, Keyboard, Screen};
use crate::features::{get_bot_version, get_features};

pub struct StartHandler;

pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::adjusted(
        vec![
            Button::new("📋 Tasks", "task:list:0"),
            Button::new("🎂 Birthdays", "bd:list:0"),
            Button::new("🌤 Weather", "weather:current"),
            Button::new("💱 Currency", "currency:rates"),
            Button::new("📍 Places nearby", "places:open"),
            Button::new("⚙️ Settings", "settings:open"),
        ],
        &[2],
    )
}

pub fn main_menu_screen() -> Screen {
    Screen::new("🏠 **Main menu**\n\nChoose a section:", main_menu_keyboard())
}

pub fn welcome_screen(display_name: &str) -> Screen {
    Screen::new(
        format!(
            "👋 Hi, **{}**!\n\n\
             I'm your personal assistant. I can help you:\n\n\
             📋 Manage tasks and reminders\n\
             🎂 Keep track of birthdays\n\
             🌤 Check the weather\n\
             💱 Convert currencies\n\
             📍 Find places nearby\n\n\
             Pick a section below:",
            escape_markdown(display_name)
        ),
        main_menu_keyboard(),
    )
}

pub fn help_screen() -> Screen {
    let mut text = format!(
        "📖 **How to use the assistant** (v{})\n\n\
         **Commands**\n\
         `/start` · start the bot\n\
         `/help` · show this message\n\
         `/menu` · open the main menu\n\n\
         **📋 Tasks** · tasks with a due time, reminders, postpone or complete\n\
         **🎂 Birthdays** · birthdays with automatic reminders\n\
         **🌤 Weather** · current weather and a 5-day forecast\n\
         **💱 Currency** · today's rates and conversion\n\
         **📍 Places** · nearest pharmacies, vet clinics and grocery shops\n\
         **⚙️ Settings** · your city and timezone\n\n\
         **Features**\n",
        get_bot_version()
    );
    for feature in get_features() {
        text.push_str(&format!("• {} v{}\n", feature.name, feature.version));
    }
    Screen::new(text.trim_end(), main_menu_keyboard())
}

/// Fill the slash command response with a screen
///
/// Buttons on the menu open the caller's own data, so in a guild channel the
/// message is ephemeral and nobody else can see or click it.
fn build_menu_response<'a, 'b>(
    response: &'b mut CreateInteractionResponse<'a>,
    screen: &Screen,
    in_guild: bool,
) -> &'b mut CreateInteractionResponse<'a> {
    response
        .kind(InteractionResponseType::ChannelMessageWithSource)
        .interaction_response_data(|message| {
            message
                .content(truncate_for_message(&screen.text))
                .set_components(screen.keyboard.to_components())
                .ephemeral(in_guild)
        })
}

#[async_trait]
impl SlashCommandHandler for StartHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "help", "menu"]
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let screen = match command.data.name.as_str() {
            "start" => {
                info!("User {} started the bot", command.user.id);
                welcome_screen(&command.user.name)
            }
            "help" => help_screen(),
            _ => main_menu_screen(),
        };

        let in_guild = command.guild_id.is_some();
        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                build_menu_response(response, &screen, in_guild)
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl InteractionHandler for StartHandler {
    fn prefix(&self) -> &'static str {
        "menu"
    }

    async fn handle_button(&self, _ctx: &CommandContext, _user_id: u64, action: &str) -> Result<Reply> {
        Ok(match action {
            "help" => Reply::Update(help_screen()),
            _ => Reply::Update(main_menu_screen()),
        })
    }
}

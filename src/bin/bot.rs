use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use assistant::commands::{register_global_commands, register_guild_commands, CommandContext};
use assistant::core::Config;
use assistant::database::Database;
use assistant::features::{ReminderScheduler, SchedulerSettings, ServiceSummary};
use assistant::message_components::MessageComponentHandler;

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

struct Handler {
    dispatcher: Arc<MessageComponentHandler>,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id).await,
            None => register_global_commands(&ctx).await,
        };
        if let Err(e) = registered {
            error!("Failed to register slash commands: {e}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                if let Err(e) = self.dispatcher.handle_slash_command(&ctx, &command).await {
                    error!("Error handling slash command '{}': {}", command.data.name, e);

                    let _ = command
                        .create_interaction_response(&ctx.http, |response| {
                            response
                                .kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|message| {
                                    message
                                        .content("❌ Sorry, I encountered an error processing your command. Please try again.")
                                        .ephemeral(true)
                                })
                        })
                        .await;
                }
            }
            Interaction::MessageComponent(component) => {
                if let Err(e) = self
                    .dispatcher
                    .handle_component_interaction(&ctx, &component)
                    .await
                {
                    error!(
                        "Error handling component interaction '{}': {}",
                        component.data.custom_id, e
                    );
                }
            }
            Interaction::ModalSubmit(modal) => {
                if let Err(e) = self.dispatcher.handle_modal_submit(&ctx, &modal).await {
                    error!("Error handling modal submit '{}': {}", modal.data.custom_id, e);
                }
            }
            Interaction::Ping(_) => {
                info!("Ping interaction received - Discord health check");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting assistant bot v{}...", env!("CARGO_PKG_VERSION"));

    let database = Database::new(&config.database_path).await?;
    let context = Arc::new(CommandContext::from_config(&config, database.clone())?);
    let dispatcher = Arc::new(MessageComponentHandler::new(Arc::clone(&context)));

    let handler = Handler {
        dispatcher,
        guild_id: config.discord_guild_id.map(GuildId),
    };

    // Slash commands and buttons work in DMs; reminders are sent there too
    let intents = GatewayIntents::GUILDS | GatewayIntents::DIRECT_MESSAGES;

    let mut client = Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    // Start the reminder scheduler
    let summary = ServiceSummary::new(
        Arc::clone(&context.weather),
        Arc::clone(&context.currency),
        config.default_city.clone(),
    );
    let scheduler = ReminderScheduler::new(
        database,
        SchedulerSettings::from_config(&config),
        Arc::new(summary),
    );
    let http = client.cache_and_http.http.clone();
    tokio::spawn(async move {
        scheduler.run(http).await;
    });

    // Forget idle users in the rate limiter
    let prune_context = Arc::clone(&context);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            prune_context.rate_limiter.prune();
        }
    });

    info!("Gateway intents: {intents:?}");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}

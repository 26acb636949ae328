//! Bot layer - Discord-specific interface and command handlers
//!
//! Commands talk to storage only through the [`RecordStore`] facade, which
//! never fails: every reply can be sent even when storage is unavailable.

/// Discord command implementations (vouch, ticket, stats, general)
pub mod commands;

use crate::{
    config::BotConfig,
    errors::{Error, Result},
    store::RecordStore,
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Record store selected at startup
    pub store: Arc<RecordStore>,
    /// The `[bot]` configuration table
    pub config: BotConfig,
}

impl BotData {
    /// Creates a new `BotData` instance for the given store and settings.
    #[must_use]
    pub const fn new(store: Arc<RecordStore>, config: BotConfig) -> Self {
        Self { store, config }
    }

    /// Channel receiving vouch embeds, if one is configured.
    #[must_use]
    pub fn vouch_channel(&self) -> Option<serenity::ChannelId> {
        self.config
            .vouch_channel_id
            .filter(|&id| id != 0)
            .map(serenity::ChannelId::new)
    }
}

/// Poise context used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(command = %ctx.command().name, "Command failed: {error:?}");
            let reply = poise::CreateReply::default()
                .content("❌ An error occurred.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Connects to Discord and serves commands until the gateway connection ends.
#[instrument(skip_all)]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let guild_id = data
        .config
        .guild_id
        .filter(|&id| id != 0)
        .map(serenity::GuildId::new);
    let presence = data.config.presence.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.tag());
                ctx.set_presence(
                    Some(serenity::ActivityData::watching(presence)),
                    serenity::OnlineStatus::Idle,
                );

                let commands = &framework.options().commands;
                if let Some(guild_id) = guild_id {
                    info!(%guild_id, "Registering commands in guild");
                    poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                } else {
                    info!("Registering commands globally");
                    poise::builtins::register_globally(ctx, commands).await?;
                }
                info!(count = commands.len(), "Slash commands registered");

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;

    Ok(())
}

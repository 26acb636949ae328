use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vouch_keeper::{
    bot::{self, BotData},
    config,
    errors::{Error, Result},
    store::RecordStore,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Open the record store; unreachable storage is fatal
    let store = RecordStore::open(&app_config.storage)
        .await
        .inspect_err(|e| error!("Failed to open record store: {e}"))?;

    // 5. Make sure the stats record exists before serving commands
    match store.init_aggregate().await {
        Some(stats) => info!(
            tickets = stats.total_tickets,
            vouches = stats.total_vouches,
            "Stats record ready"
        ),
        None => warn!("Stats record could not be initialized; it will be created on first use"),
    }

    // 6. Run the bot. The token is read directly before use, never stored in config
    let token = env::var("DISCORD_TOKEN")
        .inspect_err(|e| error!("DISCORD_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, BotData::new(Arc::new(store), app_config.bot)).await
}

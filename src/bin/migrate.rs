//! Copies the flat-file snapshot into the database.
//!
//! Usage: `migrate [--reconcile] [snapshot.json]`. Without a path the snapshot
//! is read from the configured `data_file`. Existing database rows are
//! replaced. With `--reconcile` the stats row is recounted from the migrated
//! records instead of keeping the snapshot's values.

use dotenvy::dotenv;
use std::{env, ffi::OsString, path::PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vouch_keeper::{
    config::{self, database},
    core::stats::reconcile_stats,
    errors::{Error, Result},
    migration::migrate_snapshot,
    models::Snapshot,
    store::{FileStore, RecordBackend},
};

#[derive(Debug, Default)]
struct Args {
    reconcile: bool,
    snapshot: Option<PathBuf>,
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = OsString>,
{
    let mut parsed = Args::default();
    for arg in args {
        if arg == "--reconcile" {
            parsed.reconcile = true;
        } else if parsed.snapshot.is_none() && !arg.to_string_lossy().starts_with("--") {
            parsed.snapshot = Some(PathBuf::from(arg));
        } else {
            return Err(Error::Config {
                message: format!(
                    "Unexpected argument '{}'. Usage: migrate [--reconcile] [snapshot.json]",
                    arg.to_string_lossy()
                ),
            });
        }
    }
    Ok(parsed)
}

/// Reads the snapshot through the flat-file backend. Unlike the bot, a
/// missing file is an error here: migrating nothing would only wipe the
/// database.
async fn read_snapshot(path: PathBuf) -> Result<Snapshot> {
    if !tokio::fs::try_exists(&path).await? {
        return Err(Error::Config {
            message: format!("Snapshot {} does not exist", path.display()),
        });
    }
    FileStore::open(path).await?.read_snapshot().await
}

async fn run() -> Result<()> {
    dotenv().ok();
    let app_config = config::load_app_config()?;

    let args = parse_args(env::args_os().skip(1))?;
    let path = args
        .snapshot
        .unwrap_or_else(|| app_config.storage.data_file.clone());
    info!(path = %path.display(), "Reading snapshot");
    let snapshot = read_snapshot(path).await?;

    info!("Connecting to database...");
    let db = database::create_connection(&app_config.storage.database_url).await?;
    database::create_tables(&db).await?;
    info!("Connected");

    warn!("Existing tickets, vouches, verifications and stats will be replaced");
    let report = migrate_snapshot(&db, &snapshot).await?;

    info!("Migration completed");
    info!(
        tickets = report.tickets,
        vouches = report.vouches,
        verifications = report.verifications_inserted,
        skipped = report.skipped_verifications.len(),
        "Summary"
    );
    if !report.skipped_verifications.is_empty() {
        warn!(user_ids = ?report.skipped_verifications, "Duplicate verifications were skipped");
    }
    if args.reconcile {
        let stats = reconcile_stats(&db).await?;
        info!(?stats, "Stats recounted from the migrated records");
    } else if !report.stats_match_records {
        warn!(
            "Stats were copied as-is but do not match the migrated records; \
             rerun with --reconcile or use /reconcile-stats"
        );
    }

    db.close().await?;
    info!("Connection closed");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run()
        .await
        .inspect_err(|e| error!("Migration failed: {e}"))
}

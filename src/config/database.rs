//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables and indexes are generated from the entity definitions with
//! `IF NOT EXISTS`, so calling [`create_tables`] on every startup is safe and the
//! schema always matches the Rust structs without hand-written SQL.

use crate::entities::{StatsEntity, Ticket, Verification, Vouch};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default location of the `SQLite` database when nothing is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/vouches.sqlite?mode=rwc";

/// Directory holding a file-backed `SQLite` database, if the URL names one.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to the database at `database_url`.
///
/// Callers treat a failure here as fatal: the process cannot serve any
/// interaction without its store.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        tokio::fs::create_dir_all(dir).await?;
    }
    debug!("Connecting to database");
    let db = Database::connect(database_url).await?;
    info!("Database connection established");
    Ok(db)
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

/// Creates the tickets, vouches, verifications and stats tables (and their
/// indexes) if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, Ticket).await?;
    create_table_for(db, &schema, Vouch).await?;
    create_table_for(db, &schema, Verification).await?;
    create_table_for(db, &schema, StatsEntity).await?;

    debug!("Record tables ensured");
    Ok(())
}

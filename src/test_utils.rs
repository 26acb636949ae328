//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and building test records with sensible defaults.

use crate::{
    core::{ticket, vouch},
    errors::Result,
    models::{Ticket, TicketDetails, Vouch},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an open ticket owned by `u1` / `alice`.
pub async fn create_open_ticket(
    db: &DatabaseConnection,
    id: i64,
    channel_id: &str,
) -> Result<Ticket> {
    ticket::create_ticket(db, &Ticket::open(id, channel_id, "u1", "alice", "purchase")).await
}

/// Builds a vouch from `u2` / `bob` for `to_user_id`.
///
/// # Defaults
/// * `comment`: `"Bought Boost Tool, all worked flawlessly"`
/// * `image_url`: None
/// * `created_at`: now
pub fn test_vouch(id: i64, to_user_id: &str, stars: i32) -> Vouch {
    Vouch {
        id,
        from_user_id: "u2".to_string(),
        from_username: "bob".to_string(),
        to_user_id: to_user_id.to_string(),
        to_username: format!("user-{to_user_id}"),
        stars,
        comment: "Bought Boost Tool, all worked flawlessly".to_string(),
        image_url: None,
        created_at: Utc::now(),
    }
}

/// Stores a [`test_vouch`] through the core layer.
pub async fn create_test_vouch(
    db: &DatabaseConnection,
    id: i64,
    to_user_id: &str,
    stars: i32,
) -> Result<Vouch> {
    vouch::create_vouch(db, &test_vouch(id, to_user_id, stars)).await
}

/// The fully populated details used by round-trip tests.
pub fn gold_details() -> TicketDetails {
    TicketDetails {
        package: Some("gold".to_string()),
        price: Some("10".to_string()),
        quantity: Some(1),
        duration: Some("1mo".to_string()),
        bot_type: Some("x".to_string()),
        description: Some("d".to_string()),
    }
}

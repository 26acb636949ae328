//! `SeaORM` backend. Each operation delegates to the `core` modules, which run
//! record writes and stats deltas in one transaction.

use crate::{
    config::database::{create_connection, create_tables},
    core::{CloseOutcome, VerificationOutcome, stats, ticket, verification, vouch},
    errors::Result,
    models::{Snapshot, Stats, Ticket, TicketDetails, Verification, Vouch},
    store::RecordBackend,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::instrument;

/// Record store over database tables.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    /// Wraps an existing connection whose tables are already created.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects to `database_url` and ensures the record tables exist.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = create_connection(database_url).await?;
        create_tables(&db).await?;
        Ok(Self::new(db))
    }
}

#[async_trait]
impl RecordBackend for DatabaseStore {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn init_aggregate(&self) -> Result<Stats> {
        stats::get_stats(&self.db).await
    }

    async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        ticket::create_ticket(&self.db, ticket).await
    }

    async fn update_ticket_details(
        &self,
        ticket_id: i64,
        details: Option<TicketDetails>,
    ) -> Result<Option<Ticket>> {
        ticket::update_ticket_details(&self.db, ticket_id, details).await
    }

    async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>> {
        ticket::get_ticket_by_id(&self.db, ticket_id).await
    }

    async fn get_ticket_by_channel_id(&self, channel_id: &str) -> Result<Option<Ticket>> {
        ticket::get_ticket_by_channel_id(&self.db, channel_id).await
    }

    async fn close_ticket(&self, ticket_id: i64) -> Result<CloseOutcome> {
        ticket::close_ticket(&self.db, ticket_id).await
    }

    async fn create_vouch(&self, vouch: &Vouch) -> Result<Vouch> {
        vouch::create_vouch(&self.db, vouch).await
    }

    async fn create_verification(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<VerificationOutcome> {
        verification::create_verification(&self.db, user_id, username).await
    }

    async fn get_verification(&self, user_id: &str) -> Result<Option<Verification>> {
        verification::get_verification(&self.db, user_id).await
    }

    async fn get_stats(&self) -> Result<Stats> {
        stats::get_stats(&self.db).await
    }

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        ticket::list_all_tickets(&self.db).await
    }

    async fn list_active_tickets(&self) -> Result<Vec<Ticket>> {
        ticket::list_active_tickets(&self.db).await
    }

    async fn list_all_vouches(&self) -> Result<Vec<Vouch>> {
        vouch::list_all_vouches(&self.db).await
    }

    async fn list_vouches_for_user(&self, user_id: &str) -> Result<Vec<Vouch>> {
        vouch::list_vouches_for_user(&self.db, user_id).await
    }

    async fn count_vouches_for_user(&self, user_id: &str) -> Result<u64> {
        vouch::count_vouches_for_user(&self.db, user_id).await
    }

    async fn reconcile_stats(&self) -> Result<Stats> {
        stats::reconcile_stats(&self.db).await
    }

    async fn read_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            tickets: ticket::list_all_tickets(&self.db).await?,
            vouches: vouch::list_all_vouches(&self.db).await?,
            verifications: verification::list_verifications(&self.db).await?,
            stats: stats::get_stats(&self.db).await?,
        })
    }
}

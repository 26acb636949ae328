//! Record Store - the persistence contract the bot layer talks to.
//!
//! Two backends implement [`RecordBackend`]: [`DatabaseStore`] (`SeaORM`
//! tables) and [`FileStore`] (one JSON document). Backends are fallible and
//! propagate errors with `?`. [`RecordStore`] wraps the backend chosen at
//! startup and converts every failure into a sentinel (`false`, `None`, an
//! empty list or zero) after reporting it through `tracing`, so an interaction
//! can always finish its reply.

mod database;
mod file;

pub use database::DatabaseStore;
pub use file::FileStore;

use crate::{
    config::{StorageConfig, StoreBackend},
    core::{CloseOutcome, VerificationOutcome},
    errors::{Error, Result},
    models::{Snapshot, Stats, Ticket, TicketDetails, Verification, Vouch},
};
use async_trait::async_trait;
use tracing::{error, info, warn};

/// Fallible storage operations shared by every backend.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Ensures the stats aggregate exists, creating it zeroed if absent.
    async fn init_aggregate(&self) -> Result<Stats>;

    async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket>;

    /// `Ok(None)` when no ticket has that id.
    async fn update_ticket_details(
        &self,
        ticket_id: i64,
        details: Option<TicketDetails>,
    ) -> Result<Option<Ticket>>;

    async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>>;

    async fn get_ticket_by_channel_id(&self, channel_id: &str) -> Result<Option<Ticket>>;

    async fn close_ticket(&self, ticket_id: i64) -> Result<CloseOutcome>;

    async fn create_vouch(&self, vouch: &Vouch) -> Result<Vouch>;

    async fn create_verification(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<VerificationOutcome>;

    async fn get_verification(&self, user_id: &str) -> Result<Option<Verification>>;

    async fn get_stats(&self) -> Result<Stats>;

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>>;

    async fn list_active_tickets(&self) -> Result<Vec<Ticket>>;

    async fn list_all_vouches(&self) -> Result<Vec<Vouch>>;

    async fn list_vouches_for_user(&self, user_id: &str) -> Result<Vec<Vouch>>;

    async fn count_vouches_for_user(&self, user_id: &str) -> Result<u64>;

    /// Recomputes every counter from the record collections.
    async fn reconcile_stats(&self) -> Result<Stats>;

    /// Exports the whole store in the flat-file layout; the migration source.
    async fn read_snapshot(&self) -> Result<Snapshot>;
}

/// Logs a failed operation and turns the result into an `Option`.
///
/// Rejected input (duplicates, invalid records) is a warning; anything else is
/// an error.
fn settle<T>(operation: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err)
            if err.is_constraint_violation()
                || matches!(err, Error::InvalidRating { .. } | Error::InvalidRecord { .. }) =>
        {
            warn!(operation, error = %err, "Record store rejected the request");
            None
        }
        Err(err) => {
            error!(operation, error = %err, "Record store operation failed");
            None
        }
    }
}

/// Lenient facade over the configured backend. Never returns an error.
pub struct RecordStore {
    backend: Box<dyn RecordBackend>,
}

impl RecordStore {
    pub fn new<B>(backend: B) -> Self
    where
        B: RecordBackend + 'static,
    {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Opens the backend named in `config`.
    ///
    /// Unlike the record operations this does return an error: a store that
    /// cannot be reached at startup is fatal for the process.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let store = match config.backend {
            StoreBackend::Database => Self::new(DatabaseStore::connect(&config.database_url).await?),
            StoreBackend::File => Self::new(FileStore::open(&config.data_file).await?),
        };
        info!(backend = store.backend_name(), "Record store opened");
        Ok(store)
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Ensures exactly one stats record exists. `None` if storage failed.
    pub async fn init_aggregate(&self) -> Option<Stats> {
        settle("init_aggregate", self.backend.init_aggregate().await)
    }

    /// `false` on a duplicate id, an invalid record or a storage failure.
    pub async fn create_ticket(&self, ticket: &Ticket) -> bool {
        settle("create_ticket", self.backend.create_ticket(ticket).await).is_some()
    }

    /// `true` even when no ticket matches; `false` only on storage failure.
    pub async fn update_ticket_details(
        &self,
        ticket_id: i64,
        details: Option<TicketDetails>,
    ) -> bool {
        settle(
            "update_ticket_details",
            self.backend.update_ticket_details(ticket_id, details).await,
        )
        .is_some()
    }

    pub async fn get_ticket_by_id(&self, ticket_id: i64) -> Option<Ticket> {
        settle("get_ticket_by_id", self.backend.get_ticket_by_id(ticket_id).await).flatten()
    }

    pub async fn get_ticket_by_channel_id(&self, channel_id: &str) -> Option<Ticket> {
        settle(
            "get_ticket_by_channel_id",
            self.backend.get_ticket_by_channel_id(channel_id).await,
        )
        .flatten()
    }

    /// `true` unless storage failed. Closing an already-closed or missing
    /// ticket succeeds without touching the aggregate.
    pub async fn close_ticket(&self, ticket_id: i64) -> bool {
        match settle("close_ticket", self.backend.close_ticket(ticket_id).await) {
            Some(CloseOutcome::Closed) => true,
            Some(outcome) => {
                info!(ticket_id, ?outcome, "close_ticket left the aggregate unchanged");
                true
            }
            None => false,
        }
    }

    /// `false` on an invalid rating, a duplicate id or a storage failure.
    pub async fn create_vouch(&self, vouch: &Vouch) -> bool {
        settle("create_vouch", self.backend.create_vouch(vouch).await).is_some()
    }

    /// `false` when the user is already verified; the aggregate is unchanged.
    pub async fn create_verification(&self, user_id: &str, username: &str) -> bool {
        match settle(
            "create_verification",
            self.backend.create_verification(user_id, username).await,
        ) {
            Some(VerificationOutcome::Created(_)) => true,
            Some(VerificationOutcome::AlreadyVerified) => {
                warn!(user_id, "Duplicate verification skipped");
                false
            }
            None => false,
        }
    }

    pub async fn get_verification(&self, user_id: &str) -> Option<Verification> {
        settle("get_verification", self.backend.get_verification(user_id).await).flatten()
    }

    pub async fn get_stats(&self) -> Option<Stats> {
        settle("get_stats", self.backend.get_stats().await)
    }

    pub async fn list_all_tickets(&self) -> Vec<Ticket> {
        settle("list_all_tickets", self.backend.list_all_tickets().await).unwrap_or_default()
    }

    pub async fn list_active_tickets(&self) -> Vec<Ticket> {
        settle("list_active_tickets", self.backend.list_active_tickets().await)
            .unwrap_or_default()
    }

    pub async fn list_all_vouches(&self) -> Vec<Vouch> {
        settle("list_all_vouches", self.backend.list_all_vouches().await).unwrap_or_default()
    }

    pub async fn list_vouches_for_user(&self, user_id: &str) -> Vec<Vouch> {
        settle(
            "list_vouches_for_user",
            self.backend.list_vouches_for_user(user_id).await,
        )
        .unwrap_or_default()
    }

    pub async fn count_vouches_for_user(&self, user_id: &str) -> u64 {
        settle(
            "count_vouches_for_user",
            self.backend.count_vouches_for_user(user_id).await,
        )
        .unwrap_or(0)
    }

    pub async fn reconcile_stats(&self) -> Option<Stats> {
        settle("reconcile_stats", self.backend.reconcile_stats().await)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{gold_details, init_test_tracing, setup_test_db, test_vouch};
    use chrono::{Duration, Utc};

    async fn stores() -> Result<(Vec<RecordStore>, tempfile::TempDir)> {
        init_test_tracing();
        let dir = tempfile::tempdir()?;
        let database = DatabaseStore::new(setup_test_db().await?);
        let file = FileStore::open(dir.path().join("database.json")).await?;
        Ok((vec![RecordStore::new(database), RecordStore::new(file)], dir))
    }

    fn assert_ticket_invariant(stats: &Stats) {
        assert_eq!(
            stats.total_tickets,
            stats.active_tickets + stats.closed_tickets
        );
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() -> Result<()> {
        let (stores, _dir) = stores().await?;
        for store in &stores {
            let name = store.backend_name();
            assert!(store.init_aggregate().await.is_some(), "{name}");

            assert!(store.create_ticket(&Ticket::open(1, "c1", "u9", "carol", "purchase")).await);
            let stats = store.get_stats().await.unwrap();
            assert_eq!(
                (stats.total_tickets, stats.active_tickets, stats.closed_tickets),
                (1, 1, 0),
                "{name}"
            );

            assert!(store.close_ticket(1).await);
            let stats = store.get_stats().await.unwrap();
            assert_eq!((stats.active_tickets, stats.closed_tickets), (0, 1), "{name}");
            assert_ticket_invariant(&stats);

            assert!(store.create_vouch(&test_vouch(100, "u1", 5)).await);
            assert_eq!(store.get_stats().await.unwrap().total_vouches, 1, "{name}");

            assert!(store.create_verification("u1", "alice").await);
            assert!(!store.create_verification("u1", "alice").await);
            let stats = store.get_stats().await.unwrap();
            assert_eq!(stats.verified_users, 1, "{name}");

            let verified = store.get_verification("u1").await.unwrap();
            assert_eq!(verified.username, "alice", "{name}");
            assert!(store.get_verification("u2").await.is_none(), "{name}");
            assert_eq!(store.list_all_tickets().await.len(), 1, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_double_close_does_not_move_aggregate() -> Result<()> {
        let (stores, _dir) = stores().await?;
        for store in &stores {
            let name = store.backend_name();
            assert!(store.create_ticket(&Ticket::open(1, "c1", "u1", "alice", "support")).await);
            assert!(store.create_ticket(&Ticket::open(2, "c2", "u1", "alice", "support")).await);

            assert!(store.close_ticket(1).await);
            assert!(store.close_ticket(1).await);
            assert!(store.close_ticket(42).await);

            let stats = store.get_stats().await.unwrap();
            assert_eq!(stats.total_tickets, 2, "{name}");
            assert_eq!(stats.active_tickets, 1, "{name}");
            assert_eq!(stats.closed_tickets, 1, "{name}");
            assert_ticket_invariant(&stats);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_rejections_return_false() -> Result<()> {
        let (stores, _dir) = stores().await?;
        for store in &stores {
            let name = store.backend_name();
            assert!(store.create_ticket(&Ticket::open(1, "c1", "u1", "alice", "support")).await);
            assert!(!store.create_ticket(&Ticket::open(1, "c9", "u2", "bob", "support")).await, "{name}");
            assert!(!store.create_vouch(&test_vouch(5, "u1", 6)).await, "{name}");

            let stats = store.get_stats().await.unwrap();
            assert_eq!(stats.total_tickets, 1, "{name}");
            assert_eq!(stats.total_vouches, 0, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_details_round_trip_and_listing() -> Result<()> {
        let (stores, _dir) = stores().await?;
        let now = Utc::now();
        for store in &stores {
            let name = store.backend_name();
            for (id, minutes_ago) in [(1, 3), (2, 1), (3, 2)] {
                let mut ticket = Ticket::open(id, format!("c{id}"), "u1", "alice", "purchase");
                ticket.created_at = now - Duration::minutes(minutes_ago);
                assert!(store.create_ticket(&ticket).await, "{name}");
            }
            assert!(store.close_ticket(2).await);

            assert!(store.update_ticket_details(1, Some(gold_details())).await);
            assert!(store.update_ticket_details(77, Some(gold_details())).await, "{name}");
            let ticket = store.get_ticket_by_channel_id("c1").await.unwrap();
            assert_eq!(ticket.details, Some(gold_details()), "{name}");
            assert!(ticket.updated_at.is_some(), "{name}");

            let active: Vec<i64> = store.list_active_tickets().await.iter().map(|t| t.id).collect();
            assert_eq!(active, vec![3, 1], "{name}");
            let all: Vec<i64> = store.list_all_tickets().await.iter().map(|t| t.id).collect();
            assert_eq!(all, vec![2, 3, 1], "{name}");
            assert!(store.get_ticket_by_id(99).await.is_none(), "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_vouch_counts_are_durable_reads() -> Result<()> {
        let (stores, _dir) = stores().await?;
        for store in &stores {
            let name = store.backend_name();
            assert!(store.create_vouch(&test_vouch(1, "u1", 5)).await);
            assert!(store.create_vouch(&test_vouch(2, "u1", 4)).await);
            assert!(store.create_vouch(&test_vouch(3, "u2", 3)).await);

            assert_eq!(store.count_vouches_for_user("u1").await, 2, "{name}");
            assert_eq!(store.list_vouches_for_user("u2").await.len(), 1, "{name}");
            assert_eq!(store.list_all_vouches().await.len(), 3, "{name}");

            let stats = store.reconcile_stats().await.unwrap();
            assert_eq!(stats.total_vouches, 3, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_becomes_sentinel() -> Result<()> {
        init_test_tracing();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("database.json");
        let store = RecordStore::new(FileStore::open(&path).await?);
        assert!(store.create_vouch(&test_vouch(1, "u1", 5)).await);

        tokio::fs::write(&path, "{ this is not json").await?;

        assert!(!store.create_ticket(&Ticket::open(1, "c1", "u1", "alice", "support")).await);
        assert!(!store.create_vouch(&test_vouch(2, "u1", 5)).await);
        assert!(!store.create_verification("u1", "alice").await);
        assert!(!store.close_ticket(1).await);
        assert!(store.init_aggregate().await.is_none());
        assert!(store.get_stats().await.is_none());
        assert!(store.get_ticket_by_id(1).await.is_none());
        assert!(store.list_all_tickets().await.is_empty());
        assert!(store.list_all_vouches().await.is_empty());
        assert_eq!(store.count_vouches_for_user("u1").await, 0);
        assert!(store.reconcile_stats().await.is_none());

        // A failed write never replaced the corrupt document
        assert_eq!(tokio::fs::read_to_string(&path).await?, "{ this is not json");
        Ok(())
    }
}

//! Snapshot migration - Copies a flat-file snapshot into the database tables.
//!
//! **Destructive.** The four record tables are emptied before loading, so
//! running the migration twice replaces the first run's data instead of
//! merging with it. The wipe and the load share one database transaction:
//! if anything fails, the rollback leaves the previous contents in place.
//!
//! Tickets and vouches are inserted verbatim with their original identifiers;
//! any failure there aborts the run. Verifications are inserted one by one and
//! a user id that is already present is skipped rather than aborting. The
//! snapshot's stats block becomes the singleton stats row, with a fresh
//! `updated_at`.

use crate::{
    core::stats::recount_snapshot,
    entities::{
        StatsEntity, Ticket as TicketEntity, Verification as VerificationEntity,
        Vouch as VouchEntity, stats, ticket, verification, vouch,
    },
    errors::{Error, Result},
    models::{Snapshot, Stats, Verification},
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Result of inserting one record whose key may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written
    Inserted,
    /// A record with the same key was already present; nothing was written
    SkippedDuplicate,
}

/// Summary of a completed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub tickets: usize,
    pub vouches: usize,
    pub verifications_inserted: usize,
    /// User ids whose verification was skipped as a duplicate
    pub skipped_verifications: Vec<String>,
    /// The stats row as written
    pub stats: Stats,
    /// Whether the snapshot's stats block matched its own records
    pub stats_match_records: bool,
}

async fn wipe(txn: &DatabaseTransaction) -> Result<()> {
    TicketEntity::delete_many().exec(txn).await?;
    VouchEntity::delete_many().exec(txn).await?;
    VerificationEntity::delete_many().exec(txn).await?;
    StatsEntity::delete_many().exec(txn).await?;
    Ok(())
}

/// Inserts a verification unless one exists for the same user.
///
/// Duplicates are detected by looking the key up first; a unique-key failure
/// reported by the engine is mapped to the same outcome.
pub async fn insert_verification<C>(db: &C, record: &Verification) -> Result<InsertOutcome>
where
    C: ConnectionTrait,
{
    if VerificationEntity::find_by_id(record.user_id.as_str())
        .one(db)
        .await?
        .is_some()
    {
        return Ok(InsertOutcome::SkippedDuplicate);
    }

    match verification::ActiveModel::from(record).insert(db).await {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(err) => {
            let err = Error::from(err);
            if err.is_constraint_violation() {
                Ok(InsertOutcome::SkippedDuplicate)
            } else {
                Err(err)
            }
        }
    }
}

/// Replaces the database contents with `snapshot`.
#[instrument(skip_all, fields(
    tickets = snapshot.tickets.len(),
    vouches = snapshot.vouches.len(),
    verifications = snapshot.verifications.len(),
))]
pub async fn migrate_snapshot(
    db: &DatabaseConnection,
    snapshot: &Snapshot,
) -> Result<MigrationReport> {
    let now = Utc::now();
    let expected = recount_snapshot(snapshot, now);
    let stats_match_records = snapshot.stats.same_counts(&expected);
    if !stats_match_records {
        warn!(
            snapshot = ?snapshot.stats,
            records = ?expected,
            "Snapshot stats disagree with its records; writing the snapshot values as-is"
        );
    }

    let txn = db.begin().await?;

    info!("Clearing existing collections");
    wipe(&txn).await?;

    for record in &snapshot.tickets {
        ticket::active_model_from(record)?.insert(&txn).await?;
    }
    info!(count = snapshot.tickets.len(), "Tickets migrated");

    for record in &snapshot.vouches {
        vouch::ActiveModel::from(record).insert(&txn).await?;
    }
    info!(count = snapshot.vouches.len(), "Vouches migrated");

    let mut verifications_inserted = 0;
    let mut skipped_verifications = Vec::new();
    for record in &snapshot.verifications {
        match insert_verification(&txn, record).await? {
            InsertOutcome::Inserted => verifications_inserted += 1,
            InsertOutcome::SkippedDuplicate => {
                warn!(user_id = %record.user_id, "Duplicate verification skipped");
                skipped_verifications.push(record.user_id.clone());
            }
        }
    }
    info!(count = verifications_inserted, "Verifications migrated");

    let written = Stats {
        updated_at: now,
        ..snapshot.stats.clone()
    };
    stats::ActiveModel::from(&written).insert(&txn).await?;
    info!("Stats migrated");

    txn.commit().await?;

    Ok(MigrationReport {
        tickets: snapshot.tickets.len(),
        vouches: snapshot.vouches.len(),
        verifications_inserted,
        skipped_verifications,
        stats: written,
        stats_match_records,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core;
    use crate::models::{Ticket, TicketStatus};
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    fn verification(user_id: &str) -> Verification {
        Verification {
            user_id: user_id.to_string(),
            username: format!("name-{user_id}"),
            verified_at: Utc::now(),
        }
    }

    fn sample_snapshot() -> Snapshot {
        let mut closed = Ticket::open(2, "c2", "u2", "bob", "support");
        closed.status = TicketStatus::Closed;
        closed.closed_at = Some(Utc::now());
        Snapshot {
            tickets: vec![Ticket::open(1, "c1", "u1", "alice", "purchase"), closed],
            vouches: vec![
                test_vouch(100, "u1", 5),
                test_vouch(101, "u1", 4),
                test_vouch(102, "u2", 3),
            ],
            verifications: vec![verification("u1"), verification("u2"), verification("u1")],
            stats: Stats {
                total_tickets: 2,
                active_tickets: 1,
                closed_tickets: 1,
                total_vouches: 3,
                verified_users: 2,
                updated_at: chrono::DateTime::<Utc>::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_migration_skips_duplicate_verification() -> Result<()> {
        let db = setup_test_db().await?;
        let snapshot = sample_snapshot();

        let report = migrate_snapshot(&db, &snapshot).await?;

        assert_eq!(report.tickets, 2);
        assert_eq!(report.vouches, 3);
        assert_eq!(report.verifications_inserted, 2);
        assert_eq!(report.skipped_verifications, vec!["u1".to_string()]);
        assert!(report.stats_match_records);
        assert!(report.stats.updated_at > snapshot.stats.updated_at);

        assert_eq!(TicketEntity::find().count(&db).await?, 2);
        assert_eq!(VouchEntity::find().count(&db).await?, 3);
        assert_eq!(VerificationEntity::find().count(&db).await?, 2);
        assert_eq!(StatsEntity::find().count(&db).await?, 1);

        // Identifiers survive the copy
        let ticket = core::ticket::get_ticket_by_id(&db, 2).await?.unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);

        Ok(())
    }

    #[tokio::test]
    async fn test_migration_reports_single_skip_for_one_duplicate() -> Result<()> {
        let db = setup_test_db().await?;
        let mut snapshot = sample_snapshot();
        snapshot.verifications = vec![verification("u1"), verification("u1")];

        let report = migrate_snapshot(&db, &snapshot).await?;
        assert_eq!(TicketEntity::find().count(&db).await?, 2);
        assert_eq!(VouchEntity::find().count(&db).await?, 3);
        assert_eq!(VerificationEntity::find().count(&db).await?, 1);
        assert_eq!(StatsEntity::find().count(&db).await?, 1);
        assert_eq!(report.skipped_verifications.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_migration_wipes_existing_rows() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 50, "old").await?;
        create_test_vouch(&db, 900, "u9", 2).await?;

        migrate_snapshot(&db, &sample_snapshot()).await?;

        assert!(core::ticket::get_ticket_by_id(&db, 50).await?.is_none());
        assert_eq!(core::vouch::count_vouches_for_user(&db, "u9").await?, 0);
        let stats = core::stats::get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.total_vouches, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 50, "old").await?;

        // Two tickets with the same id abort the run
        let mut snapshot = sample_snapshot();
        snapshot.tickets.push(Ticket::open(1, "dup", "u3", "dave", "purchase"));

        assert!(migrate_snapshot(&db, &snapshot).await.is_err());
        assert!(core::ticket::get_ticket_by_id(&db, 50).await?.is_some());
        assert_eq!(TicketEntity::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_mismatched_stats_are_flagged() -> Result<()> {
        let db = setup_test_db().await?;
        let mut snapshot = sample_snapshot();
        snapshot.stats.total_vouches = 10;

        let report = migrate_snapshot(&db, &snapshot).await?;
        assert!(!report.stats_match_records);
        assert_eq!(core::stats::get_stats(&db).await?.total_vouches, 10);

        Ok(())
    }
}

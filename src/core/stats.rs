//! Aggregate maintenance - Keeps the singleton stats row in step with the records.
//!
//! Every record mutation that changes a count describes its effect as a
//! [`StatsDelta`]. The database backend applies the delta with an atomic
//! `SET col = col + delta` inside the same transaction as the record write;
//! the flat-file backend applies it to the in-memory document before the
//! single wholesale write. Nothing else writes stats counters.
//!
//! [`reconcile_stats`] and [`recount_snapshot`] rebuild the counters from the
//! authoritative collections when drift is suspected.

use crate::{
    entities::{StatsEntity, Ticket as TicketEntity, Verification, Vouch, stats, ticket},
    errors::Result,
    models::{Snapshot, Stats, TicketStatus},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    PaginatorTrait, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Signed change to each counter caused by one record mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsDelta {
    pub total_tickets: i64,
    pub active_tickets: i64,
    pub closed_tickets: i64,
    pub total_vouches: i64,
    pub verified_users: i64,
}

impl StatsDelta {
    /// A new ticket in the open state
    pub const TICKET_OPENED: Self = Self {
        total_tickets: 1,
        active_tickets: 1,
        closed_tickets: 0,
        total_vouches: 0,
        verified_users: 0,
    };

    /// A new ticket that was already closed when recorded
    pub const TICKET_RECORDED_CLOSED: Self = Self {
        total_tickets: 1,
        active_tickets: 0,
        closed_tickets: 1,
        total_vouches: 0,
        verified_users: 0,
    };

    /// An open ticket moving to closed
    pub const TICKET_CLOSED: Self = Self {
        total_tickets: 0,
        active_tickets: -1,
        closed_tickets: 1,
        total_vouches: 0,
        verified_users: 0,
    };

    pub const VOUCH_ADDED: Self = Self {
        total_tickets: 0,
        active_tickets: 0,
        closed_tickets: 0,
        total_vouches: 1,
        verified_users: 0,
    };

    pub const USER_VERIFIED: Self = Self {
        total_tickets: 0,
        active_tickets: 0,
        closed_tickets: 0,
        total_vouches: 0,
        verified_users: 1,
    };

    /// Delta for inserting a ticket in the given state.
    #[must_use]
    pub const fn for_new_ticket(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Open => Self::TICKET_OPENED,
            TicketStatus::Closed => Self::TICKET_RECORDED_CLOSED,
        }
    }

    fn by_column(self) -> [(stats::Column, i64); 5] {
        [
            (stats::Column::TotalTickets, self.total_tickets),
            (stats::Column::ActiveTickets, self.active_tickets),
            (stats::Column::ClosedTickets, self.closed_tickets),
            (stats::Column::TotalVouches, self.total_vouches),
            (stats::Column::VerifiedUsers, self.verified_users),
        ]
    }

    /// Applies the delta to an in-memory aggregate and stamps `updated_at`.
    pub fn apply_to(self, stats: &mut Stats, now: DateTime<Utc>) {
        stats.total_tickets += self.total_tickets;
        stats.active_tickets += self.active_tickets;
        stats.closed_tickets += self.closed_tickets;
        stats.total_vouches += self.total_vouches;
        stats.verified_users += self.verified_users;
        stats.updated_at = now;
    }
}

fn to_counter<N>(count: N) -> i64
where
    N: TryInto<i64>,
{
    count.try_into().unwrap_or(i64::MAX)
}

/// Returns the stats row, creating a zeroed one if none exists.
///
/// Creation uses `INSERT ... ON CONFLICT DO NOTHING` on the fixed primary key,
/// so racing initializers still end up with a single row.
pub async fn ensure_stats<C>(db: &C) -> Result<stats::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = StatsEntity::find_by_id(stats::STATS_ID).one(db).await? {
        return Ok(existing);
    }

    let row = stats::ActiveModel::from(&Stats::zeroed(Utc::now()));
    let inserted = StatsEntity::insert(row)
        .on_conflict(
            OnConflict::column(stats::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        info!("Initialized stats aggregate");
    }

    StatsEntity::find_by_id(stats::STATS_ID)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("stats".to_string()).into())
}

/// Returns the current aggregate, lazily initializing it.
pub async fn get_stats<C>(db: &C) -> Result<Stats>
where
    C: ConnectionTrait,
{
    ensure_stats(db).await.map(Into::into)
}

/// Atomically adds `delta` to the stats row.
///
/// Call this on the same transaction as the record write it accounts for.
pub async fn apply_delta<C>(db: &C, delta: StatsDelta) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_stats(db).await?;

    let mut update = StatsEntity::update_many()
        .col_expr(stats::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(stats::Column::Id.eq(stats::STATS_ID));
    for (column, amount) in delta.by_column() {
        if amount != 0 {
            update = update.col_expr(column, Expr::col(column).add(amount));
        }
    }
    update.exec(db).await?;

    debug!(?delta, "Applied stats delta");
    Ok(())
}

/// Counts the record tables without touching the stats row.
pub async fn recount<C>(db: &C) -> Result<Stats>
where
    C: ConnectionTrait,
{
    let total_tickets = TicketEntity::find().count(db).await?;
    let closed_tickets = TicketEntity::find()
        .filter(ticket::Column::Status.eq(ticket::Status::Closed))
        .count(db)
        .await?;
    let total_vouches = Vouch::find().count(db).await?;
    let verified_users = Verification::find().count(db).await?;

    Ok(Stats {
        total_tickets: to_counter(total_tickets),
        active_tickets: to_counter(total_tickets.saturating_sub(closed_tickets)),
        closed_tickets: to_counter(closed_tickets),
        total_vouches: to_counter(total_vouches),
        verified_users: to_counter(verified_users),
        updated_at: Utc::now(),
    })
}

/// Rebuilds the stats row from the record tables and returns it.
#[instrument(skip(db))]
pub async fn reconcile_stats(db: &DatabaseConnection) -> Result<Stats> {
    let txn = db.begin().await?;

    let previous: Stats = ensure_stats(&txn).await?.into();
    let fresh = recount(&txn).await?;
    if !previous.same_counts(&fresh) {
        warn!(?previous, ?fresh, "Stats aggregate had drifted from the records");
    }

    let model = stats::ActiveModel::from(&fresh).update(&txn).await?;
    txn.commit().await?;

    Ok(model.into())
}

/// Computes the aggregate a snapshot's records imply.
///
/// Verifications are counted by distinct user id, matching the one-per-user rule.
#[must_use]
pub fn recount_snapshot(snapshot: &Snapshot, now: DateTime<Utc>) -> Stats {
    let closed = snapshot.tickets.iter().filter(|t| !t.is_open()).count();
    let verified: HashSet<&str> = snapshot
        .verifications
        .iter()
        .map(|v| v.user_id.as_str())
        .collect();

    Stats {
        total_tickets: to_counter(snapshot.tickets.len()),
        active_tickets: to_counter(snapshot.tickets.len() - closed),
        closed_tickets: to_counter(closed),
        total_vouches: to_counter(snapshot.vouches.len()),
        verified_users: to_counter(verified.len()),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::{Ticket, Verification as VerificationRecord};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_ensure_stats_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = ensure_stats(&db).await?;
        let second = ensure_stats(&db).await?;
        assert_eq!(first, second);
        assert_eq!(StatsEntity::find().count(&db).await?, 1);
        assert_eq!(first.total_tickets, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_adds_to_counters() -> Result<()> {
        let db = setup_test_db().await?;

        apply_delta(&db, StatsDelta::TICKET_OPENED).await?;
        apply_delta(&db, StatsDelta::TICKET_OPENED).await?;
        apply_delta(&db, StatsDelta::TICKET_CLOSED).await?;
        apply_delta(&db, StatsDelta::VOUCH_ADDED).await?;

        let stats = get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.active_tickets, 1);
        assert_eq!(stats.closed_tickets, 1);
        assert_eq!(stats.total_vouches, 1);
        assert_eq!(stats.verified_users, 0);
        assert_eq!(StatsEntity::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 1, "c1").await?;
        create_open_ticket(&db, 2, "c2").await?;
        crate::core::ticket::close_ticket(&db, 2).await?;

        // Corrupt the aggregate behind the maintainer's back
        apply_delta(&db, StatsDelta::VOUCH_ADDED).await?;
        apply_delta(&db, StatsDelta::TICKET_CLOSED).await?;

        let stats = reconcile_stats(&db).await?;
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.active_tickets, 1);
        assert_eq!(stats.closed_tickets, 1);
        assert_eq!(stats.total_vouches, 0);
        assert_eq!(get_stats(&db).await?.active_tickets, 1);

        Ok(())
    }

    #[test]
    fn test_delta_apply_to_keeps_ticket_invariant() {
        let mut stats = Stats::default();
        let now = Utc::now();
        for delta in [
            StatsDelta::TICKET_OPENED,
            StatsDelta::for_new_ticket(TicketStatus::Closed),
            StatsDelta::TICKET_OPENED,
            StatsDelta::TICKET_CLOSED,
        ] {
            delta.apply_to(&mut stats, now);
            assert_eq!(
                stats.total_tickets,
                stats.active_tickets + stats.closed_tickets
            );
        }
        assert_eq!(stats.closed_tickets, 2);
        assert_eq!(stats.updated_at, now);
    }

    #[test]
    fn test_recount_snapshot_counts_distinct_verified_users() {
        let now = Utc::now();
        let mut closed = Ticket::open(2, "c2", "u2", "bob", "support");
        closed.status = TicketStatus::Closed;
        closed.closed_at = Some(now);
        let verification = |user: &str| VerificationRecord {
            user_id: user.to_string(),
            username: user.to_string(),
            verified_at: now,
        };
        let snapshot = Snapshot {
            tickets: vec![Ticket::open(1, "c1", "u1", "alice", "purchase"), closed],
            vouches: Vec::new(),
            verifications: vec![verification("u1"), verification("u1"), verification("u2")],
            stats: Stats::default(),
        };

        let stats = recount_snapshot(&snapshot, now);
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.active_tickets, 1);
        assert_eq!(stats.closed_tickets, 1);
        assert_eq!(stats.verified_users, 2);
    }
}

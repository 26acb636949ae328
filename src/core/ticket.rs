//! Ticket business logic - Opening, detailing, closing and listing tickets.
//!
//! Creating and closing a ticket write the ticket row and the stats delta in
//! one database transaction, so the aggregate cannot drift from the table on a
//! partial failure. Closing is guarded on the current status: only an open
//! ticket moves the aggregate.

use crate::{
    core::stats::{self, StatsDelta},
    entities::{Ticket as TicketEntity, ticket},
    errors::{Error, Result},
    models::{Ticket, TicketDetails},
};
use chrono::Utc;
use sea_orm::{IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// What `close_ticket` found when it looked at the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The ticket was open and is now closed
    Closed,
    /// The ticket was already closed; nothing changed
    AlreadyClosed,
    /// No ticket has that id; nothing changed
    NotFound,
}

fn into_tickets(models: Vec<ticket::Model>) -> Result<Vec<Ticket>> {
    models.into_iter().map(Ticket::try_from).collect()
}

/// Inserts a new ticket and counts it in the aggregate.
///
/// A ticket recorded as open increments `total_tickets` and `active_tickets`;
/// one recorded as already closed increments `total_tickets` and `closed_tickets`.
///
/// # Errors
/// `Error::DuplicateTicket` if the id is taken, `Error::InvalidRecord` if the
/// status and `closed_at` disagree.
#[instrument(skip(db, ticket), fields(ticket_id = ticket.id))]
pub async fn create_ticket(db: &DatabaseConnection, ticket: &Ticket) -> Result<Ticket> {
    ticket.validate()?;

    let txn = db.begin().await?;

    if TicketEntity::find_by_id(ticket.id).one(&txn).await?.is_some() {
        return Err(Error::DuplicateTicket { id: ticket.id });
    }

    let model = ticket::active_model_from(ticket)?.insert(&txn).await?;
    stats::apply_delta(&txn, StatsDelta::for_new_ticket(ticket.status)).await?;

    txn.commit().await?;
    debug!("Ticket created");
    Ticket::try_from(model)
}

/// Replaces a ticket's details and stamps `updated_at`.
///
/// Returns `None` when no ticket has that id. The aggregate is never touched.
#[instrument(skip(db, details))]
pub async fn update_ticket_details(
    db: &DatabaseConnection,
    ticket_id: i64,
    details: Option<TicketDetails>,
) -> Result<Option<Ticket>> {
    let Some(existing) = TicketEntity::find_by_id(ticket_id).one(db).await? else {
        debug!("No ticket to update");
        return Ok(None);
    };

    let details = details.as_ref().map(serde_json::to_value).transpose()?;
    let mut active = existing.into_active_model();
    active.details = Set(details);
    active.updated_at = Set(Some(Utc::now()));

    let model = active.update(db).await?;
    Ticket::try_from(model).map(Some)
}

/// Finds a ticket by its id.
pub async fn get_ticket_by_id(db: &DatabaseConnection, ticket_id: i64) -> Result<Option<Ticket>> {
    TicketEntity::find_by_id(ticket_id)
        .one(db)
        .await?
        .map(Ticket::try_from)
        .transpose()
}

/// Finds the ticket bound to a Discord channel, the newest one if several match.
pub async fn get_ticket_by_channel_id(
    db: &DatabaseConnection,
    channel_id: &str,
) -> Result<Option<Ticket>> {
    TicketEntity::find()
        .filter(ticket::Column::ChannelId.eq(channel_id))
        .order_by_desc(ticket::Column::CreatedAt)
        .one(db)
        .await?
        .map(Ticket::try_from)
        .transpose()
}

/// Closes an open ticket and moves it from `active_tickets` to `closed_tickets`.
///
/// The status change is a conditional update (`WHERE status = 'open'`), so two
/// concurrent closes of the same ticket cannot both count.
#[instrument(skip(db))]
pub async fn close_ticket(db: &DatabaseConnection, ticket_id: i64) -> Result<CloseOutcome> {
    let txn = db.begin().await?;

    let result = TicketEntity::update_many()
        .col_expr(ticket::Column::Status, Expr::value(ticket::Status::Closed))
        .col_expr(ticket::Column::ClosedAt, Expr::value(Utc::now()))
        .filter(ticket::Column::Id.eq(ticket_id))
        .filter(ticket::Column::Status.eq(ticket::Status::Open))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        let outcome = if TicketEntity::find_by_id(ticket_id).one(&txn).await?.is_some() {
            CloseOutcome::AlreadyClosed
        } else {
            CloseOutcome::NotFound
        };
        debug!(?outcome, "Ticket not closed");
        return Ok(outcome);
    }

    stats::apply_delta(&txn, StatsDelta::TICKET_CLOSED).await?;
    txn.commit().await?;

    debug!("Ticket closed");
    Ok(CloseOutcome::Closed)
}

/// Retrieves every ticket, newest first.
pub async fn list_all_tickets(db: &DatabaseConnection) -> Result<Vec<Ticket>> {
    let models = TicketEntity::find()
        .order_by_desc(ticket::Column::CreatedAt)
        .all(db)
        .await?;
    into_tickets(models)
}

/// Retrieves open tickets, newest first.
pub async fn list_active_tickets(db: &DatabaseConnection) -> Result<Vec<Ticket>> {
    let models = TicketEntity::find()
        .filter(ticket::Column::Status.eq(ticket::Status::Open))
        .order_by_desc(ticket::Column::CreatedAt)
        .all(db)
        .await?;
    into_tickets(models)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::TicketStatus;
    use crate::test_utils::*;
    use chrono::{Duration, SubsecRound};

    #[tokio::test]
    async fn test_create_ticket_updates_stats() -> Result<()> {
        let db = setup_test_db().await?;

        let ticket = create_open_ticket(&db, 1, "c1").await?;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.closed_at.is_none());

        let stats = stats::get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 1);
        assert_eq!(stats.active_tickets, 1);
        assert_eq!(stats.closed_tickets, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_ticket_rejects_duplicate_id() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 1, "c1").await?;

        let result = create_ticket(&db, &Ticket::open(1, "c2", "u2", "bob", "support")).await;
        assert!(matches!(result, Err(Error::DuplicateTicket { id: 1 })));

        let stats = stats::get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 1);
        assert_eq!(stats.active_tickets, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_closed_ticket_counts_as_closed() -> Result<()> {
        let db = setup_test_db().await?;
        let mut ticket = Ticket::open(7, "c7", "u1", "alice", "purchase");
        ticket.status = TicketStatus::Closed;
        ticket.closed_at = Some(Utc::now());

        create_ticket(&db, &ticket).await?;

        let stats = stats::get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 1);
        assert_eq!(stats.active_tickets, 0);
        assert_eq!(stats.closed_tickets, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_details_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 1, "c1").await?;

        // Storage may drop sub-second precision
        let before_update = Utc::now().trunc_subsecs(0);
        let details = gold_details();
        let updated = update_ticket_details(&db, 1, Some(details.clone())).await?;
        assert!(updated.is_some());

        let ticket = get_ticket_by_id(&db, 1).await?.unwrap();
        assert_eq!(ticket.details, Some(details));
        assert!(ticket.updated_at.unwrap() >= before_update);

        // Details never touch the aggregate
        assert_eq!(stats::get_stats(&db).await?.total_tickets, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_details_missing_ticket_is_noop() -> Result<()> {
        let db = setup_test_db().await?;
        let updated = update_ticket_details(&db, 404, Some(gold_details())).await?;
        assert!(updated.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_by_channel() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 1, "c1").await?;
        create_open_ticket(&db, 2, "c2").await?;

        let found = get_ticket_by_channel_id(&db, "c2").await?.unwrap();
        assert_eq!(found.id, 2);
        assert!(get_ticket_by_channel_id(&db, "nowhere").await?.is_none());
        assert!(get_ticket_by_id(&db, 3).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_close_ticket_is_guarded() -> Result<()> {
        let db = setup_test_db().await?;
        create_open_ticket(&db, 1, "c1").await?;

        assert_eq!(close_ticket(&db, 1).await?, CloseOutcome::Closed);
        assert_eq!(close_ticket(&db, 1).await?, CloseOutcome::AlreadyClosed);
        assert_eq!(close_ticket(&db, 99).await?, CloseOutcome::NotFound);

        let stats = stats::get_stats(&db).await?;
        assert_eq!(stats.total_tickets, 1);
        assert_eq!(stats.active_tickets, 0);
        assert_eq!(stats.closed_tickets, 1);

        let ticket = get_ticket_by_id(&db, 1).await?.unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert!(ticket.closed_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_active_tickets_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        for (id, minutes_ago) in [(1, 30), (2, 10), (3, 20)] {
            let mut ticket = Ticket::open(id, format!("c{id}"), "u1", "alice", "purchase");
            ticket.created_at = now - Duration::minutes(minutes_ago);
            create_ticket(&db, &ticket).await?;
        }
        close_ticket(&db, 3).await?;

        let active: Vec<i64> = list_active_tickets(&db).await?.iter().map(|t| t.id).collect();
        assert_eq!(active, vec![2, 1]);

        let all: Vec<i64> = list_all_tickets(&db).await?.iter().map(|t| t.id).collect();
        assert_eq!(all, vec![2, 3, 1]);

        Ok(())
    }
}

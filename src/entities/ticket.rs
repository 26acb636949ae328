//! Ticket entity - Support and order tickets tracked from open to closed.
//!
//! Each ticket is bound to the Discord channel it was opened in. Order details
//! are filled in after creation and stored as a JSON document.

use crate::{
    errors,
    models::{Ticket, TicketStatus},
};
use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Ticket database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    /// Caller-assigned ticket number
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Discord channel the ticket lives in
    pub channel_id: String,
    /// Discord user ID of the ticket owner
    pub user_id: String,
    /// Display tag of the ticket owner at creation time
    pub username: String,
    /// Free-form ticket category (e.g., "purchase", "support")
    pub ticket_type: String,
    /// Open or closed
    pub status: Status,
    /// Order details as a JSON document, `None` until set
    #[sea_orm(column_type = "Json", nullable)]
    pub details: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub closed_at: Option<DateTimeUtc>,
}

/// Stored ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl From<TicketStatus> for Status {
    fn from(value: TicketStatus) -> Self {
        match value {
            TicketStatus::Open => Self::Open,
            TicketStatus::Closed => Self::Closed,
        }
    }
}

impl From<Status> for TicketStatus {
    fn from(value: Status) -> Self {
        match value {
            Status::Open => Self::Open,
            Status::Closed => Self::Closed,
        }
    }
}

/// Tickets have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Ticket {
    type Error = crate::errors::Error;

    fn try_from(model: Model) -> errors::Result<Self> {
        let details = model.details.map(serde_json::from_value).transpose()?;
        Ok(Self {
            id: model.id,
            channel_id: model.channel_id,
            user_id: model.user_id,
            username: model.username,
            ticket_type: model.ticket_type,
            status: model.status.into(),
            details,
            created_at: model.created_at,
            updated_at: model.updated_at,
            closed_at: model.closed_at,
        })
    }
}

/// Builds an insertable row from a ticket record, keeping its identifier.
pub fn active_model_from(ticket: &Ticket) -> errors::Result<ActiveModel> {
    let details = ticket
        .details
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    Ok(ActiveModel {
        id: Set(ticket.id),
        channel_id: Set(ticket.channel_id.clone()),
        user_id: Set(ticket.user_id.clone()),
        username: Set(ticket.username.clone()),
        ticket_type: Set(ticket.ticket_type.clone()),
        status: Set(ticket.status.into()),
        details: Set(details),
        created_at: Set(ticket.created_at),
        updated_at: Set(ticket.updated_at),
        closed_at: Set(ticket.closed_at),
    })
}

//! Plain data records shared by every storage backend and by the bot layer.
//!
//! These types carry no ORM or Discord types. Their serde shape is the
//! flat-file representation: camelCase field names and ISO-8601 timestamps.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a ticket. Closing is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Ticket is being worked on
    #[default]
    Open,
    /// Ticket has been closed
    Closed,
}

/// Order details attached to a ticket after creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub bot_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TicketDetails {
    /// Fields set in `update` replace ours; unset ones keep their value.
    #[must_use]
    pub fn overlay(self, update: Self) -> Self {
        Self {
            package: update.package.or(self.package),
            price: update.price.or(self.price),
            quantity: update.quantity.or(self.quantity),
            duration: update.duration.or(self.duration),
            bot_type: update.bot_type.or(self.bot_type),
            description: update.description.or(self.description),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A support or order ticket bound to a Discord channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "type", default)]
    pub ticket_type: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub details: Option<TicketDetails>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Builds a freshly opened ticket stamped with the current time.
    #[must_use]
    pub fn open(
        id: i64,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
        ticket_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            username: username.into(),
            ticket_type: ticket_type.into(),
            status: TicketStatus::Open,
            details: None,
            created_at: Utc::now(),
            updated_at: None,
            closed_at: None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }

    /// `closed_at` must be present exactly when the ticket is closed.
    pub fn validate(&self) -> Result<()> {
        match (self.status, self.closed_at) {
            (TicketStatus::Open, Some(_)) => Err(Error::InvalidRecord {
                message: format!("open ticket {} has a closedAt timestamp", self.id),
            }),
            (TicketStatus::Closed, None) => Err(Error::InvalidRecord {
                message: format!("closed ticket {} has no closedAt timestamp", self.id),
            }),
            _ => Ok(()),
        }
    }
}

/// A star rating and comment left by one member about another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vouch {
    pub id: i64,
    #[serde(default)]
    pub from_user_id: String,
    #[serde(default)]
    pub from_username: String,
    #[serde(default)]
    pub to_user_id: String,
    #[serde(default)]
    pub to_username: String,
    pub stars: i32,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Vouch {
    /// Lowest accepted rating
    pub const MIN_STARS: i32 = 1;
    /// Highest accepted rating
    pub const MAX_STARS: i32 = 5;

    pub fn validate(&self) -> Result<()> {
        if (Self::MIN_STARS..=Self::MAX_STARS).contains(&self.stars) {
            Ok(())
        } else {
            Err(Error::InvalidRating { stars: self.stars })
        }
    }
}

/// One-time attestation that a user has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "Utc::now")]
    pub verified_at: DateTime<Utc>,
}

/// The singleton aggregate kept in step with the record collections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_tickets: i64,
    pub active_tickets: i64,
    pub closed_tickets: i64,
    pub total_vouches: i64,
    pub verified_users: i64,
    pub updated_at: DateTime<Utc>,
}

impl Stats {
    /// A zeroed aggregate stamped with `now`.
    #[must_use]
    pub fn zeroed(now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..Self::default()
        }
    }

    /// Compares counters only; `updated_at` is ignored.
    #[must_use]
    pub fn same_counts(&self, other: &Self) -> bool {
        self.total_tickets == other.total_tickets
            && self.active_tickets == other.active_tickets
            && self.closed_tickets == other.closed_tickets
            && self.total_vouches == other.total_vouches
            && self.verified_users == other.verified_users
    }
}

/// Whole-store image in the flat-file layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub tickets: Vec<Ticket>,
    pub vouches: Vec<Vouch>,
    pub verifications: Vec<Verification>,
    pub stats: Stats,
}

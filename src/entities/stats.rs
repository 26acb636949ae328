//! Stats entity - The singleton aggregate row.
//!
//! Exactly one row exists, keyed by [`STATS_ID`]. Counters are only written
//! through `core::stats`.

use crate::models::Stats;
use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Primary key of the only stats row
pub const STATS_ID: i32 = 1;

/// Stats database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stats")]
pub struct Model {
    /// Always [`STATS_ID`]
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub total_tickets: i64,
    pub active_tickets: i64,
    pub closed_tickets: i64,
    pub total_vouches: i64,
    pub verified_users: i64,
    /// When any counter last changed
    pub updated_at: DateTimeUtc,
}

/// `Stats` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Stats {
    fn from(model: Model) -> Self {
        Self {
            total_tickets: model.total_tickets,
            active_tickets: model.active_tickets,
            closed_tickets: model.closed_tickets,
            total_vouches: model.total_vouches,
            verified_users: model.verified_users,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Stats> for ActiveModel {
    fn from(stats: &Stats) -> Self {
        Self {
            id: Set(STATS_ID),
            total_tickets: Set(stats.total_tickets),
            active_tickets: Set(stats.active_tickets),
            closed_tickets: Set(stats.closed_tickets),
            total_vouches: Set(stats.total_vouches),
            verified_users: Set(stats.verified_users),
            updated_at: Set(stats.updated_at),
        }
    }
}

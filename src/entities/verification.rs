//! Verification entity - At most one row per verified Discord user.

use crate::models::Verification;
use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Verification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verifications")]
pub struct Model {
    /// Discord user ID; the primary key enforces one verification per user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub username: String,
    pub verified_at: DateTimeUtc,
}

/// Verifications have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Verification {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            username: model.username,
            verified_at: model.verified_at,
        }
    }
}

impl From<&Verification> for ActiveModel {
    fn from(verification: &Verification) -> Self {
        Self {
            user_id: Set(verification.user_id.clone()),
            username: Set(verification.username.clone()),
            verified_at: Set(verification.verified_at),
        }
    }
}

//! Vouch entity - Immutable star ratings left by one member for another.

use crate::models::Vouch;
use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Vouch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouches")]
pub struct Model {
    /// Caller-assigned identifier (epoch milliseconds when created by the bot)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub from_user_id: String,
    pub from_username: String,
    /// Discord user ID of the member being vouched for
    #[sea_orm(indexed)]
    pub to_user_id: String,
    pub to_username: String,
    /// Rating from 1 to 5
    pub stars: i32,
    pub comment: String,
    /// Optional screenshot or proof link
    pub image_url: Option<String>,
    pub created_at: DateTimeUtc,
}

/// Vouches have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Vouch {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            from_user_id: model.from_user_id,
            from_username: model.from_username,
            to_user_id: model.to_user_id,
            to_username: model.to_username,
            stars: model.stars,
            comment: model.comment,
            image_url: model.image_url,
            created_at: model.created_at,
        }
    }
}

impl From<&Vouch> for ActiveModel {
    fn from(vouch: &Vouch) -> Self {
        Self {
            id: Set(vouch.id),
            from_user_id: Set(vouch.from_user_id.clone()),
            from_username: Set(vouch.from_username.clone()),
            to_user_id: Set(vouch.to_user_id.clone()),
            to_username: Set(vouch.to_username.clone()),
            stars: Set(vouch.stars),
            comment: Set(vouch.comment.clone()),
            image_url: Set(vouch.image_url.clone()),
            created_at: Set(vouch.created_at),
        }
    }
}

//! Vouch business logic - Recording and reading member ratings.
//!
//! Vouches are immutable once written. Per-user counts are always derived from
//! the vouches table, never from a process-local counter, so they survive
//! restarts. The formatting helpers here are framework-agnostic and are used by
//! the bot layer to render vouch embeds.

use crate::{
    core::stats::{self, StatsDelta},
    entities::{Vouch as VouchEntity, vouch},
    errors::{Error, Result},
    models::Vouch,
};
use sea_orm::{PaginatorTrait, QueryOrder, TransactionTrait, prelude::*};
use tracing::{debug, instrument};
use url::Url;

/// Inserts a vouch and increments `total_vouches` in the same transaction.
///
/// # Errors
/// `Error::InvalidRating` for stars outside 1..=5, `Error::DuplicateVouch` if
/// the id is taken.
#[instrument(skip(db, vouch), fields(vouch_id = vouch.id, to_user_id = %vouch.to_user_id))]
pub async fn create_vouch(db: &DatabaseConnection, vouch: &Vouch) -> Result<Vouch> {
    vouch.validate()?;

    let txn = db.begin().await?;

    if VouchEntity::find_by_id(vouch.id).one(&txn).await?.is_some() {
        return Err(Error::DuplicateVouch { id: vouch.id });
    }

    let model = vouch::ActiveModel::from(vouch).insert(&txn).await?;
    stats::apply_delta(&txn, StatsDelta::VOUCH_ADDED).await?;

    txn.commit().await?;
    debug!("Vouch recorded");
    Ok(model.into())
}

/// Retrieves every vouch, newest first.
pub async fn list_all_vouches(db: &DatabaseConnection) -> Result<Vec<Vouch>> {
    let models = VouchEntity::find()
        .order_by_desc(vouch::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Into::into).collect())
}

/// Retrieves the vouches left for `user_id`, newest first.
pub async fn list_vouches_for_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<Vouch>> {
    let models = VouchEntity::find()
        .filter(vouch::Column::ToUserId.eq(user_id))
        .order_by_desc(vouch::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Into::into).collect())
}

/// Counts the vouches left for `user_id`.
pub async fn count_vouches_for_user(db: &DatabaseConnection, user_id: &str) -> Result<u64> {
    VouchEntity::find()
        .filter(vouch::Column::ToUserId.eq(user_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Renders a rating as filled and empty stars, e.g. `⭐⭐⭐☆☆` for 3.
///
/// Out-of-range ratings are clamped to 0..=5.
#[must_use]
pub fn format_stars(stars: i32) -> String {
    let filled = usize::try_from(stars.clamp(0, Vouch::MAX_STARS)).unwrap_or(0);
    let empty = usize::try_from(Vouch::MAX_STARS).unwrap_or(5) - filled;
    format!("{}{}", "⭐".repeat(filled), "☆".repeat(empty))
}

/// Human label for a rating, as shown on the vouch panel.
#[must_use]
pub const fn rating_label(stars: i32) -> &'static str {
    match stars {
        1 => "Poor",
        2 => "Below Average",
        3 => "Average",
        4 => "Good",
        5 => "Excellent",
        _ => "Unrated",
    }
}

/// True if `url` is an absolute http(s) link with a host, which Discord can embed.
#[must_use]
pub fn is_embeddable_image_url(url: &str) -> bool {
    Url::parse(url.trim()).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
    })
}

//! Verification business logic - One verification per Discord user.

use crate::{
    core::stats::{self, StatsDelta},
    entities::{Verification as VerificationEntity, verification},
    errors::{Error, Result},
    models::Verification,
};
use chrono::Utc;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use tracing::{debug, instrument, warn};

/// Result of trying to verify a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// A new verification was written and counted
    Created(Verification),
    /// The user was already verified; nothing changed
    AlreadyVerified,
}

/// Records a verification for `user_id` and increments `verified_users`.
///
/// A second verification for the same user is skipped and leaves the
/// aggregate untouched. The existing record is never overwritten.
#[instrument(skip(db))]
pub async fn create_verification(
    db: &DatabaseConnection,
    user_id: &str,
    username: &str,
) -> Result<VerificationOutcome> {
    let txn = db.begin().await?;

    if VerificationEntity::find_by_id(user_id).one(&txn).await?.is_some() {
        debug!("User already verified");
        return Ok(VerificationOutcome::AlreadyVerified);
    }

    let record = Verification {
        user_id: user_id.to_string(),
        username: username.to_string(),
        verified_at: Utc::now(),
    };
    match verification::ActiveModel::from(&record).insert(&txn).await {
        Ok(_) => {}
        Err(err) => {
            let err = Error::from(err);
            if err.is_constraint_violation() {
                warn!("Concurrent verification for the same user, skipping");
                return Ok(VerificationOutcome::AlreadyVerified);
            }
            return Err(err);
        }
    }
    stats::apply_delta(&txn, StatsDelta::USER_VERIFIED).await?;

    txn.commit().await?;
    debug!("User verified");
    Ok(VerificationOutcome::Created(record))
}

/// Finds the verification for a user.
pub async fn get_verification(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<Verification>> {
    let model = VerificationEntity::find_by_id(user_id).one(db).await?;
    Ok(model.map(Into::into))
}

/// Retrieves every verification, newest first.
pub async fn list_verifications(db: &DatabaseConnection) -> Result<Vec<Verification>> {
    let models = VerificationEntity::find()
        .order_by_desc(verification::Column::VerifiedAt)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_duplicate_verification_is_skipped() -> Result<()> {
        let db = setup_test_db().await?;

        let first = create_verification(&db, "u1", "alice").await?;
        assert!(matches!(first, VerificationOutcome::Created(ref v) if v.username == "alice"));

        let second = create_verification(&db, "u1", "alice-renamed").await?;
        assert_eq!(second, VerificationOutcome::AlreadyVerified);

        assert_eq!(stats::get_stats(&db).await?.verified_users, 1);
        assert_eq!(VerificationEntity::find().count(&db).await?, 1);

        // The original record is kept, not overwritten
        let stored = get_verification(&db, "u1").await?.unwrap();
        assert_eq!(stored.username, "alice");

        Ok(())
    }

    #[tokio::test]
    async fn test_list_verifications() -> Result<()> {
        let db = setup_test_db().await?;
        create_verification(&db, "u1", "alice").await?;
        create_verification(&db, "u2", "bob").await?;

        assert_eq!(list_verifications(&db).await?.len(), 2);
        assert_eq!(stats::get_stats(&db).await?.verified_users, 2);
        assert!(get_verification(&db, "u3").await?.is_none());

        Ok(())
    }
}

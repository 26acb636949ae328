//! Verification command - marks a member as verified once.

mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_ephemeral},
        errors::{Error, Result},
    };
    use poise::serenity_prelude::{self as serenity, Mentionable};
    use tracing::info;

    /// Marks a member as verified. Each member can be verified only once.
    #[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
    pub async fn verify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to verify"] user: serenity::User,
    ) -> Result<()> {
        let store = &ctx.data().store;
        let user_id = user.id.to_string();

        if store.create_verification(&user_id, &user.tag()).await {
            info!(%user_id, by = %ctx.author().id, "Member verified");
            return reply_ephemeral(ctx, format!("✅ {} is now verified.", user.mention())).await;
        }

        match store.get_verification(&user_id).await {
            Some(existing) => {
                reply_ephemeral(
                    ctx,
                    format!(
                        "ℹ️ {} was already verified <t:{}:R>.",
                        user.mention(),
                        existing.verified_at.timestamp()
                    ),
                )
                .await
            }
            None => {
                reply_ephemeral(ctx, "❌ Could not verify this member. Please try again later.")
                    .await
            }
        }
    }
}

pub use inner::*;

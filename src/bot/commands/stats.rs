//! Stats commands - show the aggregate counters and rebuild them from the records.

mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_ephemeral},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    /// Shows ticket, vouch and verification totals.
    #[poise::command(slash_command)]
    pub async fn stats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(stats) = ctx.data().store.get_stats().await else {
            return reply_ephemeral(ctx, "❌ Statistics are unavailable right now.").await;
        };

        let embed = serenity::CreateEmbed::default()
            .title("📊 Server Statistics")
            .color(0x0000_D9A3)
            .field("🎫 Total Tickets", stats.total_tickets.to_string(), true)
            .field("🟢 Active Tickets", stats.active_tickets.to_string(), true)
            .field("🔒 Closed Tickets", stats.closed_tickets.to_string(), true)
            .field("⭐ Total Vouches", stats.total_vouches.to_string(), true)
            .field("✅ Verified Users", stats.verified_users.to_string(), true)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Storage: {}",
                ctx.data().store.backend_name()
            )))
            .timestamp(stats.updated_at);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Recounts every statistic from the stored tickets, vouches and verifications.
    #[poise::command(
        slash_command,
        rename = "reconcile-stats",
        guild_only,
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn reconcile_stats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let store = &ctx.data().store;
        let before = store.get_stats().await;

        let Some(after) = store.reconcile_stats().await else {
            return reply_ephemeral(ctx, "❌ Could not recount statistics. Please try again later.")
                .await;
        };
        info!(by = %ctx.author().id, ?after, "Stats reconciled");

        let message = match before {
            Some(before) if before.same_counts(&after) => {
                "✅ Statistics already matched the records.".to_string()
            }
            _ => format!(
                "✅ Statistics rebuilt: {} tickets ({} active, {} closed), {} vouches, {} verified users.",
                after.total_tickets,
                after.active_tickets,
                after.closed_tickets,
                after.total_vouches,
                after.verified_users
            ),
        };
        reply_ephemeral(ctx, message).await
    }
}

pub use inner::*;

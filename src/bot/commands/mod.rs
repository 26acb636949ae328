//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Aggregate statistics command
pub mod stats;

/// Ticket lifecycle commands
pub mod ticket;

/// Member verification
pub mod verify;

/// Vouch panel, vouch recording and lookup
pub mod vouch;

// Export commands
pub use general::*;
pub use stats::*;
pub use ticket::*;
pub use verify::*;
pub use vouch::*;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        setup_vouch(),
        vouch(),
        vouches(),
        stats(),
        reconcile_stats(),
        ticket(),
        tickets(),
        verify(),
        ping(),
        help(),
    ]
}

/// Sends a reply only the invoking user can see.
pub(crate) async fn reply_ephemeral(
    ctx: crate::bot::Context<'_>,
    content: impl Into<String>,
) -> crate::errors::Result<()> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

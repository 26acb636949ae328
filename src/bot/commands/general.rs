//! General Discord commands - ping and help.
//! These commands don't touch the record store.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Vouch Keeper Help**\n\
        Here is a summary of all available commands.\n\n\
        **Vouches**\n\
        • `/vouch <user> <rating> <reason> [image]` - Leave a 1-5 star vouch for a member.\n\
        • `/vouches [user]` - Shows how many vouches a member has received.\n\
        • `/setup-vouch` - Posts the vouch instructions panel (administrators).\n\n\
        **Tickets**\n\
        • `/ticket open <type>` - Opens a ticket for this channel.\n\
        • `/ticket details [package] [price] [quantity] [duration] [bot_type] [description]` - Records order details.\n\
        • `/ticket close` - Closes this channel's ticket.\n\
        • `/tickets` - Lists open tickets (staff).\n\n\
        **Utility**\n\
        • `/verify <user>` - Marks a member as verified (staff).\n\
        • `/stats` - Shows ticket and vouch totals.\n\
        • `/reconcile-stats` - Recounts totals from the records (administrators).\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

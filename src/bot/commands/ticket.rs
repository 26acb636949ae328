//! Ticket Discord commands - `ticket open|details|close` and `tickets`.
//!
//! A ticket belongs to the channel it was opened in; the subcommands find it
//! through that channel.

mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_ephemeral},
        errors::{Error, Result},
        models::{Ticket, TicketDetails},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write as _;
    use tracing::info;

    const LISTED_TICKETS: usize = 20;

    fn details_summary(details: &TicketDetails) -> String {
        let rows = [
            ("Package", details.package.clone()),
            ("Price", details.price.clone()),
            ("Quantity", details.quantity.map(|q| q.to_string())),
            ("Duration", details.duration.clone()),
            ("Bot type", details.bot_type.clone()),
            ("Description", details.description.clone()),
        ];
        rows.into_iter()
            .filter_map(|(label, value)| value.map(|value| format!("**{label}:** {value}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parent command for the ticket bound to this channel.
    #[poise::command(
        slash_command,
        guild_only,
        subcommands("ticket_open", "ticket_details", "ticket_close")
    )]
    pub async fn ticket(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Ticket command. Available subcommands:\n\
            `/ticket open` - Open a ticket for this channel\n\
            `/ticket details` - Record order details\n\
            `/ticket close` - Close this channel's ticket";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Opens a ticket for the current channel.
    #[poise::command(slash_command, rename = "open")]
    pub async fn ticket_open(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Kind of ticket (e.g. purchase, support)"]
        #[rename = "type"]
        ticket_type: String,
    ) -> Result<()> {
        let store = &ctx.data().store;
        let channel_id = ctx.channel_id().to_string();

        if let Some(existing) = store.get_ticket_by_channel_id(&channel_id).await
            && existing.is_open()
        {
            return reply_ephemeral(
                ctx,
                format!("❌ This channel already has an open ticket (`#{}`).", existing.id),
            )
            .await;
        }

        let ticket_type = ticket_type.trim();
        if ticket_type.is_empty() {
            return reply_ephemeral(ctx, "❌ Ticket type cannot be empty.").await;
        }

        let author = ctx.author();
        let ticket = Ticket::open(
            Utc::now().timestamp_millis(),
            channel_id,
            author.id.to_string(),
            author.tag(),
            ticket_type,
        );
        if !store.create_ticket(&ticket).await {
            return reply_ephemeral(ctx, "❌ Could not open the ticket. Please try again later.")
                .await;
        }

        info!(ticket_id = ticket.id, channel = %ticket.channel_id, "Ticket opened");
        ctx.say(format!(
            "🎫 Ticket `#{}` opened for {} ({ticket_type}).",
            ticket.id,
            author.name
        ))
        .await?;
        Ok(())
    }

    /// Records order details on this channel's ticket.
    ///
    /// Only the fields given are changed.
    #[poise::command(slash_command, rename = "details")]
    pub async fn ticket_details(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Package name"] package: Option<String>,
        #[description = "Price"] price: Option<String>,
        #[description = "Quantity"]
        #[min = 1]
        quantity: Option<i64>,
        #[description = "Duration (e.g. 1mo)"] duration: Option<String>,
        #[description = "Bot type"] bot_type: Option<String>,
        #[description = "Free-form description"] description: Option<String>,
    ) -> Result<()> {
        let store = &ctx.data().store;
        let channel_id = ctx.channel_id().to_string();

        let Some(ticket) = store.get_ticket_by_channel_id(&channel_id).await else {
            return reply_ephemeral(ctx, "❌ There is no ticket for this channel.").await;
        };

        let update = TicketDetails {
            package,
            price,
            quantity,
            duration,
            bot_type,
            description,
        };
        if update.is_empty() {
            return reply_ephemeral(ctx, "❌ Provide at least one detail to record.").await;
        }

        let details = ticket.details.unwrap_or_default().overlay(update);
        if !store
            .update_ticket_details(ticket.id, Some(details.clone()))
            .await
        {
            return reply_ephemeral(ctx, "❌ Could not save the details. Please try again later.")
                .await;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("📝 Ticket #{} details", ticket.id))
            .description(details_summary(&details))
            .color(0x0034_98DB)
            .timestamp(serenity::Timestamp::now());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Closes this channel's ticket.
    #[poise::command(slash_command, rename = "close")]
    pub async fn ticket_close(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let store = &ctx.data().store;
        let channel_id = ctx.channel_id().to_string();

        let Some(ticket) = store.get_ticket_by_channel_id(&channel_id).await else {
            return reply_ephemeral(ctx, "❌ There is no ticket for this channel.").await;
        };
        if !ticket.is_open() {
            return reply_ephemeral(
                ctx,
                format!("ℹ️ Ticket `#{}` is already closed.", ticket.id),
            )
            .await;
        }

        if !store.close_ticket(ticket.id).await {
            return reply_ephemeral(ctx, "❌ Could not close the ticket. Please try again later.")
                .await;
        }

        info!(ticket_id = ticket.id, closed_by = %ctx.author().id, "Ticket closed");
        ctx.say(format!("🔒 Ticket `#{}` closed.", ticket.id)).await?;
        Ok(())
    }

    /// Lists open tickets, newest first.
    #[poise::command(slash_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
    pub async fn tickets(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let active = ctx.data().store.list_active_tickets().await;

        if active.is_empty() {
            return reply_ephemeral(ctx, "✅ There are no open tickets.").await;
        }

        let mut listing = String::new();
        for ticket in active.iter().take(LISTED_TICKETS) {
            writeln!(
                &mut listing,
                "`#{}` <#{}> · {} · {} · <t:{}:R>",
                ticket.id,
                ticket.channel_id,
                ticket.ticket_type,
                ticket.username,
                ticket.created_at.timestamp()
            )?;
        }
        if active.len() > LISTED_TICKETS {
            write!(&mut listing, "…and {} more", active.len() - LISTED_TICKETS)?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🎫 Open Tickets")
            .description(listing)
            .color(0x0034_98DB)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} open ticket{}",
                active.len(),
                if active.len() == 1 { "" } else { "s" }
            )));

        ctx.send(
            poise::CreateReply::default()
                .embed(embed)
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

pub use inner::*;

//! Vouch Discord commands - `setup-vouch`, `vouch` and `vouches`.
//!
//! A vouch is recorded before anything is posted, so a channel that is missing
//! or unreachable never loses the record itself.

mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_ephemeral},
        core::vouch::{format_stars, is_embeddable_image_url, rating_label},
        errors::{Error, Result},
        models::Vouch,
    };
    use chrono::Utc;
    use poise::serenity_prelude::{self as serenity, Mentionable};
    use std::fmt::Write as _;
    use tracing::{error, info, warn};

    const VOUCH_COLOUR: u32 = 0x00FF_1493;
    const LOOKUP_COLOUR: u32 = 0x0000_D9A3;

    fn rating_guide() -> String {
        (Vouch::MIN_STARS..=Vouch::MAX_STARS)
            .map(|stars| {
                format!(
                    "**{stars} Star{}** {} - {}",
                    if stars == 1 { "" } else { "s" },
                    "⭐".repeat(usize::try_from(stars).unwrap_or(0)),
                    rating_label(stars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn vouch_panel_embed() -> serenity::CreateEmbed {
        serenity::CreateEmbed::default()
            .color(VOUCH_COLOUR)
            .title("✨ LEAVE A VOUCH")
            .description("━━━━━━━━━━━━━━━━━━━━━━━━━")
            .field(
                "💬 How to Leave a Vouch",
                "Use the `/vouch` command to leave a review!\n\n\
                 **Example:**\n`/vouch user:@Username rating:5 reason:Bought Boost Tool all worked flawlessly`\n\n\
                 **With Screenshot:**\n`/vouch user:@Username rating:5 reason:Great service! image:https://i.imgur.com/example.png`",
                false,
            )
            .field(
                "📊 Check Vouches",
                "Use `/vouches` to see total vouches for any user.\n\n**Example:**\n`/vouches user:@Username`",
                false,
            )
            .field("⭐ Rating System", rating_guide(), false)
            .field(
                "📸 Adding Screenshots",
                "You can add a screenshot/proof by providing an image URL in the `image` field.\n\
                 Supported: Direct image links (imgur, discord CDN, etc.)",
                false,
            )
            .field(
                "✨ Why Vouch?",
                "Help build trust in our community by sharing your experience with other members!",
                false,
            )
            .footer(serenity::CreateEmbedFooter::new("⭐ Vouch System • Build Trust"))
            .timestamp(serenity::Timestamp::now())
    }

    fn vouch_embed(
        target: &serenity::User,
        author: &serenity::User,
        record: &Vouch,
        number: u64,
        guild_name: &str,
    ) -> serenity::CreateEmbed {
        let description = format!(
            "**Vouch**\n\n🛒 **Seller:**\n{} ({})\n\n⭐ **Rating:**\n{}\n\n💬 **Reason:**\n{}",
            target.mention(),
            target.name,
            format_stars(record.stars),
            record.comment
        );
        let user_information = format!(
            "👤 **Vouched By:**\n{} ({})\n\n🆔 **UserID:**\n{}\n\n⏰ **Timestamp:**\n<t:{}:R>\n\n🔢 **Vouch Nº** {number}",
            author.mention(),
            author.name,
            author.id,
            record.created_at.timestamp()
        );

        let embed = serenity::CreateEmbed::default()
            .color(VOUCH_COLOUR)
            .title("✨ New Vouch Recorded!")
            .author(
                serenity::CreateEmbedAuthor::new(format!("Vouch for {}", target.name))
                    .icon_url(target.face()),
            )
            .thumbnail(target.face())
            .description(description)
            .field("**User Information**", user_information, false)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} VOUCHES",
                guild_name.to_uppercase()
            )))
            .timestamp(serenity::Timestamp::now());

        match record.image_url.as_deref() {
            Some(url) if is_embeddable_image_url(url) => embed.image(url.trim()),
            Some(url) => {
                warn!(vouch_id = record.id, url, "Ignoring non-embeddable image URL");
                embed
            }
            None => embed,
        }
    }

    /// Posts the vouch instructions panel in this channel.
    #[poise::command(
        slash_command,
        rename = "setup-vouch",
        guild_only,
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn setup_vouch(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let handle = ctx
            .send(
                poise::CreateReply::default()
                    .content("⏳ Creating vouch panel...")
                    .ephemeral(true),
            )
            .await?;

        ctx.channel_id()
            .send_message(
                ctx.http(),
                serenity::CreateMessage::new().embed(vouch_panel_embed()),
            )
            .await?;

        handle
            .edit(
                ctx,
                poise::CreateReply::default().content("✅ Vouch panel created successfully!"),
            )
            .await?;
        Ok(())
    }

    /// Leave a vouch for another member.
    #[poise::command(slash_command, guild_only)]
    pub async fn vouch(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User you want to vouch for"] user: serenity::User,
        #[description = "Rating (1-5 stars)"]
        #[min = 1]
        #[max = 5]
        rating: i32,
        #[description = "Reason for your vouch"] reason: String,
        #[description = "Image URL (optional screenshot/proof)"] image: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let author = ctx.author();

        if user.id == author.id {
            return reply_ephemeral(ctx, "❌ You cannot vouch for yourself!").await;
        }

        let min_length = data.config.min_reason_length;
        if reason.trim().chars().count() < min_length {
            return reply_ephemeral(
                ctx,
                format!("❌ Your reason must be at least {min_length} characters long."),
            )
            .await;
        }

        let now = Utc::now();
        let record = Vouch {
            id: now.timestamp_millis(),
            from_user_id: author.id.to_string(),
            from_username: author.tag(),
            to_user_id: user.id.to_string(),
            to_username: user.tag(),
            stars: rating,
            comment: reason.trim().to_string(),
            image_url: image.filter(|url| !url.trim().is_empty()),
            created_at: now,
        };

        if !data.store.create_vouch(&record).await {
            return reply_ephemeral(ctx, "❌ Could not record your vouch. Please try again later.")
                .await;
        }
        let number = data.store.count_vouches_for_user(&record.to_user_id).await;
        info!(vouch_id = record.id, to = %record.to_user_id, number, "Vouch recorded");

        let Some(channel) = data.vouch_channel() else {
            return reply_ephemeral(
                ctx,
                "❌ Vouch channel not configured. Please contact an administrator.",
            )
            .await;
        };

        let guild_name = ctx
            .guild()
            .map_or_else(|| "SERVER".to_string(), |guild| guild.name.clone());
        let embed = vouch_embed(&user, author, &record, number, &guild_name);
        let message = serenity::CreateMessage::new()
            .content(user.mention().to_string())
            .embed(embed);

        match channel.send_message(ctx.http(), message).await {
            Ok(_) => {
                reply_ephemeral(
                    ctx,
                    format!("✅ Vouch submitted successfully for {}!", user.mention()),
                )
                .await
            }
            Err(e) => {
                error!(%channel, "Failed to post vouch embed: {e}");
                reply_ephemeral(
                    ctx,
                    "❌ Could not send vouch. Please make sure the vouch channel is configured.",
                )
                .await
            }
        }
    }

    /// Check how many vouches a member has received.
    #[poise::command(slash_command)]
    pub async fn vouches(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let received = ctx
            .data()
            .store
            .list_vouches_for_user(&target.id.to_string())
            .await;

        let mut embed = serenity::CreateEmbed::default()
            .color(LOOKUP_COLOUR)
            .title("📊 Vouch Statistics")
            .thumbnail(target.face())
            .field("👤 User", target.mention().to_string(), true)
            .field("⭐ Total Vouches", received.len().to_string(), true)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "User ID: {}",
                target.id
            )))
            .timestamp(serenity::Timestamp::now());

        if !received.is_empty() {
            let total: i64 = received.iter().map(|v| i64::from(v.stars)).sum();
            #[allow(clippy::cast_precision_loss)]
            let average = total as f64 / received.len() as f64;
            embed = embed.field("📈 Average Rating", format!("{average:.1} / 5"), true);

            let mut recent = String::new();
            for v in received.iter().take(3) {
                writeln!(
                    &mut recent,
                    "{} by **{}** <t:{}:R>",
                    format_stars(v.stars),
                    v.from_username,
                    v.created_at.timestamp()
                )?;
            }
            embed = embed.field("🕒 Latest", recent, false);
        }

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

use poise::serenity_prelude::Channel;
use tracing::info;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::queries::server_config;
use crate::utils::formatting::mention_channel;

/// Setup commands for configuring the bot
#[poise::command(
    slash_command,
    subcommands("config_channel", "output_channel"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands: `/setup config-channel`, `/setup output-channel`")
        .await?;
    Ok(())
}

/// Use this channel for building events with the bot
#[poise::command(slash_command, rename = "config-channel", guild_only)]
pub async fn config_channel(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let channel_id = ctx.channel_id().get();

    let updated =
        server_config::set_config_channel(&ctx.data().pool, guild_id.get() as i64, channel_id as i64)
            .await?;
    ctx.data().cache_config(&updated);

    info!("Guild {} config channel set to {}", guild_id, channel_id);

    let embed = embeds::success_embed()
        .title("Config Channel Set")
        .description(format!(
            "{} is now where events are created. Run `/events create` here to start one.",
            mention_channel(channel_id)
        ));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Set where votes and reminders are announced
#[poise::command(slash_command, rename = "output-channel", guild_only)]
pub async fn output_channel(
    ctx: Context<'_>,
    #[description = "Text channel for announcements and votes"]
    #[channel_types("Text")]
    channel: Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    server_config::set_output_channel(
        &ctx.data().pool,
        guild_id.get() as i64,
        channel.id().get() as i64,
    )
    .await?;

    info!("Guild {} output channel set to {}", guild_id, channel.id());

    let embed = embeds::success_embed()
        .title("Output Channel Set")
        .description(format!(
            "Announcements and votes will be posted in {}",
            mention_channel(channel.id().get())
        ));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

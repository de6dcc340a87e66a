use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::services::events::announcements::HELP_MESSAGE;

/// Show what the bot can do
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::info_embed()
        .title("Help")
        .description(HELP_MESSAGE);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

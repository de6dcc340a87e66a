use tracing::info;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds::{self, MAX_FIELDS, MAX_FIELD_VALUE};
use crate::db::models::VoteTrack;
use crate::db::queries::server_config;
use crate::services::events::announcements::CREATE_EVENT_HELP;
use crate::services::events::model::{Event, VoteOption};
use crate::services::sessions::manager::{SessionKey, SessionKind};
use crate::utils::formatting::{mention_channel, timestamp, truncate};

const ALREADY_CREATING: &str =
    "You are currently already creating a new event. Please save/quit before creating a new event.";

/// Create and browse game night events
#[poise::command(slash_command, subcommands("list", "create"), guild_only)]
pub async fn events(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands: `/events list`, `/events create`")
        .await?;
    Ok(())
}

/// List the events of this server that haven't finished
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let events = ctx.data().store.list_active(guild_id.get() as i64).await?;

    let embed = if events.is_empty() {
        embeds::info_embed()
            .title("Upcoming Events")
            .description("No events are scheduled. Use `/events create` to add one.")
    } else {
        let mut embed = embeds::standard_embed()
            .title("Upcoming Events")
            .description(format!("{} event(s) in progress", events.len()));
        for (i, event) in events.iter().take(MAX_FIELDS).enumerate() {
            embed = embed.field(
                truncate(&format!("#{} {}", i + 1, event.title), 256),
                truncate(&event_overview(event), MAX_FIELD_VALUE),
                false,
            );
        }
        embed
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Start building a new event in the config channel
#[poise::command(slash_command, guild_only)]
pub async fn create(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let channel_id = ctx.channel_id().get();
    let data = ctx.data();

    let config_channel = match data.config_channel(guild_id.get()) {
        Some(id) => Some(id),
        None => server_config::get(&data.pool, guild_id.get() as i64)
            .await?
            .and_then(|config| {
                data.cache_config(&config);
                config.config_channel_id.map(|id| id as u64)
            }),
    };

    let problem = match config_channel {
        None => Some(
            "No config channel is set. An administrator can run `/setup config-channel`."
                .to_string(),
        ),
        Some(id) if id != channel_id => Some(format!(
            "Events are created in {}. Please run this command there.",
            mention_channel(id)
        )),
        Some(_) => None,
    };
    if let Some(problem) = problem {
        let embed = embeds::error_embed().description(problem);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    let key = SessionKey::new(ctx.author().id.get(), channel_id);
    let embed = match data.sessions.create(key, SessionKind::CreateEvent) {
        Ok(_) => {
            info!("User {} started an event draft", ctx.author().id);
            embeds::standard_embed()
                .title("New Event")
                .description(CREATE_EVENT_HELP)
        }
        Err(Error::DuplicateSession { .. }) => embeds::error_embed().description(ALREADY_CREATING),
        Err(e) => return Err(e),
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Options, voting windows and winners so far
fn event_overview(event: &Event) -> String {
    let mut lines = Vec::new();

    if !event.description.trim().is_empty() {
        lines.push(event.description.clone());
    }
    lines.push(format!("Status: {}", event.phase()));

    for track in [VoteTrack::Type, VoteTrack::Time] {
        let vote = event.vote(track);
        let options: Vec<String> = vote
            .options
            .iter()
            .map(|option| match option {
                VoteOption::Type { label, emoji } => format!("{} {}", emoji, label),
                VoteOption::Time { at, emoji } => format!("{} {}", emoji, timestamp(*at)),
            })
            .collect();

        lines.push(format!("**Possible {}s:** {}", track, options.join(", ")));
        lines.push(format!(
            "Voting {} to {}",
            timestamp(vote.start_at),
            timestamp(vote.end_at)
        ));
    }

    if let Some(game_type) = event.final_game_type() {
        lines.push(format!("Chosen game type: {}", game_type));
    }
    if let Some(at) = event.final_game_time() {
        lines.push(format!("Chosen game time: {}", timestamp(at)));
    }

    lines.join("\n")
}

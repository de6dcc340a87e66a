use std::sync::Arc;

use chrono::FixedOffset;
use poise::serenity_prelude::{self as serenity, CreateMessage, Message};
use tracing::{debug, error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::store::EventStore;
use crate::services::events::announcements::{draft_summary, CREATE_EVENT_HELP};
use crate::services::events::builder::DraftCommand;
use crate::services::sessions::manager::{SessionKey, SessionManager, SessionPayload};

pub const EVENT_SAVED: &str = "New event created, and will be posted on the announcement day.";
pub const EVENT_DISCARDED: &str = "New event has been discarded.";
pub const CORRUPTED_SESSION: &str = "Corrupted user session. Please try again after 1 minute.";
pub const SAVE_FAILED: &str = "I couldn't save the event right now. Please try `save` again in a moment.";

/// Answer to one line of a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Info(String),
    Problem(String),
    /// The conversation ended
    Done(String),
}

impl Reply {
    fn into_embed(self) -> serenity::CreateEmbed {
        match self {
            Reply::Info(text) => embeds::info_embed().description(text),
            Reply::Problem(text) => embeds::error_embed().description(text),
            Reply::Done(text) => embeds::success_embed().description(text),
        }
    }
}

/// Discord entry point for a message that belongs to a live session
pub async fn handle_session_message(
    ctx: &serenity::Context,
    data: &Arc<Data>,
    msg: &Message,
    key: SessionKey,
) -> Result<(), Error> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let reply = handle_line(
        data.store.as_ref(),
        &data.sessions,
        key,
        guild_id.get() as i64,
        &msg.content,
        data.settings.event_offset(),
    )
    .await;

    msg.channel_id
        .send_message(
            ctx,
            CreateMessage::new()
                .embed(reply.into_embed())
                .reference_message(msg),
        )
        .await?;

    Ok(())
}

/// Run one chat line against the session at `key`
pub async fn handle_line(
    store: &dyn EventStore,
    sessions: &SessionManager,
    key: SessionKey,
    server_id: i64,
    text: &str,
    offset: FixedOffset,
) -> Reply {
    let command = match DraftCommand::parse(text, offset) {
        Ok(command) => command,
        Err(e) => return Reply::Problem(e.to_string()),
    };
    debug!("User {} draft command: {:?}", key.user_id, command);

    match command {
        DraftCommand::Edit(edit) => {
            let applied = sessions.update(key, |session| match &mut session.payload {
                SessionPayload::CreateEvent(draft) => draft.apply(edit),
            });
            match applied {
                Some(Ok(message)) => Reply::Info(message),
                Some(Err(e)) => Reply::Problem(e.to_string()),
                None => corrupted(sessions, key),
            }
        }
        DraftCommand::Summary => match sessions.find(key).map(|s| s.payload) {
            Some(SessionPayload::CreateEvent(draft)) => Reply::Info(draft_summary(&draft)),
            None => corrupted(sessions, key),
        },
        DraftCommand::Help => Reply::Info(CREATE_EVENT_HELP.to_string()),
        DraftCommand::Quit => {
            sessions.close(key);
            info!("User {} discarded their event draft", key.user_id);
            Reply::Done(EVENT_DISCARDED.to_string())
        }
        DraftCommand::Save => save(store, sessions, key, server_id).await,
    }
}

async fn save(
    store: &dyn EventStore,
    sessions: &SessionManager,
    key: SessionKey,
    server_id: i64,
) -> Reply {
    // Claimed before the insert so a second `save` can't commit the same draft
    let session = match sessions.take(key) {
        Ok(session) => session,
        Err(e) => {
            debug!("User {} save without a session: {}", key.user_id, e);
            return corrupted(sessions, key);
        }
    };
    let SessionPayload::CreateEvent(draft) = &session.payload;

    let event = match draft.validate() {
        Ok(event) => event,
        Err(e) => {
            sessions.restore(session);
            return Reply::Problem(e.to_string());
        }
    };

    match store.insert_event(server_id, &event).await {
        Ok(event_id) => {
            info!(
                "User {} created event {} in guild {}",
                key.user_id, event_id, server_id
            );
            Reply::Done(EVENT_SAVED.to_string())
        }
        Err(e) => {
            error!("Failed to save event for user {}: {:?}", key.user_id, e);
            sessions.restore(session);
            Reply::Problem(SAVE_FAILED.to_string())
        }
    }
}

fn corrupted(sessions: &SessionManager, key: SessionKey) -> Reply {
    warn!(
        "Session for user {} in channel {} vanished mid-conversation",
        key.user_id, key.channel_id
    );
    sessions.close(key);
    Reply::Problem(CORRUPTED_SESSION.to_string())
}

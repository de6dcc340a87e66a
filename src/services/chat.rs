//! Outbound chat transport used by the phase scheduler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{ChannelId, CreateMessage, Http, MessageId, ReactionType};
use serenity::http::HttpError;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::bot::error::Error;

/// Discord JSON error code for an unknown channel
const UNKNOWN_CHANNEL: isize = 10003;

/// Discord JSON error code when the bot lost access to a channel
const MISSING_ACCESS: isize = 50001;

#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Post a text message, returning its id
    async fn post(&self, channel_id: u64, text: &str) -> Result<u64, Error>;

    /// Attach a reaction button to a posted message
    async fn add_reaction_option(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), Error>;

    /// Reaction counts keyed by emoji token, excluding the bot's own reaction.
    ///
    /// Fails with `ChannelNotFound`/`MessageNotFound` once the target is gone.
    async fn reaction_counts(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<HashMap<String, u64>, Error>;

    async fn exists(&self, channel_id: u64) -> Result<bool, Error>;
}

/// Strip variation selectors so typed and reacted emoji compare equal
pub fn normalize_emoji(emoji: &str) -> String {
    emoji.trim().chars().filter(|c| *c != '\u{FE0F}').collect()
}

/// Serenity-backed transport with a fixed minimum gap between sends
pub struct DiscordChat {
    http: Arc<Http>,
    delay: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl DiscordChat {
    pub fn new(http: Arc<Http>, delay: Duration) -> Self {
        Self {
            http,
            delay,
            last_send: Mutex::new(None),
        }
    }

    /// Wait until `delay` has passed since the previous send
    async fn throttle(&self) {
        let mut last = self.last_send.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Whether a failed request means the channel is gone for the bot
fn channel_gone(status: u16, code: isize) -> bool {
    matches!((status, code), (404, UNKNOWN_CHANNEL) | (403, MISSING_ACCESS))
}

fn classify(e: serenity::Error, channel_id: u64, message_id: Option<u64>) -> Error {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref resp)) = e {
        let status = resp.status_code.as_u16();
        if channel_gone(status, resp.error.code) {
            return Error::ChannelNotFound(channel_id);
        }
        if status == 404 {
            return match message_id {
                Some(message_id) => Error::MessageNotFound {
                    channel_id,
                    message_id,
                },
                None => Error::ChannelNotFound(channel_id),
            };
        }
    }
    Error::Serenity(e)
}

#[async_trait]
impl ChatChannel for DiscordChat {
    async fn post(&self, channel_id: u64, text: &str) -> Result<u64, Error> {
        self.throttle().await;

        let message = ChannelId::new(channel_id)
            .send_message(self.http.as_ref(), CreateMessage::new().content(text))
            .await
            .map_err(|e| classify(e, channel_id, None))?;

        Ok(message.id.get())
    }

    async fn add_reaction_option(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), Error> {
        let reaction = ReactionType::try_from(emoji.trim())
            .map_err(|e| Error::InvalidOperation(format!("Bad emoji {}: {}", emoji, e)))?;

        self.throttle().await;

        ChannelId::new(channel_id)
            .create_reaction(self.http.as_ref(), MessageId::new(message_id), reaction)
            .await
            .map_err(|e| classify(e, channel_id, Some(message_id)))
    }

    async fn reaction_counts(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<HashMap<String, u64>, Error> {
        let message = ChannelId::new(channel_id)
            .message(self.http.as_ref(), MessageId::new(message_id))
            .await
            .map_err(|e| classify(e, channel_id, Some(message_id)))?;

        let mut counts = HashMap::new();
        for reaction in &message.reactions {
            let votes = reaction.count.saturating_sub(u64::from(reaction.me));
            debug!(
                "Message {} reaction {} has {} votes",
                message_id, reaction.reaction_type, votes
            );
            *counts
                .entry(normalize_emoji(&reaction.reaction_type.to_string()))
                .or_insert(0) += votes;
        }

        Ok(counts)
    }

    async fn exists(&self, channel_id: u64) -> Result<bool, Error> {
        match self.http.get_channel(ChannelId::new(channel_id)).await {
            Ok(_) => Ok(true),
            Err(e) => match classify(e, channel_id, None) {
                Error::ChannelNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }
}

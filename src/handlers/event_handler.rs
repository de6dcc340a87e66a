use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, FullEvent};
use tracing::{debug, error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::db::queries::server_config;
use crate::handlers::session;
use crate::services::sessions::manager::SessionKey;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Arc<Data>, Error>,
    data: &Arc<Data>,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            info!("Bot ready as {}", data_about_bot.user.name);
        }

        FullEvent::GuildCreate { guild, is_new } => {
            if is_new.unwrap_or(false) {
                info!("Joined guild {} ({})", guild.name, guild.id);
            }
            match server_config::get_or_create(&data.pool, guild.id.get() as i64).await {
                Ok(config) => data.cache_config(&config),
                Err(e) => warn!("Failed to register guild {}: {:?}", guild.id, e),
            }
        }

        FullEvent::Message { new_message } => {
            if new_message.author.bot || new_message.guild_id.is_none() {
                return Ok(());
            }

            let key = SessionKey::new(new_message.author.id.get(), new_message.channel_id.get());
            if data.sessions.find(key).is_none() {
                return Ok(());
            }

            debug!(
                "Message from {} belongs to an open session",
                new_message.author.id
            );

            let ctx = ctx.clone();
            let data = data.clone();
            let msg = new_message.clone();
            tokio::spawn(async move {
                if let Err(e) = session::handle_session_message(&ctx, &data, &msg, key).await {
                    error!("Session message handler error: {:?}", e);
                }
            });
        }

        FullEvent::GuildDelete { incomplete, .. } => {
            data.config_channels.remove(&incomplete.id.get());
            debug!("Guild {} removed", incomplete.id);
        }

        _ => {}
    }

    Ok(())
}

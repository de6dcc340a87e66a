use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use sqlx::PgPool;

use crate::config::Settings;
use crate::db::models::ServerConfig;
use crate::db::store::{EventStore, PgEventStore};
use crate::services::sessions::manager::SessionManager;

/// Shared data available to all commands and handlers
pub struct Data {
    pub pool: PgPool,
    pub settings: Settings,
    pub store: Arc<dyn EventStore>,
    /// In-progress event drafts, keyed by (user, channel)
    pub sessions: Arc<SessionManager>,
    /// Cache of guild_id -> config channel id
    pub config_channels: DashMap<u64, u64>,
}

impl Data {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let store = Arc::new(PgEventStore::new(pool.clone()));
        let sessions = Arc::new(SessionManager::new(settings.session_ttl()));

        Self {
            pool,
            settings,
            store,
            sessions,
            config_channels: DashMap::new(),
        }
    }

    /// Refresh the cache from a stored config row
    pub fn cache_config(&self, config: &ServerConfig) {
        let guild_id = config.guild_id as u64;
        match config.config_channel_id {
            Some(channel_id) => {
                self.config_channels.insert(guild_id, channel_id as u64);
            }
            None => {
                self.config_channels.remove(&guild_id);
            }
        }
    }

    pub fn config_channel(&self, guild_id: u64) -> Option<u64> {
        self.config_channels.get(&guild_id).map(|r| *r)
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("config_channels_count", &self.config_channels.len())
            .field("open_sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

pub type Context<'a> = poise::Context<'a, Arc<Data>, crate::bot::error::Error>;

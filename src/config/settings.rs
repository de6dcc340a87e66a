use std::env;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::constants::timeouts::{
    DEFAULT_COMPLETION_GRACE_SECONDS, DEFAULT_EVENT_UTC_OFFSET_HOURS, DEFAULT_MESSAGE_DELAY_MS,
    DEFAULT_SCHEDULER_TICK_SECONDS, DEFAULT_SESSION_SWEEP_SECONDS, DEFAULT_SESSION_TTL_SECONDS,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: Option<u64>,
    /// How often the phase scheduler scans for due transitions
    pub scheduler_tick_seconds: u64,
    /// How often expired conversations are swept
    pub session_sweep_seconds: u64,
    /// Idle window before a conversation expires
    pub session_ttl_seconds: u64,
    /// Minimum gap between outbound messages/reactions
    pub message_delay_ms: u64,
    /// How long a fully-posted event may linger before it is force-completed
    pub completion_grace_seconds: u64,
    /// UTC offset for dates typed without a zone
    pub event_utc_offset_hours: i32,
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| "DISCORD_TOKEN environment variable not set")?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable not set")?;

        let guild_id = env::var("GUILD_ID")
            .ok()
            .and_then(|s| s.parse::<u64>().ok());

        let event_utc_offset_hours = parse_or("EVENT_UTC_OFFSET_HOURS", DEFAULT_EVENT_UTC_OFFSET_HOURS);
        if !(-23..=23).contains(&event_utc_offset_hours) {
            return Err(format!(
                "EVENT_UTC_OFFSET_HOURS must be between -23 and 23, got {}",
                event_utc_offset_hours
            ));
        }

        Ok(Self {
            discord_token,
            database_url,
            guild_id,
            scheduler_tick_seconds: parse_or("SCHEDULER_TICK_SECONDS", DEFAULT_SCHEDULER_TICK_SECONDS),
            session_sweep_seconds: parse_or("SESSION_SWEEP_SECONDS", DEFAULT_SESSION_SWEEP_SECONDS),
            session_ttl_seconds: parse_or("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS),
            message_delay_ms: parse_or("MESSAGE_DELAY_MS", DEFAULT_MESSAGE_DELAY_MS),
            completion_grace_seconds: parse_or(
                "COMPLETION_GRACE_SECONDS",
                DEFAULT_COMPLETION_GRACE_SECONDS,
            ),
            event_utc_offset_hours,
        })
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_secs(self.scheduler_tick_seconds.max(1))
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_seconds.max(1))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn message_delay(&self) -> Duration {
        Duration::from_millis(self.message_delay_ms)
    }

    pub fn completion_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.completion_grace_seconds as i64)
    }

    /// Zone used to interpret dates typed without an explicit offset
    pub fn event_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.event_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

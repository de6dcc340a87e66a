use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServerConfig {
    pub guild_id: i64,
    /// Text channel where conversations with the bot happen
    pub config_channel_id: Option<i64>,
    /// Text channel where votes and reminders are announced
    pub output_channel_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

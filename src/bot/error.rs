use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord API error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Channel not found: {0}")]
    ChannelNotFound(u64),

    #[error("Message {message_id} not found in channel {channel_id}")]
    MessageNotFound { channel_id: u64, message_id: u64 },

    #[error("A session already exists for user {user_id} in channel {channel_id}")]
    DuplicateSession { user_id: u64, channel_id: u64 },

    #[error("Session expired or missing, please start again")]
    SessionExpired,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Error::Custom(msg.into())
    }

    /// True when the target channel or message is gone for good
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ChannelNotFound(_) | Error::MessageNotFound { .. }
        )
    }
}

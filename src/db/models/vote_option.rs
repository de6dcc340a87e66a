use chrono::{DateTime, Utc};

use crate::services::events::model::VoteOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "vote_track", rename_all = "lowercase")]
pub enum VoteTrack {
    Type,
    Time,
}

impl VoteTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteTrack::Type => "game type",
            VoteTrack::Time => "game time",
        }
    }
}

impl std::fmt::Display for VoteTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteOptionRow {
    pub option_id: i64,
    pub event_id: i64,
    pub track: VoteTrack,
    pub label: Option<String>,
    pub game_time: Option<DateTime<Utc>>,
    pub emoji: String,
    pub position: i32,
}

impl VoteOptionRow {
    /// Rows whose payload doesn't match their track are skipped
    pub fn to_option(&self) -> Option<VoteOption> {
        match self.track {
            VoteTrack::Type => self.label.clone().map(|label| VoteOption::Type {
                label,
                emoji: self.emoji.clone(),
            }),
            VoteTrack::Time => self.game_time.map(|at| VoteOption::Time {
                at,
                emoji: self.emoji.clone(),
            }),
        }
    }
}

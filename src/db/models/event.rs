use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::models::{VoteOptionRow, VoteTrack};
use crate::services::events::model::{Event, Vote, VoteOption};

/// Row of the `events` table joined with the server's output channel
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub event_id: i64,
    pub guild_id: i64,
    pub output_channel_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub type_vote_start: DateTime<Utc>,
    pub type_vote_end: DateTime<Utc>,
    pub type_start_posted: bool,
    pub type_end_posted: bool,
    pub type_message_id: Option<i64>,
    pub final_game_type: Option<String>,
    pub time_vote_start: DateTime<Utc>,
    pub time_vote_end: DateTime<Utc>,
    pub time_start_posted: bool,
    pub time_end_posted: bool,
    pub time_message_id: Option<i64>,
    pub final_game_time: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl EventRow {
    /// Assemble the domain event from this row and its option rows
    pub fn into_event(self, options: &[VoteOptionRow]) -> Event {
        let mut type_vote = Vote::new(self.type_vote_start, self.type_vote_end);
        type_vote.start_posted = self.type_start_posted;
        type_vote.end_posted = self.type_end_posted;
        type_vote.message_id = self.type_message_id.map(|id| id as u64);

        let mut time_vote = Vote::new(self.time_vote_start, self.time_vote_end);
        time_vote.start_posted = self.time_start_posted;
        time_vote.end_posted = self.time_end_posted;
        time_vote.message_id = self.time_message_id.map(|id| id as u64);

        for row in options.iter().filter(|o| o.event_id == self.event_id) {
            if let Some(option) = row.to_option() {
                match row.track {
                    VoteTrack::Type => type_vote.options.push(option),
                    VoteTrack::Time => time_vote.options.push(option),
                }
            }
        }

        type_vote.final_choice = self.final_game_type.map(|label| {
            let emoji = type_vote
                .options
                .iter()
                .find(|o| o.label() == Some(label.as_str()))
                .map(|o| o.emoji().to_string())
                .unwrap_or_default();
            VoteOption::Type { label, emoji }
        });

        time_vote.final_choice = self.final_game_time.map(|at| {
            let emoji = time_vote
                .options
                .iter()
                .find(|o| o.time() == Some(at))
                .map(|o| o.emoji().to_string())
                .unwrap_or_default();
            VoteOption::Time { at, emoji }
        });

        Event {
            id: self.event_id,
            server_id: self.guild_id,
            announcement_channel: self.output_channel_id.map(|id| id as u64),
            title: self.title,
            description: self.description,
            type_vote,
            time_vote,
            completed: self.completed,
        }
    }
}

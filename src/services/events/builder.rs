//! Conversational assembly of a new event.
//!
//! Each chat line in a create-event session is parsed into a
//! [`DraftCommand`]. Edits either change the draft or fail with a
//! [`DraftError`] and leave it exactly as it was.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::constants::defaults::{
    DATETIME_FORMATS, DEFAULT_GAME_TYPES, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
use crate::db::models::VoteTrack;
use crate::services::chat::normalize_emoji;
use crate::services::events::model::{Vote, VoteOption};

/// Which end of a voting window a date sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    Title(String),
    Description(String),
    AddOption(VoteOption),
    Window {
        track: VoteTrack,
        bound: WindowBound,
        at: DateTime<Utc>,
    },
    LoadDefaultTypes,
    Clear(VoteTrack),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftCommand {
    Edit(DraftEdit),
    Summary,
    Help,
    Save,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Invalid command. Please check your syntax and try again.")]
    UnknownCommand,

    #[error("The {field} can be at most {max} characters long.")]
    TooLong { field: &'static str, max: usize },

    #[error("I didn't understand the date/time `{0}`. Use a format like 2024-06-21 21:00.")]
    InvalidDateTime(String),

    #[error("An emoji is required for the voting process. Please add one and try again.")]
    MissingEmoji(VoteTrack),

    #[error("I didn't understand that {0} format. Use `{0} = value, emoji`.")]
    MalformedOption(VoteTrack),

    #[error("Sorry, {track} emojis must be unique. {emoji} is already used.")]
    DuplicateEmoji { track: VoteTrack, emoji: String },

    #[error("Sorry, one of the default game type emojis is already used. Remove it and load the defaults again.")]
    DefaultEmojiConflict,

    #[error("Please specify at least one game type and try again.")]
    NoTypeOptions,

    #[error("Please specify at least one game time and try again.")]
    NoTimeOptions,

    #[error("Please set both the {0} vote start and end times.")]
    MissingWindow(VoteTrack),

    #[error("The {0} vote must end after it starts. Please check the times and try again.")]
    WindowOrder(VoteTrack),
}

/// Validated draft, ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub type_vote: Vote,
    pub time_vote: Vote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub type_options: Vec<VoteOption>,
    pub time_options: Vec<VoteOption>,
    pub type_vote_start: Option<DateTime<Utc>>,
    pub type_vote_end: Option<DateTime<Utc>>,
    pub time_vote_start: Option<DateTime<Utc>>,
    pub time_vote_end: Option<DateTime<Utc>>,
}

impl EventDraft {
    pub fn options(&self, track: VoteTrack) -> &[VoteOption] {
        match track {
            VoteTrack::Type => &self.type_options,
            VoteTrack::Time => &self.time_options,
        }
    }

    fn options_mut(&mut self, track: VoteTrack) -> &mut Vec<VoteOption> {
        match track {
            VoteTrack::Type => &mut self.type_options,
            VoteTrack::Time => &mut self.time_options,
        }
    }

    fn has_emoji(&self, track: VoteTrack, emoji: &str) -> bool {
        let wanted = normalize_emoji(emoji);
        self.options(track)
            .iter()
            .any(|o| normalize_emoji(o.emoji()) == wanted)
    }

    pub fn window(&self, track: VoteTrack) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match track {
            VoteTrack::Type => (self.type_vote_start, self.type_vote_end),
            VoteTrack::Time => (self.time_vote_start, self.time_vote_end),
        }
    }

    /// Apply one edit; on error the draft is unchanged
    pub fn apply(&mut self, edit: DraftEdit) -> Result<String, DraftError> {
        match edit {
            DraftEdit::Title(title) => {
                check_len("title", &title, MAX_TITLE_LEN)?;
                self.title = title;
                Ok("Title set.".to_string())
            }
            DraftEdit::Description(description) => {
                check_len("description", &description, MAX_DESCRIPTION_LEN)?;
                self.description = description;
                Ok("Description set.".to_string())
            }
            DraftEdit::AddOption(option) => {
                let track = option.track();
                if self.has_emoji(track, option.emoji()) {
                    return Err(DraftError::DuplicateEmoji {
                        track,
                        emoji: option.emoji().to_string(),
                    });
                }
                self.options_mut(track).push(option);
                Ok(format!(
                    "Added {} option ({} total).",
                    track,
                    self.options(track).len()
                ))
            }
            DraftEdit::Window { track, bound, at } => {
                let slot = match (track, bound) {
                    (VoteTrack::Type, WindowBound::Start) => &mut self.type_vote_start,
                    (VoteTrack::Type, WindowBound::End) => &mut self.type_vote_end,
                    (VoteTrack::Time, WindowBound::Start) => &mut self.time_vote_start,
                    (VoteTrack::Time, WindowBound::End) => &mut self.time_vote_end,
                };
                *slot = Some(at);
                let which = match bound {
                    WindowBound::Start => "start",
                    WindowBound::End => "end",
                };
                Ok(format!("The {} vote {} time is set.", track, which))
            }
            DraftEdit::LoadDefaultTypes => {
                if DEFAULT_GAME_TYPES
                    .iter()
                    .any(|(_, emoji)| self.has_emoji(VoteTrack::Type, emoji))
                {
                    return Err(DraftError::DefaultEmojiConflict);
                }
                self.type_options
                    .extend(DEFAULT_GAME_TYPES.iter().map(|(label, emoji)| VoteOption::Type {
                        label: label.to_string(),
                        emoji: emoji.to_string(),
                    }));
                Ok("Default game types successfully added.".to_string())
            }
            DraftEdit::Clear(track) => {
                self.options_mut(track).clear();
                Ok(format!("The {}s have been cleared.", track))
            }
        }
    }

    /// Check the draft is complete and build the event to insert
    pub fn validate(&self) -> Result<NewEvent, DraftError> {
        if self.type_options.is_empty() {
            return Err(DraftError::NoTypeOptions);
        }
        if self.time_options.is_empty() {
            return Err(DraftError::NoTimeOptions);
        }

        let type_vote = self.build_vote(VoteTrack::Type)?;
        let time_vote = self.build_vote(VoteTrack::Time)?;

        Ok(NewEvent {
            title: self.title.clone(),
            description: self.description.clone(),
            type_vote,
            time_vote,
        })
    }

    fn build_vote(&self, track: VoteTrack) -> Result<Vote, DraftError> {
        let (start, end) = match self.window(track) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(DraftError::MissingWindow(track)),
        };
        if end <= start {
            return Err(DraftError::WindowOrder(track));
        }

        let mut vote = Vote::new(start, end);
        vote.options = self.options(track).to_vec();
        Ok(vote)
    }
}

impl DraftCommand {
    /// Parse one chat line. `offset` applies to dates without a zone.
    pub fn parse(text: &str, offset: FixedOffset) -> Result<Self, DraftError> {
        let (key, value) = match text.split_once('=') {
            Some((key, value)) => (normalize_key(key), Some(value.trim())),
            None => (normalize_key(text), None),
        };

        let Some(value) = value else {
            return match key.as_str() {
                "save" => Ok(DraftCommand::Save),
                "summary" => Ok(DraftCommand::Summary),
                "help" => Ok(DraftCommand::Help),
                "quit" | "exit" | "cancel" => Ok(DraftCommand::Quit),
                "load default game types" => Ok(DraftCommand::Edit(DraftEdit::LoadDefaultTypes)),
                "clear game types" => Ok(DraftCommand::Edit(DraftEdit::Clear(VoteTrack::Type))),
                "clear game times" => Ok(DraftCommand::Edit(DraftEdit::Clear(VoteTrack::Time))),
                _ => Err(DraftError::UnknownCommand),
            };
        };

        let edit = match key.as_str() {
            "title" => DraftEdit::Title(value.to_string()),
            "description" => DraftEdit::Description(value.to_string()),
            "game type" => {
                let (label, emoji) = split_option(value, VoteTrack::Type)?;
                DraftEdit::AddOption(VoteOption::Type {
                    label: label.to_string(),
                    emoji: emoji.to_string(),
                })
            }
            "game time" => {
                let (when, emoji) = split_option(value, VoteTrack::Time)?;
                DraftEdit::AddOption(VoteOption::Time {
                    at: parse_datetime(when, offset)?,
                    emoji: emoji.to_string(),
                })
            }
            "game type vote start" => window(VoteTrack::Type, WindowBound::Start, value, offset)?,
            "game type vote end" => window(VoteTrack::Type, WindowBound::End, value, offset)?,
            "game time vote start" => window(VoteTrack::Time, WindowBound::Start, value, offset)?,
            "game time vote end" => window(VoteTrack::Time, WindowBound::End, value, offset)?,
            _ => return Err(DraftError::UnknownCommand),
        };

        Ok(DraftCommand::Edit(edit))
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), DraftError> {
    if value.chars().count() > max {
        return Err(DraftError::TooLong { field, max });
    }
    Ok(())
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn window(
    track: VoteTrack,
    bound: WindowBound,
    value: &str,
    offset: FixedOffset,
) -> Result<DraftEdit, DraftError> {
    Ok(DraftEdit::Window {
        track,
        bound,
        at: parse_datetime(value, offset)?,
    })
}

/// Split `value, emoji`
fn split_option(value: &str, track: VoteTrack) -> Result<(&str, &str), DraftError> {
    if !value.contains(',') {
        return Err(DraftError::MissingEmoji(track));
    }

    let parts: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [payload, emoji] => Ok((*payload, *emoji)),
        _ => Err(DraftError::MalformedOption(track)),
    }
}

/// Parse an RFC 3339 timestamp, or a local date/time in `offset`
pub fn parse_datetime(value: &str, offset: FixedOffset) -> Result<DateTime<Utc>, DraftError> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| DraftError::InvalidDateTime(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn edit(draft: &mut EventDraft, line: &str) -> Result<String, DraftError> {
        match DraftCommand::parse(line, utc())? {
            DraftCommand::Edit(e) => draft.apply(e),
            other => panic!("expected an edit, got {:?}", other),
        }
    }

    fn complete_draft() -> EventDraft {
        let mut draft = EventDraft::default();
        edit(&mut draft, "Title = Friday Customs").unwrap();
        edit(&mut draft, "Description = Bring snacks").unwrap();
        edit(&mut draft, "Game Type = Hide and Seek, 🙂").unwrap();
        edit(&mut draft, "Game Type = Normal VS, 😎").unwrap();
        edit(&mut draft, "game time = 2030-06-21 21:00, 🕘").unwrap();
        edit(&mut draft, "Game Type Vote Start = 2030-06-01 12:00").unwrap();
        edit(&mut draft, "Game Type Vote End = 2030-06-02 12:00").unwrap();
        edit(&mut draft, "Game Time Vote Start = 2030-06-03 12:00").unwrap();
        edit(&mut draft, "Game Time Vote End = 2030-06-04 12:00").unwrap();
        draft
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(DraftCommand::parse(" Save ", utc()), Ok(DraftCommand::Save));
        assert_eq!(DraftCommand::parse("summary", utc()), Ok(DraftCommand::Summary));
        assert_eq!(DraftCommand::parse("HELP", utc()), Ok(DraftCommand::Help));
        for quit in ["quit", "exit", "Cancel"] {
            assert_eq!(DraftCommand::parse(quit, utc()), Ok(DraftCommand::Quit));
        }
        assert_eq!(
            DraftCommand::parse("Clear  Game   Times", utc()),
            Ok(DraftCommand::Edit(DraftEdit::Clear(VoteTrack::Time)))
        );
        assert_eq!(DraftCommand::parse("dance", utc()), Err(DraftError::UnknownCommand));
        assert_eq!(DraftCommand::parse("colour = red", utc()), Err(DraftError::UnknownCommand));
    }

    #[test]
    fn test_value_keeps_later_equals_signs() {
        let cmd = DraftCommand::parse("title = 1 + 1 = 2", utc()).unwrap();
        assert_eq!(cmd, DraftCommand::Edit(DraftEdit::Title("1 + 1 = 2".to_string())));
    }

    #[test]
    fn test_option_parsing_errors() {
        assert_eq!(
            DraftCommand::parse("game type = Hide and Seek", utc()),
            Err(DraftError::MissingEmoji(VoteTrack::Type))
        );
        assert_eq!(
            DraftCommand::parse("game type = a, b, c", utc()),
            Err(DraftError::MalformedOption(VoteTrack::Type))
        );
        assert_eq!(
            DraftCommand::parse("game type = , 🙂", utc()),
            Err(DraftError::MalformedOption(VoteTrack::Type))
        );
        assert_eq!(
            DraftCommand::parse("game time = next friday, 🙂", utc()),
            Err(DraftError::InvalidDateTime("next friday".to_string()))
        );
    }

    #[test]
    fn test_datetime_formats_and_offset() {
        let expected = Utc.with_ymd_and_hms(2030, 6, 21, 21, 6, 0).unwrap();
        assert_eq!(parse_datetime("2030-06-21 21:06:00", utc()), Ok(expected));
        assert_eq!(parse_datetime("2030-06-21 21:06", utc()), Ok(expected));
        assert_eq!(parse_datetime("2030/06/21 21:06", utc()), Ok(expected));
        assert_eq!(parse_datetime("2030-06-21T21:06:00Z", utc()), Ok(expected));

        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(
            parse_datetime("2030-06-21 13:06", pst),
            Ok(expected),
            "13:06 at UTC-8 is 21:06 UTC"
        );
    }

    #[test]
    fn test_duplicate_emoji_leaves_draft_unchanged() {
        let mut draft = EventDraft::default();
        edit(&mut draft, "game type = Hide and Seek, 🙂").unwrap();
        let before = draft.clone();

        let err = edit(&mut draft, "game type = Normal VS, 🙂").unwrap_err();
        assert_eq!(
            err,
            DraftError::DuplicateEmoji { track: VoteTrack::Type, emoji: "🙂".to_string() }
        );
        assert_eq!(draft, before);

        // The same emoji is fine on the other track
        assert!(edit(&mut draft, "game time = 2030-01-01 20:00, 🙂").is_ok());
    }

    #[test]
    fn test_overlong_text_is_rejected() {
        let mut draft = complete_draft();
        let before = draft.clone();

        let title = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            edit(&mut draft, &format!("title = {}", title)),
            Err(DraftError::TooLong { field: "title", max: MAX_TITLE_LEN })
        );
        let description = "🎮".repeat(MAX_DESCRIPTION_LEN + 1);
        assert_eq!(
            edit(&mut draft, &format!("description = {}", description)),
            Err(DraftError::TooLong { field: "description", max: MAX_DESCRIPTION_LEN })
        );
        assert_eq!(draft, before);

        // Exactly at the limit is fine, counted in characters
        let description = "🎮".repeat(MAX_DESCRIPTION_LEN);
        assert!(edit(&mut draft, &format!("description = {}", description)).is_ok());
    }

    #[test]
    fn test_load_defaults() {
        let mut draft = EventDraft::default();
        draft.apply(DraftEdit::LoadDefaultTypes).unwrap();
        assert_eq!(draft.type_options.len(), DEFAULT_GAME_TYPES.len());

        // Second load collides with itself and adds nothing
        let before = draft.clone();
        assert_eq!(
            draft.apply(DraftEdit::LoadDefaultTypes),
            Err(DraftError::DefaultEmojiConflict)
        );
        assert_eq!(draft, before);

        draft.apply(DraftEdit::Clear(VoteTrack::Type)).unwrap();
        assert!(draft.type_options.is_empty());
    }

    #[test]
    fn test_validate_complete_draft() {
        let draft = complete_draft();
        let event = draft.validate().unwrap();

        assert_eq!(event.title, "Friday Customs");
        assert_eq!(event.type_vote.options.len(), 2);
        assert_eq!(event.time_vote.options.len(), 1);
        assert!(event.type_vote.end_at > event.type_vote.start_at);
        assert!(!event.type_vote.start_posted && !event.time_vote.end_posted);
        assert!(event.type_vote.final_choice.is_none());
    }

    #[test]
    fn test_validate_needs_time_option_and_stays_editable() {
        let mut draft = complete_draft();
        draft.apply(DraftEdit::Clear(VoteTrack::Time)).unwrap();
        let before = draft.clone();

        assert_eq!(draft.validate(), Err(DraftError::NoTimeOptions));
        assert_eq!(draft, before);

        edit(&mut draft, "game time = 2030-06-22 21:00, 🕙").unwrap();
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_validate_needs_type_option() {
        let mut draft = complete_draft();
        draft.apply(DraftEdit::Clear(VoteTrack::Type)).unwrap();
        assert_eq!(draft.validate(), Err(DraftError::NoTypeOptions));
    }

    #[test]
    fn test_validate_window_order() {
        let mut draft = complete_draft();
        let start = draft.type_vote_start.unwrap();
        draft.type_vote_end = Some(start);
        assert_eq!(draft.validate(), Err(DraftError::WindowOrder(VoteTrack::Type)));

        let mut draft = complete_draft();
        draft.time_vote_end = draft.time_vote_start.map(|s| s - Duration::minutes(1));
        assert_eq!(draft.validate(), Err(DraftError::WindowOrder(VoteTrack::Time)));

        let mut draft = complete_draft();
        draft.time_vote_start = None;
        assert_eq!(draft.validate(), Err(DraftError::MissingWindow(VoteTrack::Time)));
    }
}

//! Text of everything the bot posts about an event.

use std::fmt::Write;

use crate::constants::embeds::MAX_MESSAGE_LEN;
use crate::db::models::VoteTrack;
use crate::services::events::builder::EventDraft;
use crate::services::events::model::{Event, VoteOption};
use crate::utils::formatting::{or_none, relative_timestamp, timestamp, truncate};

const RULE: &str = "========================================";

pub const TIE_NOTICE: &str =
    "Looks like we have a tie! I'll roll the (totally random) dice and pick one at random!";

pub const HELP_MESSAGE: &str = "\
**Game night scheduling bot**
`/events create` start building a new event in the config channel.
`/events list` list the events of this server that haven't finished.
`/setup config-channel` use the current channel for event building.
`/setup output-channel` choose where announcements and votes are posted.
`/help` show this message.";

pub const CREATE_EVENT_HELP: &str = "\
Creating a new event. Enter each field as the field name, an equals sign `=`, then the value.
Game types and game times also need an emoji for the voting button, e.g. `Game Type = Hide and Seek, 🏅`.
Dates look like `2030-06-21 21:06` or `2030-06-21T21:06:00Z`.

```
Title = ...
Description = ...

Game Type = label, emoji
Game Type Vote Start = date
Game Type Vote End = date
Load Default Game Types
Clear Game Types

Game Time = date, emoji
Game Time Vote Start = date
Game Time Vote End = date
Clear Game Times

Summary
Help
Save
Quit
```";

fn header(out: &mut String, banner: &str, event: &Event) {
    let _ = writeln!(out, "**{}**", banner);
    let _ = writeln!(out, "{}", event.title);
    if !event.description.trim().is_empty() {
        let _ = writeln!(out, "{}", event.description);
    }
    let _ = writeln!(out, "{}", RULE);
}

fn option_line(option: &VoteOption) -> String {
    match option {
        VoteOption::Type { label, emoji } => format!("{} - {}", label, emoji),
        VoteOption::Time { at, emoji } => format!("{} - {}", timestamp(*at), emoji),
    }
}

/// Poll opening message; the reaction buttons are added to it afterwards
pub fn vote_started(event: &Event, track: VoteTrack) -> String {
    let vote = event.vote(track);
    let mut out = String::new();

    header(&mut out, "NEW CUSTOM GAME EVENT TO VOTE ON!", event);
    if let (VoteTrack::Time, Some(game_type)) = (track, event.final_game_type()) {
        let _ = writeln!(out, "We're playing: {}", game_type);
    }
    let _ = writeln!(
        out,
        "Vote on your preferred {} by clicking on the emoji below!",
        track
    );
    let _ = writeln!(
        out,
        "Voting closes {} ({})",
        timestamp(vote.end_at),
        relative_timestamp(vote.end_at)
    );
    let _ = writeln!(out);
    for option in &vote.options {
        let _ = writeln!(out, "{}", option_line(option));
    }

    truncate(out.trim_end(), MAX_MESSAGE_LEN)
}

/// Result of a closed poll
pub fn vote_result(event: &Event, winner: &VoteOption) -> String {
    let mut out = String::new();

    match winner {
        VoteOption::Type { label, .. } => {
            header(&mut out, "NEW CUSTOM GAME EVENT CHOSEN!", event);
            let _ = writeln!(out, "After tallying up the votes, this event will be: {}!", label);
            let _ = write!(
                out,
                "Stay tuned, we will vote on when it takes place on {}",
                timestamp(event.time_vote.start_at)
            );
        }
        VoteOption::Time { at, .. } => {
            header(&mut out, "NEW CUSTOM GAME TIME CHOSEN!", event);
            let _ = write!(
                out,
                "After tallying up the votes, this event will take place on {}",
                timestamp(*at)
            );
        }
    }

    truncate(&out, MAX_MESSAGE_LEN)
}

/// Posted once the chosen game time arrives
pub fn final_reminder(event: &Event) -> String {
    let mut out = String::new();
    header(&mut out, "ATTENTION EVERYONE! IT'S TIME FOR A CUSTOM GAME!", event);
    let _ = write!(
        out,
        "We're playing: {}, good luck everyone!",
        event.final_game_type().unwrap_or("a custom game")
    );
    truncate(&out, MAX_MESSAGE_LEN)
}

/// Current state of a draft, shown on `summary`
pub fn draft_summary(draft: &EventDraft) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "**Title:** {}", or_none(&draft.title));
    let _ = writeln!(out, "**Description:** {}", or_none(&draft.description));

    for track in [VoteTrack::Type, VoteTrack::Time] {
        let _ = writeln!(out);
        let _ = writeln!(out, "**Possible {}s:**", track);
        let options = draft.options(track);
        if options.is_empty() {
            let _ = writeln!(out, "*none*");
        }
        for option in options {
            let _ = writeln!(out, "{}", option_line(option));
        }

        let (start, end) = draft.window(track);
        let show = |at: Option<_>| at.map(timestamp).unwrap_or_else(|| "*not set*".to_string());
        let _ = writeln!(out, "{} vote start: {}", track, show(start));
        let _ = writeln!(out, "{} vote end: {}", track, show(end));
    }

    out.trim_end().to_string()
}

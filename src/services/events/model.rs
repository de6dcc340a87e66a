use chrono::{DateTime, Utc};

use crate::db::models::VoteTrack;
use crate::services::scheduler::phase::{Phase, Transition};

/// A single candidate in a vote, identified within its vote by its emoji
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOption {
    Type { label: String, emoji: String },
    Time { at: DateTime<Utc>, emoji: String },
}

impl VoteOption {
    pub fn emoji(&self) -> &str {
        match self {
            VoteOption::Type { emoji, .. } | VoteOption::Time { emoji, .. } => emoji,
        }
    }

    pub fn track(&self) -> VoteTrack {
        match self {
            VoteOption::Type { .. } => VoteTrack::Type,
            VoteOption::Time { .. } => VoteTrack::Time,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            VoteOption::Type { label, .. } => Some(label),
            VoteOption::Time { .. } => None,
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            VoteOption::Time { at, .. } => Some(*at),
            VoteOption::Type { .. } => None,
        }
    }
}

/// One of the two reaction polls an event runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub options: Vec<VoteOption>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub start_posted: bool,
    pub end_posted: bool,
    /// Poll message carrying the reaction buttons
    pub message_id: Option<u64>,
    pub final_choice: Option<VoteOption>,
}

impl Vote {
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            options: Vec::new(),
            start_at,
            end_at,
            start_posted: false,
            end_posted: false,
            message_id: None,
            final_choice: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub server_id: i64,
    /// Output channel of the owning server, if one is configured
    pub announcement_channel: Option<u64>,
    pub title: String,
    pub description: String,
    pub type_vote: Vote,
    pub time_vote: Vote,
    pub completed: bool,
}

impl Event {
    pub fn vote(&self, track: VoteTrack) -> &Vote {
        match track {
            VoteTrack::Type => &self.type_vote,
            VoteTrack::Time => &self.time_vote,
        }
    }

    pub fn vote_mut(&mut self, track: VoteTrack) -> &mut Vote {
        match track {
            VoteTrack::Type => &mut self.type_vote,
            VoteTrack::Time => &mut self.time_vote,
        }
    }

    pub fn final_game_type(&self) -> Option<&str> {
        self.type_vote.final_choice.as_ref().and_then(|c| c.label())
    }

    pub fn final_game_time(&self) -> Option<DateTime<Utc>> {
        self.time_vote.final_choice.as_ref().and_then(|c| c.time())
    }

    /// Current phase, derived from the persisted flags
    pub fn phase(&self) -> Phase {
        if self.completed {
            Phase::Completed
        } else if self.time_vote.end_posted {
            Phase::TimeVoteClosed
        } else if self.time_vote.start_posted {
            Phase::TimeVoteOpen
        } else if self.type_vote.end_posted {
            Phase::TypeVoteClosed
        } else if self.type_vote.start_posted {
            Phase::TypeVoteOpen
        } else {
            Phase::TypeVotePending
        }
    }

    /// Whether `transition` should be applied to this event at `now`.
    ///
    /// Mirrors the filters the Postgres store puts in its queries.
    pub fn is_due(&self, transition: Transition, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }

        match transition {
            Transition::StartVote(track) => {
                let vote = self.vote(track);
                let gated = match track {
                    VoteTrack::Type => true,
                    VoteTrack::Time => self.type_vote.end_posted,
                };
                gated && !vote.start_posted && vote.start_at <= now
            }
            Transition::EndVote(track) => {
                let vote = self.vote(track);
                vote.start_posted && !vote.end_posted && vote.end_at <= now
            }
            Transition::Final => {
                self.time_vote.end_posted
                    && self.final_game_time().map(|t| t <= now).unwrap_or(false)
            }
        }
    }

    /// Whether the completion sweep should force this event closed
    pub fn is_lingering(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        !self.completed
            && self.type_vote.start_posted
            && self.type_vote.end_posted
            && self.time_vote.start_posted
            && self.time_vote.end_posted
            && self
                .final_game_time()
                .map(|t| t + grace < now)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_event;
    use chrono::Duration;

    #[test]
    fn test_phase_follows_flags() {
        let now = Utc::now();
        let mut event = sample_event(1, now);
        assert_eq!(event.phase(), Phase::TypeVotePending);

        event.type_vote.start_posted = true;
        assert_eq!(event.phase(), Phase::TypeVoteOpen);
        event.type_vote.end_posted = true;
        assert_eq!(event.phase(), Phase::TypeVoteClosed);
        event.time_vote.start_posted = true;
        assert_eq!(event.phase(), Phase::TimeVoteOpen);
        event.time_vote.end_posted = true;
        assert_eq!(event.phase(), Phase::TimeVoteClosed);
        event.completed = true;
        assert_eq!(event.phase(), Phase::Completed);
    }

    #[test]
    fn test_start_not_due_twice() {
        let now = Utc::now();
        let mut event = sample_event(1, now - Duration::hours(1));
        assert!(event.is_due(Transition::StartVote(VoteTrack::Type), now));

        event.type_vote.start_posted = true;
        assert!(!event.is_due(Transition::StartVote(VoteTrack::Type), now));
    }

    #[test]
    fn test_time_vote_waits_for_type_close() {
        let now = Utc::now();
        // Every window is already in the past
        let mut event = sample_event(1, now - Duration::days(10));
        event.type_vote.start_posted = true;

        assert!(!event.is_due(Transition::StartVote(VoteTrack::Time), now));
        event.type_vote.end_posted = true;
        assert!(event.is_due(Transition::StartVote(VoteTrack::Time), now));
    }

    #[test]
    fn test_end_requires_start() {
        let now = Utc::now();
        let mut event = sample_event(1, now - Duration::days(10));
        assert!(!event.is_due(Transition::EndVote(VoteTrack::Type), now));
        event.type_vote.start_posted = true;
        assert!(event.is_due(Transition::EndVote(VoteTrack::Type), now));
    }

    #[test]
    fn test_completed_never_due() {
        let now = Utc::now();
        let mut event = sample_event(1, now - Duration::days(10));
        event.completed = true;
        assert!(!event.is_due(Transition::StartVote(VoteTrack::Type), now));
        assert!(!event.is_due(Transition::Final, now));
    }

    #[test]
    fn test_final_due_after_chosen_time() {
        let now = Utc::now();
        let mut event = sample_event(1, now - Duration::days(10));
        event.type_vote.start_posted = true;
        event.type_vote.end_posted = true;
        event.time_vote.start_posted = true;
        event.time_vote.end_posted = true;
        event.time_vote.final_choice = Some(VoteOption::Time {
            at: now + Duration::minutes(5),
            emoji: "🕗".to_string(),
        });
        assert!(!event.is_due(Transition::Final, now));
        assert!(event.is_due(Transition::Final, now + Duration::minutes(6)));
    }

    #[test]
    fn test_lingering_after_grace() {
        let now = Utc::now();
        let grace = Duration::hours(1);
        let mut event = sample_event(1, now - Duration::days(10));
        event.type_vote.start_posted = true;
        event.type_vote.end_posted = true;
        event.time_vote.start_posted = true;
        event.time_vote.end_posted = true;
        event.time_vote.final_choice = Some(VoteOption::Time {
            at: now - Duration::minutes(30),
            emoji: "🕗".to_string(),
        });
        assert!(!event.is_lingering(now, grace));

        event.time_vote.final_choice = Some(VoteOption::Time {
            at: now - Duration::minutes(90),
            emoji: "🕗".to_string(),
        });
        assert!(event.is_lingering(now, grace));
    }

    #[test]
    fn test_option_accessors() {
        let at = Utc::now();
        let ty = VoteOption::Type { label: "Hide and Seek".into(), emoji: "🏅".into() };
        let tm = VoteOption::Time { at, emoji: "🕗".into() };
        assert_eq!(ty.emoji(), "🏅");
        assert_eq!(ty.label(), Some("Hide and Seek"));
        assert_eq!(ty.track(), VoteTrack::Type);
        assert_eq!(tm.time(), Some(at));
        assert_eq!(tm.label(), None);
        assert_eq!(tm.track(), VoteTrack::Time);
    }
}

use std::fmt;

use crate::db::models::VoteTrack;

/// Lifecycle of an event. Strictly forward, never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    TypeVotePending,
    TypeVoteOpen,
    TypeVoteClosed,
    TimeVoteOpen,
    TimeVoteClosed,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::TypeVotePending => "type vote pending",
            Phase::TypeVoteOpen => "type vote open",
            Phase::TypeVoteClosed => "type vote closed",
            Phase::TimeVoteOpen => "time vote open",
            Phase::TimeVoteClosed => "time vote closed",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A phase boundary the scheduler can cross
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    StartVote(VoteTrack),
    EndVote(VoteTrack),
    Final,
}

impl Transition {
    /// Order in which one tick processes the boundaries
    pub const TICK_ORDER: [Transition; 5] = [
        Transition::StartVote(VoteTrack::Type),
        Transition::EndVote(VoteTrack::Type),
        Transition::StartVote(VoteTrack::Time),
        Transition::EndVote(VoteTrack::Time),
        Transition::Final,
    ];

    /// Phase an event is in once this transition has been applied
    pub fn target(&self) -> Phase {
        match self {
            Transition::StartVote(VoteTrack::Type) => Phase::TypeVoteOpen,
            Transition::EndVote(VoteTrack::Type) => Phase::TypeVoteClosed,
            Transition::StartVote(VoteTrack::Time) => Phase::TimeVoteOpen,
            Transition::EndVote(VoteTrack::Time) => Phase::TimeVoteClosed,
            Transition::Final => Phase::Completed,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::StartVote(track) => write!(f, "{} vote start", track),
            Transition::EndVote(track) => write!(f, "{} vote end", track),
            Transition::Final => write!(f, "final announcement"),
        }
    }
}

/// Persisted "posted" flags. Each only ever goes false -> true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseFlag {
    StartPosted(VoteTrack),
    EndPosted(VoteTrack),
}

impl PhaseFlag {
    pub fn column(&self) -> &'static str {
        match self {
            PhaseFlag::StartPosted(VoteTrack::Type) => "type_start_posted",
            PhaseFlag::EndPosted(VoteTrack::Type) => "type_end_posted",
            PhaseFlag::StartPosted(VoteTrack::Time) => "time_start_posted",
            PhaseFlag::EndPosted(VoteTrack::Time) => "time_end_posted",
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bot::error::Error;
use crate::constants::timeouts::format_duration;
use crate::db::models::VoteTrack;
use crate::db::store::EventStore;
use crate::services::chat::{normalize_emoji, ChatChannel};
use crate::services::events::announcements::{self, TIE_NOTICE};
use crate::services::events::model::Event;
use crate::services::scheduler::phase::{PhaseFlag, Transition};
use crate::services::voting::tally::pick_winner;

/// What happened to one event during a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    /// Nothing to do yet, retried next tick
    Skipped,
    /// Poll message or channel is gone; the event was closed
    Dangling,
    /// Announced, but the store write hit no row
    Unsaved,
}

/// Counters for one scheduler tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub started: usize,
    pub closed: usize,
    pub finalized: usize,
    pub dangling: usize,
    pub swept: u64,
    pub failed: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == TickReport::default()
    }
}

/// Drives events through their phases, one tick at a time
pub struct PhaseScheduler {
    store: Arc<dyn EventStore>,
    chat: Arc<dyn ChatChannel>,
    rng: StdRng,
    grace: chrono::Duration,
}

impl PhaseScheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        chat: Arc<dyn ChatChannel>,
        grace: chrono::Duration,
    ) -> Self {
        Self::with_rng(store, chat, grace, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn EventStore>,
        chat: Arc<dyn ChatChannel>,
        grace: chrono::Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            chat,
            rng,
            grace,
        }
    }

    /// Run every due transition, then the completion sweep.
    ///
    /// Failures are logged and counted; nothing here aborts the tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for transition in Transition::TICK_ORDER {
            let due = match self.store.find_due_transitions(transition, now).await {
                Ok(due) => due,
                Err(e) => {
                    error!("Failed to load events due for {}: {:?}", transition, e);
                    report.failed += 1;
                    continue;
                }
            };

            for event in due {
                let result = match transition {
                    Transition::StartVote(track) => self.start_vote(&event, track).await,
                    Transition::EndVote(track) => self.end_vote(&event, track).await,
                    Transition::Final => self.announce_final(&event).await,
                };

                match result {
                    Ok(Outcome::Applied) => {
                        debug!("Event {} entered {}", event.id, transition.target());
                        match transition {
                            Transition::StartVote(_) => report.started += 1,
                            Transition::EndVote(_) => report.closed += 1,
                            Transition::Final => report.finalized += 1,
                        }
                    }
                    Ok(Outcome::Skipped) => {}
                    Ok(Outcome::Dangling) => report.dangling += 1,
                    Ok(Outcome::Unsaved) => {
                        warn!(
                            "Event {} {} was posted but not saved, will retry",
                            event.id, transition
                        );
                        report.failed += 1;
                    }
                    Err(e) => {
                        error!("Event {} {} failed: {:?}", event.id, transition, e);
                        report.failed += 1;
                    }
                }
            }
        }

        match self.store.sweep_completed(now, self.grace).await {
            Ok(0) => {}
            Ok(swept) => {
                info!("Marked {} finished events as completed", swept);
                report.swept = swept;
            }
            Err(e) => {
                error!("Completion sweep failed: {:?}", e);
                report.failed += 1;
            }
        }

        report
    }

    async fn start_vote(&mut self, event: &Event, track: VoteTrack) -> Result<Outcome, Error> {
        let Some(channel_id) = event.announcement_channel else {
            debug!("Event {} has no output channel yet", event.id);
            return Ok(Outcome::Skipped);
        };

        let text = announcements::vote_started(event, track);
        let message_id = self.chat.post(channel_id, &text).await?;

        for option in &event.vote(track).options {
            if let Err(e) = self
                .chat
                .add_reaction_option(channel_id, message_id, option.emoji())
                .await
            {
                warn!(
                    "Could not add {} to poll {} of event {}: {:?}",
                    option.emoji(),
                    message_id,
                    event.id,
                    e
                );
            }
        }

        let saved = self
            .store
            .save_flag(event.id, PhaseFlag::StartPosted(track), Some(message_id))
            .await?;

        if saved {
            info!("Opened {} vote for event {}", track, event.id);
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Unsaved)
        }
    }

    async fn end_vote(&mut self, event: &Event, track: VoteTrack) -> Result<Outcome, Error> {
        let vote = event.vote(track);
        let (Some(channel_id), Some(message_id)) = (event.announcement_channel, vote.message_id)
        else {
            return self.abandon(event, track).await;
        };

        // A channel the bot can no longer see is as good as deleted
        if !self.chat.exists(channel_id).await? {
            return self.abandon(event, track).await;
        }

        let counts = match self.chat.reaction_counts(channel_id, message_id).await {
            Ok(counts) => counts,
            Err(e) if e.is_not_found() => return self.abandon(event, track).await,
            Err(e) => return Err(e),
        };

        // Only the event's own options can win; reactions nobody offered are ignored
        let tally: Vec<_> = vote
            .options
            .iter()
            .map(|option| {
                let votes = counts
                    .get(&normalize_emoji(option.emoji()))
                    .copied()
                    .unwrap_or(0);
                (option.clone(), votes)
            })
            .collect();

        let mut tied = false;
        let Some(winner) = pick_winner(&tally, &mut self.rng, |_| tied = true) else {
            return self.abandon(event, track).await;
        };

        if tied {
            self.chat.post(channel_id, TIE_NOTICE).await?;
        }
        self.chat
            .post(channel_id, &announcements::vote_result(event, &winner))
            .await?;

        if self.store.save_final_choice(event.id, &winner).await? {
            info!("Closed {} vote for event {}: {:?}", track, event.id, winner);
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Unsaved)
        }
    }

    async fn announce_final(&mut self, event: &Event) -> Result<Outcome, Error> {
        let Some(channel_id) = event.announcement_channel else {
            debug!("Event {} has no output channel for its final call", event.id);
            return Ok(Outcome::Skipped);
        };

        self.chat
            .post(channel_id, &announcements::final_reminder(event))
            .await?;

        if self.store.mark_completed(event.id).await? {
            info!("Event {} is starting, marked completed", event.id);
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Unsaved)
        }
    }

    /// The poll can't be read anymore; close the whole event
    async fn abandon(&mut self, event: &Event, track: VoteTrack) -> Result<Outcome, Error> {
        warn!(
            "The {} poll of event {} is gone, marking the event completed",
            track, event.id
        );

        if self.store.mark_completed(event.id).await? {
            Ok(Outcome::Dangling)
        } else {
            Ok(Outcome::Unsaved)
        }
    }
}

/// Start the scheduler background task.
///
/// Ticks never overlap: a slow tick delays the next one.
pub fn spawn_scheduler(mut scheduler: PhaseScheduler, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Phase scheduler running every {}", format_duration(period));

        loop {
            ticker.tick().await;

            let report = scheduler.tick(Utc::now()).await;
            if !report.is_idle() {
                info!("Scheduler tick: {:?}", report);
            }
        }
    })
}

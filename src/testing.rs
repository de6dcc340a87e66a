//! In-memory store and chat used by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::bot::error::Error;
use crate::db::store::EventStore;
use crate::services::chat::{normalize_emoji, ChatChannel};
use crate::services::events::builder::NewEvent;
use crate::services::events::model::{Event, Vote, VoteOption};
use crate::services::scheduler::phase::{PhaseFlag, Transition};

pub const OUTPUT_CHANNEL: u64 = 500;

/// An event whose windows all hang off `base`:
/// type vote `base..base+2h`, time vote `base+3h..base+4h`,
/// game times at `base+1d` and `base+2d`.
pub fn sample_event(id: i64, base: DateTime<Utc>) -> Event {
    let mut type_vote = Vote::new(base, base + Duration::hours(2));
    type_vote.options = vec![
        VoteOption::Type { label: "Hide and Seek".into(), emoji: "🏅".into() },
        VoteOption::Type { label: "Normal VS".into(), emoji: "🎖".into() },
        VoteOption::Type { label: "Clan VS Clan".into(), emoji: "🤼".into() },
    ];

    let mut time_vote = Vote::new(base + Duration::hours(3), base + Duration::hours(4));
    time_vote.options = vec![
        VoteOption::Time { at: base + Duration::days(1), emoji: "🕗".into() },
        VoteOption::Time { at: base + Duration::days(2), emoji: "🕘".into() },
    ];

    Event {
        id,
        server_id: 1,
        announcement_channel: Some(OUTPUT_CHANNEL),
        title: format!("Custom games #{}", id),
        description: "Bring snacks".into(),
        type_vote,
        time_vote,
        completed: false,
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<BTreeMap<i64, Event>>,
    failing_writes: AtomicUsize,
    offline: AtomicBool,
    slow_inserts: AtomicBool,
}

impl MemoryEventStore {
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let store = Self::default();
        {
            let mut table = store.events.lock().unwrap();
            for event in events {
                table.insert(event.id, event);
            }
        }
        store
    }

    pub fn get(&self, id: i64) -> Event {
        self.events.lock().unwrap()[&id].clone()
    }

    pub fn all(&self) -> Vec<Event> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    /// The next `n` writes affect no rows
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Reads fail while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts yield to the runtime before writing while set
    pub fn set_slow_inserts(&self, slow: bool) {
        self.slow_inserts.store(slow, Ordering::SeqCst);
    }

    fn write<T>(&self, id: i64, f: impl FnOnce(&mut Event) -> T) -> Option<T> {
        let pending = self.failing_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_writes.store(pending - 1, Ordering::SeqCst);
            return None;
        }
        self.events.lock().unwrap().get_mut(&id).map(f)
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::custom("store offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_due_transitions(
        &self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, Error> {
        self.check_online()?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.is_due(transition, now))
            .cloned()
            .collect())
    }

    async fn save_flag(
        &self,
        event_id: i64,
        flag: PhaseFlag,
        message_id: Option<u64>,
    ) -> Result<bool, Error> {
        Ok(self
            .write(event_id, |event| match flag {
                PhaseFlag::StartPosted(track) => {
                    let vote = event.vote_mut(track);
                    vote.start_posted = true;
                    if message_id.is_some() {
                        vote.message_id = message_id;
                    }
                }
                PhaseFlag::EndPosted(track) => event.vote_mut(track).end_posted = true,
            })
            .is_some())
    }

    async fn save_final_choice(&self, event_id: i64, choice: &VoteOption) -> Result<bool, Error> {
        Ok(self
            .write(event_id, |event| {
                let vote = event.vote_mut(choice.track());
                vote.final_choice = Some(choice.clone());
                vote.end_posted = true;
            })
            .is_some())
    }

    async fn mark_completed(&self, event_id: i64) -> Result<bool, Error> {
        Ok(self.write(event_id, |event| event.completed = true).is_some())
    }

    async fn sweep_completed(&self, now: DateTime<Utc>, grace: Duration) -> Result<u64, Error> {
        self.check_online()?;
        let mut swept = 0;
        for event in self.events.lock().unwrap().values_mut() {
            if event.is_lingering(now, grace) {
                event.completed = true;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn insert_event(&self, server_id: i64, event: &NewEvent) -> Result<i64, Error> {
        self.check_online()?;
        if self.slow_inserts.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let mut table = self.events.lock().unwrap();
        let id = table.keys().next_back().copied().unwrap_or(0) + 1;
        table.insert(
            id,
            Event {
                id,
                server_id,
                announcement_channel: Some(OUTPUT_CHANNEL),
                title: event.title.clone(),
                description: event.description.clone(),
                type_vote: event.type_vote.clone(),
                time_vote: event.time_vote.clone(),
                completed: false,
            },
        );
        Ok(id)
    }

    async fn list_active(&self, server_id: i64) -> Result<Vec<Event>, Error> {
        self.check_online()?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.server_id == server_id && !e.completed)
            .cloned()
            .collect())
    }
}

/// Chat double that records what the bot sends
pub struct FakeChat {
    next_id: AtomicU64,
    posts: Mutex<Vec<(u64, u64, String)>>,
    reactions: Mutex<Vec<(u64, String)>>,
    counts: Mutex<HashMap<u64, HashMap<String, u64>>>,
    missing_channels: Mutex<HashSet<u64>>,
    revoked_channels: Mutex<HashSet<u64>>,
    broken: AtomicBool,
}

impl Default for FakeChat {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            posts: Mutex::default(),
            reactions: Mutex::default(),
            counts: Mutex::default(),
            missing_channels: Mutex::default(),
            revoked_channels: Mutex::default(),
            broken: AtomicBool::new(false),
        }
    }
}

impl FakeChat {
    /// Text of every post, in order
    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().iter().map(|(_, _, t)| t.clone()).collect()
    }

    pub fn last_message_id(&self) -> Option<u64> {
        self.posts.lock().unwrap().last().map(|(_, id, _)| *id)
    }

    /// Emoji added as reaction buttons to `message_id`
    pub fn reactions_on(&self, message_id: u64) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == message_id)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Register a poll message with its user votes
    pub fn set_counts(&self, message_id: u64, counts: &[(&str, u64)]) {
        let counts = counts.iter().map(|(e, c)| (e.to_string(), *c)).collect();
        self.counts.lock().unwrap().insert(message_id, counts);
    }

    pub fn remove_channel(&self, channel_id: u64) {
        self.missing_channels.lock().unwrap().insert(channel_id);
    }

    /// The channel still exists but the bot can't read it anymore
    pub fn revoke_access(&self, channel_id: u64) {
        self.revoked_channels.lock().unwrap().insert(channel_id);
    }

    /// Every call fails with a non-not-found error while set
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    fn check(&self, channel_id: u64) -> Result<(), Error> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::custom("gateway unavailable"));
        }
        if self.missing_channels.lock().unwrap().contains(&channel_id) {
            return Err(Error::ChannelNotFound(channel_id));
        }
        if self.revoked_channels.lock().unwrap().contains(&channel_id) {
            return Err(Error::custom("Missing Access"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatChannel for FakeChat {
    async fn post(&self, channel_id: u64, text: &str) -> Result<u64, Error> {
        self.check(channel_id)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .push((channel_id, id, text.to_string()));
        self.counts.lock().unwrap().entry(id).or_default();
        Ok(id)
    }

    async fn add_reaction_option(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), Error> {
        self.check(channel_id)?;
        self.reactions
            .lock()
            .unwrap()
            .push((message_id, emoji.to_string()));
        Ok(())
    }

    async fn reaction_counts(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<HashMap<String, u64>, Error> {
        self.check(channel_id)?;
        let counts = self.counts.lock().unwrap();
        let found = counts.get(&message_id).ok_or(Error::MessageNotFound {
            channel_id,
            message_id,
        })?;
        Ok(found
            .iter()
            .map(|(emoji, count)| (normalize_emoji(emoji), *count))
            .collect())
    }

    async fn exists(&self, channel_id: u64) -> Result<bool, Error> {
        if self.revoked_channels.lock().unwrap().contains(&channel_id) {
            return Ok(false);
        }
        match self.check(channel_id) {
            Ok(()) => Ok(true),
            Err(Error::ChannelNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_failed_write_changes_nothing() {
        let store = MemoryEventStore::with_events([sample_event(1, Utc::now())]);
        store.fail_next_writes(1);

        let saved = tokio_test::block_on(store.save_flag(
            1,
            PhaseFlag::StartPosted(crate::db::models::VoteTrack::Type),
            Some(7),
        ))
        .unwrap();
        assert!(!saved);
        assert!(!store.get(1).type_vote.start_posted);

        assert!(tokio_test::block_on(store.mark_completed(1)).unwrap());
        assert!(store.get(1).completed);
    }

    #[test]
    fn test_fake_chat_unknown_message() {
        let chat = FakeChat::default();
        let err = tokio_test::block_on(chat.reaction_counts(OUTPUT_CHANNEL, 42)).unwrap_err();
        assert!(err.is_not_found());
    }
}

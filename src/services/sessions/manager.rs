use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::bot::error::Error;
use crate::services::events::builder::EventDraft;

/// One conversation per user per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: u64,
    pub channel_id: u64,
}

impl SessionKey {
    pub fn new(user_id: u64, channel_id: u64) -> Self {
        Self { user_id, channel_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    CreateEvent,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::CreateEvent => "create event",
        }
    }
}

/// Conversation state, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPayload {
    CreateEvent(EventDraft),
}

impl SessionPayload {
    fn for_kind(kind: SessionKind) -> Self {
        match kind {
            SessionKind::CreateEvent => SessionPayload::CreateEvent(EventDraft::default()),
        }
    }

    pub fn kind(&self) -> SessionKind {
        match self {
            SessionPayload::CreateEvent(_) => SessionKind::CreateEvent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    /// Last activity; refreshed by every successful lookup
    pub started_at: Instant,
    pub ttl: Duration,
    pub payload: SessionPayload,
}

impl Session {
    pub fn kind(&self) -> SessionKind {
        self.payload.kind()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.started_at + self.ttl < now
    }
}

/// Table of in-progress conversations.
///
/// Every access takes the single table lock for the length of one map
/// operation; callers never hold it across an await.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionKey, Session>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<SessionKey, Session>> {
        // A panic elsewhere can't leave a half-written entry behind
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, key: SessionKey, kind: SessionKind) -> Result<Session, Error> {
        self.create_at(key, kind, Instant::now())
    }

    pub fn create_at(
        &self,
        key: SessionKey,
        kind: SessionKind,
        now: Instant,
    ) -> Result<Session, Error> {
        let mut table = self.table();

        if let Some(existing) = table.get(&key) {
            if !existing.is_expired(now) {
                return Err(Error::DuplicateSession {
                    user_id: key.user_id,
                    channel_id: key.channel_id,
                });
            }
        }

        let session = Session {
            key,
            started_at: now,
            ttl: self.ttl,
            payload: SessionPayload::for_kind(kind),
        };
        table.insert(key, session.clone());

        debug!(
            "Opened {} session for user {} in channel {}",
            kind.as_str(),
            key.user_id,
            key.channel_id
        );

        Ok(session)
    }

    /// Look up a live session, keeping it alive
    pub fn find(&self, key: SessionKey) -> Option<Session> {
        self.find_at(key, Instant::now())
    }

    pub fn find_at(&self, key: SessionKey, now: Instant) -> Option<Session> {
        let mut table = self.table();

        let expired = table.get(&key)?.is_expired(now);
        if expired {
            table.remove(&key);
            debug!(
                "Session for user {} in channel {} timed out",
                key.user_id, key.channel_id
            );
            return None;
        }

        let session = table.get_mut(&key)?;
        session.started_at = now;
        Some(session.clone())
    }

    /// Apply `f` to the live session under the table lock.
    ///
    /// `f` must not block; it runs inside the critical section.
    pub fn update<T>(&self, key: SessionKey, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut table = self.table();
        table.get_mut(&key).map(f)
    }

    /// Claim the live session at `key`, removing it from the table.
    ///
    /// Only one caller can hold a taken session; the rest get `SessionExpired`.
    pub fn take(&self, key: SessionKey) -> Result<Session, Error> {
        self.take_at(key, Instant::now())
    }

    pub fn take_at(&self, key: SessionKey, now: Instant) -> Result<Session, Error> {
        match self.table().remove(&key) {
            Some(session) if !session.is_expired(now) => Ok(session),
            _ => Err(Error::SessionExpired),
        }
    }

    /// Put a taken session back, unless a live one was opened meanwhile
    pub fn restore(&self, session: Session) -> bool {
        self.restore_at(session, Instant::now())
    }

    pub fn restore_at(&self, mut session: Session, now: Instant) -> bool {
        let mut table = self.table();

        if let Some(existing) = table.get(&session.key) {
            if !existing.is_expired(now) {
                return false;
            }
        }

        session.started_at = now;
        table.insert(session.key, session);
        true
    }

    /// Remove a session; returns whether one was present
    pub fn close(&self, key: SessionKey) -> bool {
        self.table().remove(&key).is_some()
    }

    /// Drop every session idle past its ttl
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut table = self.table();
        let before = table.len();

        table.retain(|key, session| {
            let keep = !session.is_expired(now);
            if !keep {
                info!(
                    "Removing expired {} session for user {} in channel {}",
                    session.kind().as_str(),
                    key.user_id,
                    key.channel_id
                );
            }
            keep
        });

        before - table.len()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

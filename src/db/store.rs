//! Persistence contract the scheduler and the event builder depend on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::bot::error::Error;
use crate::db::queries::event;
use crate::services::events::builder::NewEvent;
use crate::services::events::model::{Event, VoteOption};
use crate::services::scheduler::phase::{PhaseFlag, Transition};

/// Event storage as seen by the core.
///
/// Write methods return `Ok(false)` when no row was affected; callers treat
/// that as transient and retry on the next tick.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Non-completed events for which `transition` is due at `now`
    async fn find_due_transitions(
        &self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, Error>;

    async fn save_flag(
        &self,
        event_id: i64,
        flag: PhaseFlag,
        message_id: Option<u64>,
    ) -> Result<bool, Error>;

    /// Sets the winner of `choice`'s vote and its end flag together
    async fn save_final_choice(&self, event_id: i64, choice: &VoteOption) -> Result<bool, Error>;

    async fn mark_completed(&self, event_id: i64) -> Result<bool, Error>;

    /// Force-complete lingering events; returns how many were closed
    async fn sweep_completed(
        &self,
        now: DateTime<Utc>,
        grace: chrono::Duration,
    ) -> Result<u64, Error>;

    async fn insert_event(&self, server_id: i64, event: &NewEvent) -> Result<i64, Error>;

    async fn list_active(&self, server_id: i64) -> Result<Vec<Event>, Error>;
}

#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn find_due_transitions(
        &self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, Error> {
        Ok(event::find_due(&self.pool, transition, now).await?)
    }

    async fn save_flag(
        &self,
        event_id: i64,
        flag: PhaseFlag,
        message_id: Option<u64>,
    ) -> Result<bool, Error> {
        Ok(event::save_flag(&self.pool, event_id, flag, message_id).await?)
    }

    async fn save_final_choice(&self, event_id: i64, choice: &VoteOption) -> Result<bool, Error> {
        Ok(event::save_final_choice(&self.pool, event_id, choice).await?)
    }

    async fn mark_completed(&self, event_id: i64) -> Result<bool, Error> {
        Ok(event::mark_completed(&self.pool, event_id).await?)
    }

    async fn sweep_completed(
        &self,
        now: DateTime<Utc>,
        grace: chrono::Duration,
    ) -> Result<u64, Error> {
        Ok(event::sweep_completed(&self.pool, now - grace).await?)
    }

    async fn insert_event(&self, server_id: i64, event: &NewEvent) -> Result<i64, Error> {
        Ok(event::insert(&self.pool, server_id, event).await?)
    }

    async fn list_active(&self, server_id: i64) -> Result<Vec<Event>, Error> {
        Ok(event::list_active(&self.pool, server_id).await?)
    }
}

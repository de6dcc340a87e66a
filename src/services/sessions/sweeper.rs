use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

use crate::services::sessions::manager::SessionManager;

/// Start the background task that drops idle sessions
pub fn spawn_session_sweeper(sessions: Arc<SessionManager>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            let removed = sessions.sweep();
            if removed > 0 {
                info!("Swept {} expired sessions, {} still open", removed, sessions.len());
            }
        }
    })
}

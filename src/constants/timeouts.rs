use std::time::Duration;

/// Scheduler and session defaults (can be overridden via env vars)
pub const DEFAULT_SCHEDULER_TICK_SECONDS: u64 = 60; // Phase transition scan
pub const DEFAULT_SESSION_SWEEP_SECONDS: u64 = 5 * 60; // Expired session sweep
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30; // Conversation idle window
pub const DEFAULT_COMPLETION_GRACE_SECONDS: u64 = 60 * 60; // Lingering event cutoff

/// Minimum delay between outbound Discord sends (API rate limits)
pub const DEFAULT_MESSAGE_DELAY_MS: u64 = 1200;

/// Offset applied to user-entered dates when they carry no zone
pub const DEFAULT_EVENT_UTC_OFFSET_HOURS: i32 = 0;

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{} second{}", total_secs, if total_secs == 1 { "" } else { "s" })
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if total_secs < 86400 {
        let hours = total_secs / 3600;
        format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = total_secs / 86400;
        format!("{} day{}", days, if days == 1 { "" } else { "s" })
    }
}

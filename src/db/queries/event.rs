use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::models::{EventRow, VoteOptionRow, VoteTrack};
use crate::services::events::builder::NewEvent;
use crate::services::events::model::{Event, VoteOption};
use crate::services::scheduler::phase::{PhaseFlag, Transition};

const EVENT_COLUMNS: &str = r#"
    SELECT e.event_id, e.guild_id, s.output_channel_id, e.title, e.description,
           e.type_vote_start, e.type_vote_end, e.type_start_posted, e.type_end_posted,
           e.type_message_id, e.final_game_type,
           e.time_vote_start, e.time_vote_end, e.time_start_posted, e.time_end_posted,
           e.time_message_id, e.final_game_time, e.completed
    FROM events e
    INNER JOIN server_configs s ON s.guild_id = e.guild_id
"#;

/// WHERE clause selecting events due for `transition`; `$1` is the current time.
///
/// Mirrors `Event::is_due`, which the in-memory store and the scheduler
/// tests rely on. Change both together.
fn due_filter(transition: Transition) -> &'static str {
    match transition {
        Transition::StartVote(VoteTrack::Type) => {
            "e.completed = FALSE AND e.type_start_posted = FALSE AND e.type_vote_start <= $1"
        }
        Transition::EndVote(VoteTrack::Type) => {
            "e.completed = FALSE AND e.type_start_posted = TRUE AND e.type_end_posted = FALSE \
             AND e.type_vote_end <= $1"
        }
        Transition::StartVote(VoteTrack::Time) => {
            "e.completed = FALSE AND e.type_end_posted = TRUE AND e.time_start_posted = FALSE \
             AND e.time_vote_start <= $1"
        }
        Transition::EndVote(VoteTrack::Time) => {
            "e.completed = FALSE AND e.time_start_posted = TRUE AND e.time_end_posted = FALSE \
             AND e.time_vote_end <= $1"
        }
        Transition::Final => {
            "e.completed = FALSE AND e.time_end_posted = TRUE AND e.final_game_time <= $1"
        }
    }
}

fn message_column(track: VoteTrack) -> &'static str {
    match track {
        VoteTrack::Type => "type_message_id",
        VoteTrack::Time => "time_message_id",
    }
}

pub async fn find_due(
    pool: &PgPool,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, sqlx::Error> {
    let query = format!(
        "{} WHERE {} ORDER BY e.event_id",
        EVENT_COLUMNS,
        due_filter(transition)
    );

    let rows = sqlx::query_as::<_, EventRow>(&query)
        .bind(now)
        .fetch_all(pool)
        .await?;

    with_options(pool, rows).await
}

pub async fn list_active(pool: &PgPool, guild_id: i64) -> Result<Vec<Event>, sqlx::Error> {
    let query = format!(
        "{} WHERE e.guild_id = $1 AND e.completed = FALSE ORDER BY e.event_id",
        EVENT_COLUMNS
    );

    let rows = sqlx::query_as::<_, EventRow>(&query)
        .bind(guild_id)
        .fetch_all(pool)
        .await?;

    with_options(pool, rows).await
}

async fn with_options(pool: &PgPool, rows: Vec<EventRow>) -> Result<Vec<Event>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.event_id).collect();
    let options = sqlx::query_as::<_, VoteOptionRow>(
        "SELECT * FROM vote_options WHERE event_id = ANY($1) ORDER BY event_id, position",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into_event(&options)).collect())
}

/// Set a posted flag; start flags also record the poll message
pub async fn save_flag(
    pool: &PgPool,
    event_id: i64,
    flag: PhaseFlag,
    message_id: Option<u64>,
) -> Result<bool, sqlx::Error> {
    let result = match (flag, message_id) {
        (PhaseFlag::StartPosted(track), Some(message_id)) => {
            let query = format!(
                "UPDATE events SET {} = TRUE, {} = $2 WHERE event_id = $1",
                flag.column(),
                message_column(track)
            );
            sqlx::query(&query)
                .bind(event_id)
                .bind(message_id as i64)
                .execute(pool)
                .await?
        }
        _ => {
            let query = format!("UPDATE events SET {} = TRUE WHERE event_id = $1", flag.column());
            sqlx::query(&query).bind(event_id).execute(pool).await?
        }
    };

    Ok(result.rows_affected() > 0)
}

/// Record a vote's winner and close that vote in one write
pub async fn save_final_choice(
    pool: &PgPool,
    event_id: i64,
    choice: &VoteOption,
) -> Result<bool, sqlx::Error> {
    let result = match choice {
        VoteOption::Type { label, .. } => {
            sqlx::query(
                "UPDATE events SET final_game_type = $2, type_end_posted = TRUE WHERE event_id = $1",
            )
            .bind(event_id)
            .bind(label)
            .execute(pool)
            .await?
        }
        VoteOption::Time { at, .. } => {
            sqlx::query(
                "UPDATE events SET final_game_time = $2, time_end_posted = TRUE WHERE event_id = $1",
            )
            .bind(event_id)
            .bind(at)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

pub async fn mark_completed(pool: &PgPool, event_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE events SET completed = TRUE WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Force-complete events whose every vote was posted and whose game
/// started before `cutoff`
pub async fn sweep_completed(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE events SET completed = TRUE
        WHERE completed = FALSE
          AND type_start_posted AND type_end_posted
          AND time_start_posted AND time_end_posted
          AND final_game_time < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Insert an event and all its options atomically
pub async fn insert(pool: &PgPool, guild_id: i64, event: &NewEvent) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let (event_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO events (guild_id, title, description,
                            type_vote_start, type_vote_end, time_vote_start, time_vote_end)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING event_id
        "#,
    )
    .bind(guild_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.type_vote.start_at)
    .bind(event.type_vote.end_at)
    .bind(event.time_vote.start_at)
    .bind(event.time_vote.end_at)
    .fetch_one(&mut *tx)
    .await?;

    let options = event
        .type_vote
        .options
        .iter()
        .enumerate()
        .chain(event.time_vote.options.iter().enumerate());

    for (position, option) in options {
        sqlx::query(
            r#"
            INSERT INTO vote_options (event_id, track, label, game_time, emoji, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event_id)
        .bind(option.track())
        .bind(option.label())
        .bind(option.time())
        .bind(option.emoji())
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(event_id)
}

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

/// Ordered schema migrations, applied on every startup
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_server_configs",
        include_str!("../../migrations/001_server_configs.sql"),
    ),
    ("002_events", include_str!("../../migrations/002_events.sql")),
    (
        "003_vote_options",
        include_str!("../../migrations/003_vote_options.sql"),
    ),
];

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("Database connection established");

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for (name, sql) in MIGRATIONS {
        info!("Applying migration {}", name);

        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if let Err(e) = sqlx::query(statement).execute(pool).await {
                // Re-running a migration hits objects that already exist
                if is_already_applied(&e) {
                    debug!("Migration {} statement already applied", name);
                    continue;
                }
                return Err(e);
            }
        }
    }

    info!("Migrations completed ({} total)", MIGRATIONS.len());
    Ok(())
}

fn is_already_applied(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("already exists") || msg.contains("duplicate key")
}

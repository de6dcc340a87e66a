use sqlx::PgPool;

use crate::db::models::ServerConfig;

pub async fn get_or_create(pool: &PgPool, guild_id: i64) -> Result<ServerConfig, sqlx::Error> {
    sqlx::query_as::<_, ServerConfig>(
        r#"
        INSERT INTO server_configs (guild_id)
        VALUES ($1)
        ON CONFLICT (guild_id) DO UPDATE SET guild_id = EXCLUDED.guild_id
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &PgPool, guild_id: i64) -> Result<Option<ServerConfig>, sqlx::Error> {
    sqlx::query_as::<_, ServerConfig>("SELECT * FROM server_configs WHERE guild_id = $1")
        .bind(guild_id)
        .fetch_optional(pool)
        .await
}

pub async fn set_config_channel(
    pool: &PgPool,
    guild_id: i64,
    channel_id: i64,
) -> Result<ServerConfig, sqlx::Error> {
    sqlx::query_as::<_, ServerConfig>(
        r#"
        INSERT INTO server_configs (guild_id, config_channel_id)
        VALUES ($1, $2)
        ON CONFLICT (guild_id)
        DO UPDATE SET config_channel_id = $2, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
}

pub async fn set_output_channel(
    pool: &PgPool,
    guild_id: i64,
    channel_id: i64,
) -> Result<ServerConfig, sqlx::Error> {
    sqlx::query_as::<_, ServerConfig>(
        r#"
        INSERT INTO server_configs (guild_id, output_channel_id)
        VALUES ($1, $2)
        ON CONFLICT (guild_id)
        DO UPDATE SET output_channel_id = $2, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
}

// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connection pool shared by the chat store and the checkpointer. Each query
/// acquires a connection for its own duration and returns it afterwards.
pub async fn create_pool(db_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(db_url)
        .await?;

    tracing::info!("Database pool ready (max {} connections)", max_connections);
    Ok(pool)
}

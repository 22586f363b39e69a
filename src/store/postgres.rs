// src/store/postgres.rs
use super::{ChatStore, StoreError};
use crate::models::chat::{new_thread_id, resolve_chat_name, Chat};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        tracing::info!("Ensuring users and chats tables exist...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id SERIAL PRIMARY KEY,
                username VARCHAR(100) UNIQUE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                chat_id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(user_id),
                thread_id VARCHAR(100) UNIQUE NOT NULL,
                chat_name VARCHAR(200),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_updated TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_user_id ON chats(user_id)")
            .execute(&self.pool)
            .await?;

        tracing::info!("User tables ready");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<i32, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i32>(
            "INSERT INTO users (username) VALUES ($1) RETURNING user_id",
        )
        .bind(username)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(user_id) => {
                tx.commit().await?;
                tracing::info!("Created user {} ({})", username, user_id);
                Ok(user_id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tx.rollback().await?;
                let user_id = sqlx::query_scalar::<_, i32>(
                    "SELECT user_id FROM users WHERE username = $1",
                )
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
                tracing::debug!("User {} already exists ({})", username, user_id);
                Ok(user_id)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_chats(&self, user_id: i32) -> Result<Vec<Chat>, StoreError> {
        let chats = sqlx::query_as::<_, Chat>(
            r#"
            SELECT chat_id, user_id, thread_id, chat_name, created_at, last_updated
            FROM chats
            WHERE user_id = $1
            ORDER BY last_updated DESC, chat_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(chats)
    }

    async fn create_new_chat(&self, user_id: i32, chat_name: Option<&str>) -> Result<(i32, String), StoreError> {
        let (chat_id, thread_id) = sqlx::query_as::<_, (i32, String)>(
            r#"
            INSERT INTO chats (user_id, thread_id, chat_name)
            VALUES ($1, $2, $3)
            RETURNING chat_id, thread_id
            "#,
        )
        .bind(user_id)
        .bind(new_thread_id())
        .bind(resolve_chat_name(chat_name))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created chat {} (thread {}) for user {}", chat_id, thread_id, user_id);
        Ok((chat_id, thread_id))
    }

    async fn update_chat_timestamp(&self, thread_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE chats SET last_updated = CURRENT_TIMESTAMP WHERE thread_id = $1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_chat(&self, chat_id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chats WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        tracing::info!("Deleted chat {} ({} rows)", chat_id, result.rows_affected());
        Ok(())
    }

    async fn get_chat_by_thread(&self, thread_id: &str) -> Result<Option<Chat>, StoreError> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT chat_id, user_id, thread_id, chat_name, created_at, last_updated
            FROM chats
            WHERE thread_id = $1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }
}

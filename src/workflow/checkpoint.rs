// Checkpointing - Versioned snapshots of a thread's conversation state
use super::state::ConversationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Checkpoint - Snapshot of a thread's state after one write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub thread_id: String,
    pub state: ConversationState,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Saves and loads conversation state keyed by thread id. Versions start at 1
/// and increase by one per write; the highest version is the current state.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn setup(&self) -> Result<(), CheckpointError>;

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<Checkpoint, CheckpointError>;

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// All checkpoints for a thread, oldest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;
}

/// PostgreSQL checkpointer storing state as JSONB
pub struct PgCheckpointer {
    pool: PgPool,
}

impl PgCheckpointer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Checkpointer for PgCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_checkpoints (
                checkpoint_id VARCHAR(64) PRIMARY KEY,
                thread_id VARCHAR(100) NOT NULL,
                version INTEGER NOT NULL,
                state JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (thread_id, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("✅ Conversation checkpoint table setup complete");
        Ok(())
    }

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<Checkpoint, CheckpointError> {
        let checkpoint_id = uuid::Uuid::new_v4().to_string();
        let state_json = serde_json::to_value(state)?;

        let (version, created_at) = sqlx::query_as::<_, (i32, DateTime<Utc>)>(
            r#"
            INSERT INTO conversation_checkpoints (checkpoint_id, thread_id, version, state)
            SELECT $1, $2, COALESCE(MAX(version), 0) + 1, $3
            FROM conversation_checkpoints
            WHERE thread_id = $2
            RETURNING version, created_at
            "#,
        )
        .bind(&checkpoint_id)
        .bind(thread_id)
        .bind(state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save checkpoint for thread {}: {}", thread_id, e);
            e
        })?;

        info!("💾 Checkpoint saved: {} (thread: {}, version: {})", checkpoint_id, thread_id, version);
        Ok(Checkpoint {
            checkpoint_id,
            thread_id: thread_id.to_string(),
            state: state.clone(),
            version,
            created_at,
        })
    }

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT checkpoint_id, thread_id, state, version, created_at
            FROM conversation_checkpoints
            WHERE thread_id = $1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Checkpoint::try_from).transpose()
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT checkpoint_id, thread_id, state, version, created_at
            FROM conversation_checkpoints
            WHERE thread_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Checkpoint::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    checkpoint_id: String,
    thread_id: String,
    state: serde_json::Value,
    version: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CheckpointRow> for Checkpoint {
    type Error = CheckpointError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        Ok(Checkpoint {
            checkpoint_id: row.checkpoint_id,
            thread_id: row.thread_id,
            state: serde_json::from_value(row.state)?,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// In-process checkpointer. Used when no database is configured; history is
/// lost on restart.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<Checkpoint, CheckpointError> {
        let mut threads = self.threads.write().await;
        let series = threads.entry(thread_id.to_string()).or_default();
        let checkpoint = Checkpoint {
            checkpoint_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            state: state.clone(),
            version: series.last().map(|c| c.version).unwrap_or(0) + 1,
            created_at: Utc::now(),
        };
        series.push(checkpoint.clone());
        Ok(checkpoint)
    }

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|series| series.last().cloned()))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::Message;

    #[tokio::test]
    async fn test_versions_increase_per_thread() {
        let checkpointer = MemoryCheckpointer::new();
        let mut state = ConversationState::default();
        state.add_messages(vec![Message::user("one")]);

        let first = checkpointer.put("thread-a", &state).await.unwrap();
        state.add_messages(vec![Message::assistant("two")]);
        let second = checkpointer.put("thread-a", &state).await.unwrap();
        let other = checkpointer.put("thread-b", &ConversationState::default()).await.unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(other.version, 1);

        let latest = checkpointer.get_latest("thread-a").await.unwrap().unwrap();
        assert_eq!(latest.checkpoint_id, second.checkpoint_id);
        assert_eq!(latest.state.messages.len(), 2);

        let history = checkpointer.list("thread-a").await.unwrap();
        let versions: Vec<i32> = history.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_thread_has_no_checkpoint() {
        let checkpointer = MemoryCheckpointer::new();
        assert!(checkpointer.get_latest("missing").await.unwrap().is_none());
        assert!(checkpointer.list("missing").await.unwrap().is_empty());
    }
}

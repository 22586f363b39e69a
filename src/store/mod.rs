// src/store/mod.rs
use crate::models::chat::Chat;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryChatStore;
pub use postgres::PgChatStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Users and chats. Message history is not stored here; it lives in the
/// checkpointer under each chat's `thread_id`.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create both tables if they do not exist yet.
    async fn init_schema(&self) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Insert the user, or return the existing id when the username is taken.
    async fn create_user(&self, username: &str) -> Result<i32, StoreError>;

    /// All chats owned by the user, most recently updated first.
    async fn get_user_chats(&self, user_id: i32) -> Result<Vec<Chat>, StoreError>;

    /// Returns `(chat_id, thread_id)` of the new chat.
    async fn create_new_chat(&self, user_id: i32, chat_name: Option<&str>) -> Result<(i32, String), StoreError>;

    async fn update_chat_timestamp(&self, thread_id: &str) -> Result<(), StoreError>;

    /// Removes the chat row only. Checkpointed messages for its thread stay.
    async fn delete_chat(&self, chat_id: i32) -> Result<(), StoreError>;

    async fn get_chat_by_thread(&self, thread_id: &str) -> Result<Option<Chat>, StoreError>;
}

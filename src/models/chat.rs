// src/models/chat.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub chat_id: i32,
    pub user_id: i32,
    pub thread_id: String,
    pub chat_name: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub last_updated: chrono::NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteChatForm {
    /// Thread currently open in the page that submitted the delete.
    pub active: Option<String>,
}

/// Name given to a chat created without one, e.g. `Chat 2024-05-01 14:30`.
pub fn default_chat_name() -> String {
    format!("Chat {}", chrono::Local::now().format("%Y-%m-%d %H:%M"))
}

/// Resolves the stored name for a new chat: blank names fall back to
/// [`default_chat_name`].
pub fn resolve_chat_name(chat_name: Option<&str>) -> String {
    match chat_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_chat_name(),
    }
}

pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// src/store/memory.rs
use super::{ChatStore, StoreError};
use crate::models::auth::User;
use crate::models::chat::{new_thread_id, resolve_chat_name, Chat};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;

/// In-process users/chats store with the same semantics as the PostgreSQL
/// one. Used when `DATABASE_URL` is not set.
#[derive(Default)]
pub struct MemoryChatStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    chats: Vec<Chat>,
    next_user_id: i32,
    next_chat_id: i32,
    last_stamp: Option<NaiveDateTime>,
}

impl Inner {
    // Strictly increasing, so two touches in a row always reorder
    fn now(&mut self) -> NaiveDateTime {
        let mut now = chrono::Local::now().naive_local();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now
    }
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<i32, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.iter().find(|u| u.username == username) {
            return Ok(user.user_id);
        }

        inner.next_user_id += 1;
        let user = User {
            user_id: inner.next_user_id,
            username: username.to_string(),
            created_at: inner.now(),
        };
        let user_id = user.user_id;
        inner.users.push(user);
        Ok(user_id)
    }

    async fn get_user_chats(&self, user_id: i32) -> Result<Vec<Chat>, StoreError> {
        let inner = self.inner.lock().await;
        let mut chats: Vec<Chat> = inner
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then(b.chat_id.cmp(&a.chat_id))
        });
        Ok(chats)
    }

    async fn create_new_chat(&self, user_id: i32, chat_name: Option<&str>) -> Result<(i32, String), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_chat_id += 1;
        let now = inner.now();
        let chat = Chat {
            chat_id: inner.next_chat_id,
            user_id,
            thread_id: new_thread_id(),
            chat_name: Some(resolve_chat_name(chat_name)),
            created_at: now,
            last_updated: now,
        };
        let ids = (chat.chat_id, chat.thread_id.clone());
        inner.chats.push(chat);
        Ok(ids)
    }

    async fn update_chat_timestamp(&self, thread_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        if let Some(chat) = inner.chats.iter_mut().find(|c| c.thread_id == thread_id) {
            chat.last_updated = now;
        }
        Ok(())
    }

    async fn delete_chat(&self, chat_id: i32) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.chats.retain(|c| c.chat_id != chat_id);
        Ok(())
    }

    async fn get_chat_by_thread(&self, thread_id: &str) -> Result<Option<Chat>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.chats.iter().find(|c| c.thread_id == thread_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_create_user_is_idempotent() {
        let store = MemoryChatStore::new();
        let first = store.create_user("alice").await.unwrap();
        let second = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(first, second);
        assert_ne!(first, bob);

        let inner = store.inner.lock().await;
        assert_eq!(inner.users.iter().filter(|u| u.username == "alice").count(), 1);
    }

    #[tokio::test]
    async fn test_thread_ids_are_unique_across_users() {
        let store = MemoryChatStore::new();
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();

        let mut seen = HashSet::new();
        for user_id in [alice, bob, alice, bob, alice] {
            let (_, thread_id) = store.create_new_chat(user_id, None).await.unwrap();
            assert!(seen.insert(thread_id));
        }
    }

    #[tokio::test]
    async fn test_chat_names() {
        let store = MemoryChatStore::new();
        let user_id = store.create_user("alice").await.unwrap();

        let (_, named) = store.create_new_chat(user_id, Some("Trip plans")).await.unwrap();
        let (_, unnamed) = store.create_new_chat(user_id, None).await.unwrap();
        let (_, blank) = store.create_new_chat(user_id, Some("   ")).await.unwrap();

        let name_of = |chat: Option<Chat>| chat.and_then(|c| c.chat_name).unwrap();
        assert_eq!(name_of(store.get_chat_by_thread(&named).await.unwrap()), "Trip plans");

        for thread_id in [unnamed, blank] {
            let name = name_of(store.get_chat_by_thread(&thread_id).await.unwrap());
            let stamp = name.strip_prefix("Chat ").unwrap();
            assert!(NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M").is_ok(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_touch_reorders_only_that_chat() {
        let store = MemoryChatStore::new();
        let user_id = store.create_user("alice").await.unwrap();
        let (first_id, first_thread) = store.create_new_chat(user_id, Some("first")).await.unwrap();
        let (second_id, _) = store.create_new_chat(user_id, Some("second")).await.unwrap();

        let before = store.get_user_chats(user_id).await.unwrap();
        assert_eq!(before.iter().map(|c| c.chat_id).collect::<Vec<_>>(), vec![second_id, first_id]);

        store.update_chat_timestamp(&first_thread).await.unwrap();

        let after = store.get_user_chats(user_id).await.unwrap();
        assert_eq!(after.iter().map(|c| c.chat_id).collect::<Vec<_>>(), vec![first_id, second_id]);
        assert_eq!(after[1].last_updated, before[0].last_updated);
        assert!(after[0].last_updated > before[0].last_updated);
    }

    #[tokio::test]
    async fn test_delete_removes_from_listing() {
        let store = MemoryChatStore::new();
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();
        let (doomed, doomed_thread) = store.create_new_chat(alice, None).await.unwrap();
        let (kept, _) = store.create_new_chat(alice, None).await.unwrap();
        store.create_new_chat(bob, None).await.unwrap();

        store.delete_chat(doomed).await.unwrap();

        let listing = store.get_user_chats(alice).await.unwrap();
        assert_eq!(listing.iter().map(|c| c.chat_id).collect::<Vec<_>>(), vec![kept]);
        assert!(store.get_chat_by_thread(&doomed_thread).await.unwrap().is_none());
        assert_eq!(store.get_user_chats(bob).await.unwrap().len(), 1);
    }
}

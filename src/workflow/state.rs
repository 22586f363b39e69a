// ConversationState - Message list persisted per thread, with an append reducer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The state checkpointed for a thread: the ordered conversation so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
}

impl ConversationState {
    /// Merge messages into the conversation. A message whose id is already
    /// present replaces that entry in place; anything else is appended.
    pub fn add_messages(&mut self, incoming: impl IntoIterator<Item = Message>) {
        for message in incoming {
            match self.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message,
                None => self.messages.push(message),
            }
        }
    }

    pub fn apply_update(&mut self, update: StateUpdate) {
        self.add_messages(update.messages);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Output of a node, merged into the state by [`ConversationState::apply_update`].
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
}

impl StateUpdate {
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

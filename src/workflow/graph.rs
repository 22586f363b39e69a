// ChatPipeline - START -> chat_node -> END, checkpointed per thread
use super::checkpoint::{Checkpoint, CheckpointError, Checkpointer};
use super::state::{ConversationState, Message, StateUpdate};
use crate::groq_client::LlmError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A hosted chat model: takes the full ordered conversation, returns one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<Message, LlmError>;

    fn model_name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Model(#[from] LlmError),
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// The only node: ask the model for a reply to everything said so far.
async fn chat_node(model: &dyn ChatModel, state: &ConversationState) -> Result<StateUpdate, LlmError> {
    let reply = model.invoke(&state.messages).await?;
    Ok(StateUpdate::default().with_message(reply))
}

pub struct ChatPipeline {
    model: Arc<dyn ChatModel>,
    checkpointer: Arc<dyn Checkpointer>,
}

impl ChatPipeline {
    pub fn new(model: Arc<dyn ChatModel>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self { model, checkpointer }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Current state of a thread; empty when nothing has been checkpointed.
    pub async fn get_state(&self, thread_id: &str) -> Result<ConversationState, PipelineError> {
        let latest = self.checkpointer.get_latest(thread_id).await?;
        Ok(latest.map(|checkpoint| checkpoint.state).unwrap_or_default())
    }

    pub async fn get_state_history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, PipelineError> {
        Ok(self.checkpointer.list(thread_id).await?)
    }

    /// Run one turn. Nothing is written unless the model replies, so a
    /// failed turn leaves the thread exactly as it was.
    pub async fn invoke(&self, thread_id: &str, input: Message) -> Result<ConversationState, PipelineError> {
        let mut state = self.get_state(thread_id).await?;
        state.add_messages(vec![input]);

        debug!("Invoking {} with {} messages (thread: {})", self.model_name(), state.messages.len(), thread_id);
        let update = chat_node(self.model.as_ref(), &state).await?;
        state.apply_update(update);

        let checkpoint = self.checkpointer.put(thread_id, &state).await?;
        info!("Thread {} advanced to version {}", thread_id, checkpoint.version);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoModel, FailingModel};
    use crate::workflow::checkpoint::MemoryCheckpointer;
    use crate::workflow::state::Role;

    fn pipeline(model: Arc<dyn ChatModel>) -> ChatPipeline {
        ChatPipeline::new(model, Arc::new(MemoryCheckpointer::new()))
    }

    #[tokio::test]
    async fn test_turn_appends_user_message_and_reply() {
        let model = Arc::new(EchoModel::default());
        let pipeline = pipeline(model.clone());

        let state = pipeline.invoke("t1", Message::user("hello")).await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.messages[0].content, "hello");
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert_eq!(state.messages[1].content, "echo: hello");

        pipeline.invoke("t1", Message::user("again")).await.unwrap();
        let stored = pipeline.get_state("t1").await.unwrap();
        let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "echo: hello", "again", "echo: again"]);

        // The model sees the whole conversation each turn
        assert_eq!(model.seen_lengths().await, vec![1, 3]);
        assert_eq!(pipeline.get_state_history("t1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_thread_unchanged() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let ok = ChatPipeline::new(Arc::new(EchoModel::default()), checkpointer.clone());
        ok.invoke("t1", Message::user("first")).await.unwrap();

        let failing = ChatPipeline::new(Arc::new(FailingModel), checkpointer.clone());
        let err = failing.invoke("t1", Message::user("second")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));

        let state = ok.get_state("t1").await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(checkpointer.list("t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let pipeline = pipeline(Arc::new(EchoModel::default()));
        pipeline.invoke("a", Message::user("for a")).await.unwrap();

        assert!(pipeline.get_state("b").await.unwrap().is_empty());
        assert_eq!(pipeline.get_state("a").await.unwrap().messages.len(), 2);
    }
}

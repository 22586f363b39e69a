// Conversation workflow - state, checkpointing and the chat pipeline
pub mod state;
pub mod graph;
pub mod checkpoint;

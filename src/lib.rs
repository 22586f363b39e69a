// lib.rs - Threaded chat service: pages, persistence and the model pipeline
pub mod config;
pub mod db;
pub mod error;
pub mod groq_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use axum::{routing::get, Extension, Router};
use handlers::ui::Templates;
use middleware::auth::SessionKeys;
use std::sync::Arc;
use store::ChatStore;
use workflow::graph::ChatPipeline;

// AppState holds the chat store, the conversation pipeline (model + checkpointer), session keys and page templates
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub pipeline: ChatPipeline,
    pub sessions: SessionKeys,
    pub templates: Templates,
    /// False when running on in-process stores.
    pub persistent: bool,
}

/// All routes, with request logging and the shared state attached.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::chat::chat_routes())
        .route("/api/status", get(handlers::status::api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(Extension(state))
}

// src/handlers/chat.rs
use crate::error::AppError;
use crate::middleware::auth::Session;
use crate::models::chat::{Chat, DeleteChatForm, MessageForm};
use crate::workflow::state::Message;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use minijinja::context;
use serde_json::json;
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/chat", get(open_chat))
        .route("/chat/new", post(new_chat))
        .route("/chat/:thread_id", get(show_chat))
        .route("/chat/:thread_id/messages", post(send_message))
        .route("/chats/:chat_id/delete", post(delete_chat))
        .route("/api/threads/:thread_id/checkpoints", get(thread_checkpoints))
}

fn thread_url(thread_id: &str) -> String {
    format!("/chat/{}", thread_id)
}

/// No thread selected: start a fresh one, as the sidebar would with "New Chat".
async fn open_chat(
    session: Session,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let (_, thread_id) = state.store.create_new_chat(session.user_id, None).await?;
    Ok(Redirect::to(&thread_url(&thread_id)))
}

async fn new_chat(
    session: Session,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let (_, thread_id) = state.store.create_new_chat(session.user_id, None).await?;
    Ok(Redirect::to(&thread_url(&thread_id)))
}

/// Resolve `thread_id` to a chat owned by the session user.
async fn owned_chat(state: &AppState, session: &Session, thread_id: &str) -> Result<Option<Chat>, AppError> {
    let chat = state.store.get_chat_by_thread(thread_id).await?;
    match chat {
        Some(chat) if chat.user_id == session.user_id => Ok(Some(chat)),
        Some(_) => {
            tracing::warn!("User {} attempted to open thread {} owned by another user", session.user_id, thread_id);
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Render the whole page from scratch: sidebar, stored history, composer.
async fn render_chat_page(
    state: &AppState,
    session: &Session,
    thread_id: &str,
    pending: Option<&str>,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let chats = state.store.get_user_chats(session.user_id).await?;

    // History is best effort; a failed load renders as an empty conversation
    let messages = match state.pipeline.get_state(thread_id).await {
        Ok(conversation) => conversation.messages,
        Err(e) => {
            tracing::debug!("Could not load history for thread {}: {}", thread_id, e);
            Vec::new()
        }
    };

    state.templates.render(
        "chat.html",
        context! {
            username => &session.username,
            chats => chats,
            active_thread => thread_id,
            messages => messages,
            pending => pending,
            error => error,
        },
    )
}

async fn show_chat(
    session: Session,
    Path(thread_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, AppError> {
    if owned_chat(&state, &session, &thread_id).await?.is_none() {
        return Ok(Redirect::to("/chat").into_response());
    }
    let page = render_chat_page(&state, &session, &thread_id, None, None).await?;
    Ok(page.into_response())
}

async fn send_message(
    session: Session,
    Path(thread_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    if owned_chat(&state, &session, &thread_id).await?.is_none() {
        return Ok(Redirect::to("/chat").into_response());
    }

    let prompt = form.message.trim();
    if prompt.is_empty() {
        return Ok(Redirect::to(&thread_url(&thread_id)).into_response());
    }

    tracing::info!("💬 New message in thread {} from {}", thread_id, session.username);
    match state.pipeline.invoke(&thread_id, Message::user(prompt)).await {
        Ok(_) => {
            state.store.update_chat_timestamp(&thread_id).await?;
            Ok(Redirect::to(&thread_url(&thread_id)).into_response())
        }
        Err(e) => {
            tracing::warn!("Chat turn failed for thread {}: {}", thread_id, e);
            let page = render_chat_page(&state, &session, &thread_id, Some(prompt), Some(format!("Error: {}", e))).await?;
            Ok(page.into_response())
        }
    }
}

async fn delete_chat(
    session: Session,
    Path(chat_id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<DeleteChatForm>,
) -> Result<Redirect, AppError> {
    let chats = state.store.get_user_chats(session.user_id).await?;
    let Some(chat) = chats.into_iter().find(|c| c.chat_id == chat_id) else {
        tracing::warn!("User {} attempted to delete chat {} they do not own", session.user_id, chat_id);
        return Ok(Redirect::to("/chat"));
    };

    // Checkpointed messages for the thread are left in place
    state.store.delete_chat(chat.chat_id).await?;

    // Only return to a thread the user still owns
    let active = form.active.filter(|active| !active.is_empty() && *active != chat.thread_id);
    match active {
        Some(active) if owned_chat(&state, &session, &active).await?.is_some() => {
            Ok(Redirect::to(&thread_url(&active)))
        }
        _ => Ok(Redirect::to("/chat")),
    }
}

/// Checkpoint versions stored for a thread, oldest first.
async fn thread_checkpoints(
    session: Session,
    Path(thread_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, AppError> {
    if owned_chat(&state, &session, &thread_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Chat not found" })),
        )
            .into_response());
    }

    let checkpoints = state.pipeline.get_state_history(&thread_id).await?;
    let versions: Vec<serde_json::Value> = checkpoints
        .iter()
        .map(|c| {
            json!({
                "checkpoint_id": c.checkpoint_id,
                "version": c.version,
                "created_at": c.created_at,
                "message_count": c.state.messages.len(),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "thread_id": thread_id, "checkpoints": versions })).into_response())
}

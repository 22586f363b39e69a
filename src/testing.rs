// Test doubles shared by the unit tests
use crate::groq_client::LlmError;
use crate::handlers::ui::Templates;
use crate::middleware::auth::SessionKeys;
use crate::store::MemoryChatStore;
use crate::workflow::checkpoint::MemoryCheckpointer;
use crate::workflow::graph::{ChatModel, ChatPipeline};
use crate::workflow::state::{Message, Role};
use crate::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Replies `echo: <last user message>` and records how many messages it saw.
#[derive(Default)]
pub struct EchoModel {
    seen: Mutex<Vec<usize>>,
}

impl EchoModel {
    pub async fn seen_lengths(&self) -> Vec<usize> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn invoke(&self, messages: &[Message]) -> Result<Message, LlmError> {
        self.seen.lock().await.push(messages.len());
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(Message::assistant(format!("echo: {last}")))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn invoke(&self, _messages: &[Message]) -> Result<Message, LlmError> {
        Err(LlmError::Api { status: 503, message: "model unavailable".to_string() })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryChatStore>,
    pub checkpointer: Arc<MemoryCheckpointer>,
}

pub fn test_app(model: Arc<dyn ChatModel>) -> TestApp {
    let store = Arc::new(MemoryChatStore::new());
    let checkpointer = Arc::new(MemoryCheckpointer::new());
    let state = Arc::new(AppState {
        store: store.clone(),
        pipeline: ChatPipeline::new(model, checkpointer.clone()),
        sessions: SessionKeys::new("test-secret", 1),
        templates: Templates::new().expect("templates compile"),
        persistent: false,
    });
    TestApp { state, store, checkpointer }
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn form_post(app: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` part of the session `Set-Cookie` header, ready to send back.
pub fn session_cookie(response: &Response) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}

/// Log in through the form and return the session cookie.
pub async fn login(app: &Router, username: &str) -> String {
    let response = form_post(app, "/login", &format!("username={username}"), None).await;
    session_cookie(&response).expect("login sets a session cookie")
}

/// Follow a redirect's `Location` header.
pub fn location(response: &Response) -> String {
    response.headers()[header::LOCATION].to_str().unwrap().to_string()
}

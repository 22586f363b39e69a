// src/error.rs
use crate::middleware::auth::SessionError;
use crate::store::StoreError;
use crate::workflow::graph::PipelineError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

/// Errors that end a request. Model failures during a chat turn are handled
/// in the page instead and never reach this type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();

        tracing::error!(
            error_id = %error_id,
            error = %self,
            "unhandled error occurred"
        );

        // In production, don't expose internal error details
        let detail = if cfg!(debug_assertions) {
            format!("{} (ID: {})", self, error_id)
        } else {
            format!("ID: {}", error_id)
        };

        let body = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Something went wrong</title></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 2rem;">
    <h1>Internal server error</h1>
    <p>{}</p>
    <p><a href="/chat">Back to chat</a></p>
</body>
</html>"#,
            escape(&detail)
        );

        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}

fn escape(text: &str) -> String {
    minijinja::HtmlEscape(text).to_string()
}

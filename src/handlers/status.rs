use crate::AppState;
use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

// API Status endpoint
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = if !state.persistent {
        "in_memory"
    } else {
        match state.store.health_check().await {
            Ok(_) => "healthy",
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                "unhealthy"
            }
        }
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "model": state.pipeline.model_name(),
        }
    }))
}

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::ApiError;
use crate::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Blog Backend API" }))
}

/// Always 200; store problems are reported in the body.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mongo = match &state.interactions {
        None => json!({ "ok": false, "error": null }),
        Some(interactions) => match tokio::time::timeout(PING_TIMEOUT, interactions.ping()).await {
            Ok(Ok(())) => json!({ "ok": true, "error": null }),
            Ok(Err(e)) => json!({ "ok": false, "error": e.to_string() }),
            Err(_) => json!({ "ok": false, "error": "ping timed out" }),
        },
    };

    Json(json!({
        "ok": true,
        "env": { "MONGODB_URI": state.interactions.is_some() },
        "mongo": mongo,
    }))
}

// TODO: list posts once post metadata is stored server-side
pub async fn list_posts() -> Json<Value> {
    Json(json!([]))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_likes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let likes = state.interactions()?.get_likes(&slug).await?;
    Ok(Json(json!({ "likes": likes })))
}

pub async fn like_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let likes = state.interactions()?.like_post(&slug).await?;
    Ok(Json(json!({ "likes": likes })))
}

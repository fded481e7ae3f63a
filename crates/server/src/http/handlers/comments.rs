use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::NewComment;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let comments = state.interactions()?.get_comments(&slug).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    // 先校验再查存储：缺字段永远是 400
    payload.validate()?;

    let added = state.interactions()?.add_comment(&slug, payload).await?;
    tracing::debug!("Comment {} on {}: {:?}", added.comment.id, slug, added.placement);

    Ok(Json(json!({ "success": true, "comment": added.comment })))
}

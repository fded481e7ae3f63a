use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    Json,
};
use domain::ViewerKey;
use serde_json::{json, Value};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn record_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<Value>, ApiError> {
    let interactions = state.interactions()?;

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok());
    let viewer = ViewerKey::resolve(forwarded, peer.map(|ConnectInfo(addr)| addr.ip()));

    let recorded = interactions.record_view(&slug, viewer).await?;
    tracing::debug!("View {}: {:?}", slug, recorded.outcome);

    Ok(Json(json!({ "views": recorded.views })))
}

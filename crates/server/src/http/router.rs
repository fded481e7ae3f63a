use super::handlers::{comments, likes, meta, views};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

fn build_cors(allowed_origins: &str) -> CorsLayer {
    let any = || {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(Any)
            .allow_headers(Any)
    };

    if allowed_origins == "*" {
        return any();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
        any()
    } else {
        tracing::info!("CORS enabled for origins: {:?}", origins);
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(origins)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    Router::new()
        .route("/", get(meta::root))
        .route("/health", get(meta::health))
        .route("/posts.json", get(meta::list_posts))
        .route("/views/:slug", get(views::record_view))
        .route("/likes/:slug", get(likes::get_likes).post(likes::like_post))
        .route(
            "/comments/:slug",
            get(comments::list_comments).post(comments::post_comment),
        )
        .fallback(meta::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(allowed_origins))
        .with_state(state)
}

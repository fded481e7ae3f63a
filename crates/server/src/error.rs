use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::ValidationError;
use storage::StoreError;
use thiserror::Error;

use crate::service::InteractionError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("MONGODB_URI not configured")]
    NotConfigured,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),
    #[error("Parent comment {0} not found")]
    ParentNotFound(String),
    #[error("Not Found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InteractionError> for ApiError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Validation(e) => ApiError::Validation(e),
            InteractionError::ParentNotFound(id) => ApiError::ParentNotFound(id),
            InteractionError::Store(e) => ApiError::Store(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::ParentNotFound(_) | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotConfigured | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

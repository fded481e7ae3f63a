use crate::error::ApiError;
use crate::service::Interactions;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no connection string is configured.
    pub interactions: Option<Interactions>,
}

impl AppState {
    pub fn interactions(&self) -> Result<&Interactions, ApiError> {
        self.interactions.as_ref().ok_or(ApiError::NotConfigured)
    }
}

//! Export error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("No access to organization {0}")]
    NoAccess(String),

    #[error("Unknown report type: {0}")]
    UnknownReport(String),

    /// Store and transport failures; the underlying message is passed through.
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("Failed to render report: {0}")]
    Render(String),
}

impl ExportError {
    /// Only request validation is a 400. Auth, unknown report and store
    /// failures all surface as 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Export failed: {}", message);
        } else {
            warn!("Export rejected: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

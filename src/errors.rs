use crate::relay::Service;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Everything that can go wrong while relaying a request.
///
/// Each variant maps to exactly one status code and renders as `{"detail": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing or mismatching frontend bearer token.
    #[error("Invalid API key")]
    Unauthorized,

    /// Upstream answered with a 4xx/5xx; its status is mirrored back.
    #[error("{} service error: {body}", .service.title())]
    Upstream {
        service: Service,
        status: StatusCode,
        body: String,
    },

    /// Upstream could not be reached, or did not answer in time.
    #[error("Request to {} service failed: {message}", .service.noun())]
    RequestFailed { service: Service, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::Upstream { status, .. } => *status,
            RelayError::RequestFailed { .. } | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

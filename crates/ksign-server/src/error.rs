//! Maps request and pipeline failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ksign_core::{PipelineError, SignatureError};
use thiserror::Error;

/// Message returned when `data` is absent or empty.
pub const MISSING_DATA: &str = "Missing `data` payload.";

/// Request-terminating errors, one per response class.
#[derive(Error, Debug)]
pub enum AppError {
    /// Submitted secret is missing or wrong.
    #[error("Invalid secret.")]
    Authentication,
    /// Envelope or payload is malformed.
    #[error("{0}")]
    Validation(String),
    /// The signing backend failed; the caller may retry later.
    #[error("Signing backend failed.")]
    Signature(#[source] SignatureError),
    /// Anything else; details are logged, not returned.
    #[error("Internal error.")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error class.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Signature(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Signature(err) => AppError::Signature(err),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Authentication => tracing::warn!("rejected request with invalid secret"),
            AppError::Validation(reason) => tracing::info!(%reason, "rejected invalid request"),
            AppError::Signature(err) => tracing::error!(error = %err, "signing backend failed"),
            AppError::Internal(detail) => tracing::error!(%detail, "internal error"),
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_returns_401() {
        assert_eq!(AppError::Authentication.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn validation_returns_400() {
        let response = AppError::Validation(MISSING_DATA.into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn signature_failure_returns_502_without_backend_detail() {
        let err = AppError::from(PipelineError::Signature(SignatureError::Backend(
            "aggregator said no".into(),
        )));
        assert_eq!(err.to_string(), "Signing backend failed.");
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn canonicalization_failure_is_internal() {
        let err = AppError::from(PipelineError::Canonicalization(
            ksign_canonical::CanonicalizationError::Other("boom".into()),
        ));
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

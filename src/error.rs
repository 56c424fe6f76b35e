use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the activity-sync service.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    // ── Credential Errors ───────────────────────────────────────────────
    #[error("No stored credential named '{0}'")]
    MissingCredential(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    // ── Request Errors ──────────────────────────────────────────────────
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    // ── Provider Errors ─────────────────────────────────────────────────
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider {0} not registered")]
    ProviderNotFound(String),

    // ── Crypto Errors ───────────────────────────────────────────────────
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        SyncError::Database(e.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            SyncError::MissingCredential(_) => (StatusCode::NOT_FOUND, "missing_credential"),
            SyncError::RefreshFailed(_) => (StatusCode::BAD_GATEWAY, "refresh_failed"),
            SyncError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            SyncError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SyncError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            SyncError::ProviderError(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            SyncError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "provider_not_found"),
            SyncError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encryption_error"),
            SyncError::Decryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decryption_error"),
            SyncError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            SyncError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

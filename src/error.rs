use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::spotify::SpotifyError;

/// Machine-readable codes for the 401s a client can recover from without a
/// full re-login.
pub const PROVIDER_TOKEN_MISSING: &str = "PROVIDER_TOKEN_MISSING";
pub const PROVIDER_TOKEN_EXPIRED: &str = "PROVIDER_TOKEN_EXPIRED";
pub const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing or rejected identity token.
    Unauthorized(String),
    ProviderTokenMissing,
    ProviderTokenExpired,
    /// No refresh cookie on a refresh request.
    MissingCredential,
    InvalidInput(String),
    /// Token exchange rejected; status and body are the provider's own.
    RefreshFailure { status: u16, body: String },
    Upstream(String),
}

impl From<SpotifyError> for AppError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::Unauthorized => AppError::ProviderTokenExpired,
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::ProviderTokenMissing => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "No Spotify access token found", "code": PROVIDER_TOKEN_MISSING }),
            ),
            AppError::ProviderTokenExpired => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Spotify token expired", "code": PROVIDER_TOKEN_EXPIRED }),
            ),
            AppError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Missing refresh token in cookie", "code": MISSING_CREDENTIAL }),
            ),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::RefreshFailure { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": body }),
            ),
            AppError::Upstream(msg) => {
                tracing::error!(detail = %msg, "upstream request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Upstream request failed" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

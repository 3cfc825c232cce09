//! Refresh-token cookie and the token refresh endpoint.
//!
//! The refresh token only ever travels in an httpOnly cookie, so page script
//! never sees it after sign-in.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap,
    },
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::spotify::SpotifyError;
use crate::AppState;

pub const REFRESH_COOKIE: &str = "refreshToken";
const REFRESH_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 30;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRefreshCookieRequest {
    #[serde(default, deserialize_with = "super::string_or_none")]
    pub refresh_token: Option<String>,
}

/// Reads a cookie by name from every `Cookie` header on the request.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string())
        })
        .filter(|v| !v.is_empty())
}

fn refresh_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        REFRESH_COOKIE,
        urlencoding::encode(value),
        max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/set-refresh-cookie - Move the refresh token into a cookie.
pub async fn set_refresh_cookie(
    State(state): State<AppState>,
    body: Result<Json<SetRefreshCookieRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = body
        .ok()
        .and_then(|Json(req)| req.refresh_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing refresh token".into()))?;

    let cookie = refresh_cookie(&refresh_token, REFRESH_COOKIE_MAX_AGE, state.secure_cookies);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    ))
}

/// POST /api/auth/clear-refresh-cookie - Drop the refresh cookie at sign-out.
pub async fn clear_refresh_cookie(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, refresh_cookie("", 0, state.secure_cookies))]),
        Json(json!({ "success": true })),
    )
}

/// POST /api/spotify/refresh-token - Trade the refresh cookie for a new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let refresh_token = cookie_value(&headers, REFRESH_COOKIE).ok_or(AppError::MissingCredential)?;

    let token = state
        .spotify
        .refresh_access_token(&refresh_token)
        .await
        .map_err(|e| match e {
            SpotifyError::Status { status, body } => {
                tracing::warn!(status, "token refresh rejected by spotify");
                AppError::RefreshFailure { status, body }
            }
            other => AppError::Upstream(other.to_string()),
        })?;

    tracing::debug!(expires_in = token.expires_in, "access token refreshed");

    match token.refresh_token.as_deref() {
        Some(rotated) => {
            let cookie = refresh_cookie(rotated, REFRESH_COOKIE_MAX_AGE, state.secure_cookies);
            Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(token)).into_response())
        }
        None => Ok(Json(token).into_response()),
    }
}

//! HTTP handlers for the SpotiVibe API.

mod auth;
mod catalog;
mod playlists;

pub use auth::{SetRefreshCookieRequest, REFRESH_COOKIE};
pub use catalog::{ArtistSource, ArtistsResponse, SearchRequest, TracksResponse};
pub use playlists::{GenerateRequest, HistoryResponse, SavePlaylistRequest, SavedPlaylist};

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::AppState;

/// A string field that reads as `None` for any other JSON type, so a
/// mistyped field fails validation in the handler instead of in the extractor.
pub(crate) fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// GET /health - Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/set-refresh-cookie", post(auth::set_refresh_cookie))
        .route("/api/auth/clear-refresh-cookie", post(auth::clear_refresh_cookie))
        .route("/api/spotify/refresh-token", post(auth::refresh_token))
        .route("/api/spotify/artists", get(catalog::artists))
        .route("/api/spotify/search-tracks", post(catalog::search_tracks))
        .route("/api/spotify/generate-playlists", post(playlists::generate))
        .route("/api/spotify/save-playlist", post(playlists::save))
        .route("/api/playlists/history", get(playlists::history))
}

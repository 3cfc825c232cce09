//! Playlist generation, saving, and history.

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::TracksResponse;
use crate::auth::{AuthContext, Identity};
use crate::error::AppError;
use crate::history::{NewPlaylistRecord, PlaylistRecord};
use crate::playlist::{self, dedup_tracks};
use crate::spotify::Track;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub artist_ids: Vec<String>,
    #[serde(default)]
    pub include_related: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavePlaylistRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// A playlist created on Spotify. `history_id` is absent when the history
/// row could not be written.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedPlaylist {
    pub id: String,
    pub name: String,
    pub track_count: u32,
    pub spotify_url: String,
    #[serde(default)]
    pub history_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub playlists: Vec<PlaylistRecord>,
}

fn default_playlist_name(date: NaiveDate) -> String {
    format!("Your Playlist - {}", date.format("%Y-%m-%d"))
}

/// POST /api/spotify/generate-playlists - Build a random candidate playlist.
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<TracksResponse>, AppError> {
    let fan_out = playlist::collect_tracks(
        &state.spotify,
        &auth.provider_token,
        &req.artist_ids,
        req.include_related,
    )
    .await?;

    if !fan_out.failed_artist_ids.is_empty() {
        info!(failed = ?fan_out.failed_artist_ids, "some artists contributed no tracks");
    }

    let collected = fan_out.tracks.len();
    let tracks = playlist::sample(fan_out.tracks, &mut rand::thread_rng());

    info!(
        user = %auth.identity.user.id,
        artists = req.artist_ids.len(),
        include_related = req.include_related,
        collected,
        returned = tracks.len(),
        "playlist generated"
    );
    Ok(Json(TracksResponse { tracks }))
}

/// POST /api/spotify/save-playlist - Write the edited track list to Spotify.
pub async fn save(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SavePlaylistRequest>,
) -> Result<Json<SavedPlaylist>, AppError> {
    let tracks = dedup_tracks(req.tracks);
    if tracks.is_empty() {
        return Err(AppError::InvalidInput("No tracks to save".into()));
    }

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_playlist_name(Utc::now().date_naive()));

    let token = &auth.provider_token;
    let owner = state.spotify.current_user(token).await?;
    let created = state.spotify.create_playlist(token, &owner.id, &name).await?;

    let uris: Vec<String> = tracks.iter().map(Track::uri).collect();
    state.spotify.add_tracks(token, &created.id, &uris).await?;

    let spotify_url = created
        .external_urls
        .spotify
        .clone()
        .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", created.id));
    let track_count = u32::try_from(uris.len()).unwrap_or(u32::MAX);

    let history_id = match state
        .history
        .record(
            &auth.identity.token,
            &NewPlaylistRecord {
                user_id: &auth.identity.user.id,
                name: &created.name,
                track_count,
                spotify_url: &spotify_url,
                spotify_playlist_id: &created.id,
            },
        )
        .await
    {
        Ok(record) => Some(record.id),
        Err(e) => {
            warn!(playlist_id = %created.id, error = %e, "playlist saved but history not recorded");
            None
        }
    };

    info!(
        user = %auth.identity.user.id,
        playlist_id = %created.id,
        track_count,
        "playlist saved"
    );

    Ok(Json(SavedPlaylist {
        id: created.id,
        name: created.name,
        track_count,
        spotify_url,
        history_id,
    }))
}

/// GET /api/playlists/history - The signed-in user's recent playlists.
pub async fn history(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<HistoryResponse>, AppError> {
    let playlists = state
        .history
        .recent(&identity.token, &identity.user.id)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(HistoryResponse { playlists }))
}

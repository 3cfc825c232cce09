//! Artist listing and track search.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::playlist::artists_from_recently_played;
use crate::spotify::{Artist, Track};
use crate::AppState;

/// Where the artist list comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistSource {
    #[default]
    Top,
    Recent,
}

impl ArtistSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtistSource::Top => "top",
            ArtistSource::Recent => "recent",
        }
    }

    fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            None | Some("top") => Ok(ArtistSource::Top),
            Some("recent") => Ok(ArtistSource::Recent),
            Some(other) => Err(AppError::InvalidInput(format!(
                "unknown source '{}', expected 'top' or 'recent'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtistsQuery {
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtistsResponse {
    pub artists: Vec<Artist>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, deserialize_with = "super::string_or_none")]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Track>,
}

/// GET /api/spotify/artists - Top artists, or artists derived from recent plays.
pub async fn artists(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ArtistsQuery>,
) -> Result<Json<ArtistsResponse>, AppError> {
    let source = ArtistSource::parse(params.source.as_deref())?;

    let artists = match source {
        ArtistSource::Top => state.spotify.top_artists(&auth.provider_token).await?,
        ArtistSource::Recent => {
            let items = state.spotify.recently_played(&auth.provider_token).await?;
            artists_from_recently_played(&items)
        }
    };

    tracing::debug!(
        user = %auth.identity.user.id,
        source = source.as_str(),
        count = artists.len(),
        "artists fetched"
    );
    Ok(Json(ArtistsResponse { artists }))
}

/// POST /api/spotify/search-tracks - Search the catalog for tracks to add.
pub async fn search_tracks(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<TracksResponse>, AppError> {
    let query = body
        .ok()
        .and_then(|Json(req)| req.query)
        .unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Missing or invalid query".into()));
    }

    let tracks = state
        .spotify
        .search_tracks(&auth.provider_token, query)
        .await?;

    Ok(Json(TracksResponse { tracks }))
}

//! Spotify payloads, reshaped into the simplified schema served to the browser.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// An artist as listed on the selection screen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackArtist {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Minimal track schema: everything the preview and the save flow need.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Track {
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }
}

/// Token endpoint response, returned to the browser as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

// ---------------------------------------------------------------------------
// Raw response envelopes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(crate) struct ArtistsPage {
    #[serde(default)]
    pub items: Vec<Artist>,
}

#[derive(Deserialize)]
pub(crate) struct RecentlyPlayedPage {
    #[serde(default)]
    pub items: Vec<PlayHistoryItem>,
}

/// One entry of the recently played list.
#[derive(Clone, Debug, Deserialize)]
pub struct PlayHistoryItem {
    pub track: PlayedTrack,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlayedTrack {
    #[serde(default)]
    pub artists: Vec<PlayedArtist>,
}

/// Artist credit on a played track. Local files carry no catalog id.
#[derive(Clone, Debug, Deserialize)]
pub struct PlayedArtist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl PlayedArtist {
    /// The catalog artist, or `None` for a local file.
    pub fn to_artist(&self) -> Option<Artist> {
        Some(Artist {
            id: self.id.clone().filter(|id| !id.is_empty())?,
            name: self.name.clone(),
            images: self.images.clone(),
            genres: self.genres.clone(),
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<TracksPage>,
}

#[derive(Deserialize)]
pub(crate) struct TracksPage {
    #[serde(default)]
    pub items: Vec<Track>,
}

#[derive(Deserialize)]
pub(crate) struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Deserialize)]
pub(crate) struct RelatedArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Artist>,
}

//! Spotify Web API client.
//!
//! Catalog and playlist calls run on behalf of the signed-in user, so every
//! call takes the user's access token. Only the refresh-token exchange uses the
//! server-held client credentials.

mod models;

pub use models::*;

use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

pub const SEARCH_LIMIT: usize = 10;
const LIST_LIMIT: u32 = 50;
const MARKET: &str = "US";
const ADD_TRACKS_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Spotify answered 401: the user's access token is expired or revoked.
    #[error("spotify rejected the access token")]
    Unauthorized,

    #[error("spotify returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("spotify request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse spotify response: {0}")]
    Parse(String),
}

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    accounts_base: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_urls(client_id, client_secret, API_BASE, ACCOUNTS_BASE)
    }

    pub fn with_base_urls(
        client_id: String,
        client_secret: String,
        api_base: &str,
        accounts_base: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            accounts_base: accounts_base.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// A rejected exchange comes back as [`SpotifyError::Status`] carrying the
    /// provider's status and body untouched, 401 included.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, SpotifyError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let auth = base64::engine::general_purpose::STANDARD.encode(
            format!("{}:{}", self.client_id, self.client_secret).as_bytes(),
        );

        let res = self
            .client
            .post(format!("{}/api/token", self.accounts_base))
            .header("Authorization", format!("Basic {}", auth))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(SpotifyError::Status { status, body });
        }

        res.json()
            .await
            .map_err(|e| SpotifyError::Parse(format!("token: {}", e)))
    }

    /// The user's short-term top artists.
    pub async fn top_artists(&self, token: &str) -> Result<Vec<Artist>, SpotifyError> {
        let url = format!(
            "{}/me/top/artists?limit={}&time_range=short_term",
            self.api_base, LIST_LIMIT
        );
        let page: ArtistsPage = self.get_json(&url, token).await?;
        Ok(page.items)
    }

    /// The user's recently played items, most recent first.
    pub async fn recently_played(
        &self,
        token: &str,
    ) -> Result<Vec<PlayHistoryItem>, SpotifyError> {
        let url = format!(
            "{}/me/player/recently-played?limit={}",
            self.api_base, LIST_LIMIT
        );
        let page: RecentlyPlayedPage = self.get_json(&url, token).await?;
        Ok(page.items)
    }

    /// Search the catalog for tracks. Never returns more than [`SEARCH_LIMIT`].
    pub async fn search_tracks(&self, token: &str, q: &str) -> Result<Vec<Track>, SpotifyError> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base,
            urlencoding::encode(q),
            SEARCH_LIMIT
        );
        let body: SearchResponse = self.get_json(&url, token).await?;
        let mut tracks = body.tracks.map(|page| page.items).unwrap_or_default();
        tracks.truncate(SEARCH_LIMIT);
        Ok(tracks)
    }

    pub async fn artist_top_tracks(
        &self,
        token: &str,
        artist_id: &str,
    ) -> Result<Vec<Track>, SpotifyError> {
        let url = format!(
            "{}/artists/{}/top-tracks?market={}",
            self.api_base,
            urlencoding::encode(artist_id),
            MARKET
        );
        let body: TopTracksResponse = self.get_json(&url, token).await?;
        Ok(body.tracks)
    }

    pub async fn related_artists(
        &self,
        token: &str,
        artist_id: &str,
    ) -> Result<Vec<Artist>, SpotifyError> {
        let url = format!(
            "{}/artists/{}/related-artists",
            self.api_base,
            urlencoding::encode(artist_id)
        );
        let body: RelatedArtistsResponse = self.get_json(&url, token).await?;
        Ok(body.artists)
    }

    pub async fn current_user(&self, token: &str) -> Result<SpotifyUser, SpotifyError> {
        let url = format!("{}/me", self.api_base);
        self.get_json(&url, token).await
    }

    /// Creates an empty private playlist owned by `user_id`.
    pub async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<CreatedPlaylist, SpotifyError> {
        let url = format!(
            "{}/users/{}/playlists",
            self.api_base,
            urlencoding::encode(user_id)
        );
        let body = serde_json::json!({
            "name": name,
            "description": "Created with SpotiVibe",
            "public": false,
        });
        self.post_json(&url, token, &body).await
    }

    /// Appends track URIs to a playlist, in batches the API accepts.
    pub async fn add_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        for batch in uris.chunks(ADD_TRACKS_BATCH) {
            let _: serde_json::Value = self
                .post_json(&url, token, &serde_json::json!({ "uris": batch }))
                .await?;
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, SpotifyError> {
        let res = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        Self::parse(Self::check(res).await?).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<T, SpotifyError> {
        let res = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", token))
            .json(body)
            .send()
            .await?;

        Self::parse(Self::check(res).await?).await
    }

    async fn check(res: Response) -> Result<Response, SpotifyError> {
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SpotifyError::Unauthorized);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    async fn parse<T: DeserializeOwned>(res: Response) -> Result<T, SpotifyError> {
        let url = res.url().path().to_string();
        res.json()
            .await
            .map_err(|e| SpotifyError::Parse(format!("{}: {}", url, e)))
    }
}

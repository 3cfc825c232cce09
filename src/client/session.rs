use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::{ApiClient, ClientError, RequestOptions, TokenKey, TokenStore};
use crate::handlers::{
    ArtistSource, ArtistsResponse, GenerateRequest, HistoryResponse, SavePlaylistRequest,
    SavedPlaylist, SearchRequest, SetRefreshCookieRequest, TracksResponse,
};
use crate::history::PlaylistRecord;
use crate::playlist::PlaylistDraft;
use crate::spotify::{Artist, Track};

/// A signed-in user's view of the API. Tokens are read from the store on
/// every call, so a refresh by one call is seen by the next.
#[derive(Clone)]
pub struct Session {
    client: ApiClient,
}

impl Session {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client: ApiClient::new(base_url, store),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn store(&self) -> &dyn TokenStore {
        &**self.client.store()
    }

    /// Stores the tokens handed back on the OAuth redirect. Returns whether the
    /// session now holds a complete credential set.
    pub fn sign_in_from_redirect(&self, fragment: &str) -> bool {
        self.store().populate_from_fragment(fragment);
        self.store().credentials().is_some()
    }

    /// Forgets the local credentials, then has the server expire the refresh
    /// cookie. The local store is cleared even when the server call fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.store().clear();
        self.client.clear_refresh_cookie().await
    }

    pub fn is_signed_in(&self) -> bool {
        self.store().credentials().is_some()
    }

    /// Hands the refresh token to the server, which keeps it in an httpOnly cookie.
    pub async fn register_refresh_cookie(&self) -> Result<(), ClientError> {
        let body = SetRefreshCookieRequest {
            refresh_token: self.store().get(TokenKey::ProviderRefresh),
        };
        let _: serde_json::Value = self
            .call_as_user(
                "/api/auth/set-refresh-cookie",
                RequestOptions::post().json(&body)?,
            )
            .await?;
        Ok(())
    }

    pub async fn artists(&self, source: ArtistSource) -> Result<Vec<Artist>, ClientError> {
        let endpoint = format!("/api/spotify/artists?source={}", source.as_str());
        let res: ArtistsResponse = self.call(&endpoint, RequestOptions::get()).await?;
        Ok(res.artists)
    }

    pub async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, ClientError> {
        let body = SearchRequest {
            query: Some(query.to_string()),
        };
        let res: TracksResponse = self
            .call(
                "/api/spotify/search-tracks",
                RequestOptions::post().json(&body)?,
            )
            .await?;
        Ok(res.tracks)
    }

    /// Generates a candidate playlist, ready for editing.
    pub async fn generate_playlist(
        &self,
        artist_ids: &[String],
        include_related: bool,
    ) -> Result<PlaylistDraft, ClientError> {
        let body = GenerateRequest {
            artist_ids: artist_ids.to_vec(),
            include_related,
        };
        let res: TracksResponse = self
            .call(
                "/api/spotify/generate-playlists",
                RequestOptions::post().json(&body)?,
            )
            .await?;
        Ok(PlaylistDraft::new(res.tracks))
    }

    pub async fn save_playlist(
        &self,
        name: &str,
        draft: &PlaylistDraft,
    ) -> Result<SavedPlaylist, ClientError> {
        let body = SavePlaylistRequest {
            name: Some(name.to_string()),
            tracks: draft.tracks().to_vec(),
        };
        self.call(
            "/api/spotify/save-playlist",
            RequestOptions::post().json(&body)?,
        )
        .await
    }

    pub async fn history(&self) -> Result<Vec<PlaylistRecord>, ClientError> {
        let res: HistoryResponse = self
            .call_as_user("/api/playlists/history", RequestOptions::get())
            .await?;
        Ok(res.playlists)
    }

    /// Calls a Spotify-backed route. Requires the complete credential set; a
    /// partial set counts as signed out.
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let credentials = self.store().credentials().ok_or_else(|| {
            match self.store().get(TokenKey::Identity) {
                Some(_) => ClientError::IncompleteCredentials,
                None => ClientError::MissingIdentityToken,
            }
        })?;

        self.dispatch(
            endpoint,
            options,
            Some(&credentials.identity_token),
            Some(&credentials.provider_access_token),
        )
        .await
    }

    /// Calls a route that only needs the identity token.
    async fn call_as_user<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let identity = self.store().get(TokenKey::Identity);
        self.dispatch(endpoint, options, identity.as_deref(), None)
            .await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        identity: Option<&str>,
        provider: Option<&str>,
    ) -> Result<T, ClientError> {
        let res = self.client.send(endpoint, options, identity, provider).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json().await?)
    }
}

//! Client for the SpotiVibe API.
//!
//! Every request carries the identity token as a bearer credential and, when
//! available, the Spotify access token in `X-Spotify-Token`. A 401 on a request
//! that carried a Spotify token triggers one token refresh and one replay of
//! the request; nothing is retried twice.

mod session;
mod token_store;

pub use session::Session;
pub use token_store::{Credentials, MemoryTokenStore, TokenKey, TokenStore};

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::PROVIDER_TOKEN_HEADER;
use crate::handlers::REFRESH_COOKIE;
use crate::spotify::TokenResponse;

pub const REFRESH_ENDPOINT: &str = "/api/spotify/refresh-token";
pub const CLEAR_COOKIE_ENDPOINT: &str = "/api/auth/clear-refresh-cookie";

#[derive(Debug, Error)]
pub enum ClientError {
    /// No identity token: the caller is not signed in. No request was sent.
    #[error("no identity token; sign in first")]
    MissingIdentityToken,

    /// Some but not all session credentials are stored. No request was sent.
    #[error("incomplete credentials; sign in again")]
    IncompleteCredentials,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The refresh endpoint refused to mint a new access token.
    #[error("token refresh failed ({status}): {body}")]
    RefreshFailed { status: u16, body: String },

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("failed to encode or decode body: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Method, extra headers and body of one request. Kept around so the request
/// can be replayed unchanged after a refresh.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// HTTP client for the SpotiVibe API with the one-shot refresh policy.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    /// Sends a request, refreshing the Spotify token and replaying once on 401.
    ///
    /// Fails with [`ClientError::MissingIdentityToken`] before any network I/O
    /// when `identity_token` is `None`. A failed refresh is returned as-is; a
    /// 401 on the replay is handed back as the response.
    pub async fn send(
        &self,
        endpoint: &str,
        options: RequestOptions,
        identity_token: Option<&str>,
        provider_token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let identity_token = identity_token.ok_or(ClientError::MissingIdentityToken)?;
        let url = self.url(endpoint);

        let res = self
            .issue(&url, &options, identity_token, provider_token)
            .await?;

        if provider_token.is_none() || res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res);
        }

        warn!(endpoint, "spotify token rejected, refreshing");
        let fresh = self.refresh().await?;
        self.issue(&url, &options, identity_token, Some(&fresh)).await
    }

    async fn issue(
        &self,
        url: &str,
        options: &RequestOptions,
        identity_token: &str,
        provider_token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let headers = request_headers(&options.headers, identity_token, provider_token)?;
        let mut req = self
            .http
            .request(options.method.clone(), url)
            .headers(headers);
        if let Some(body) = &options.body {
            req = req.body(body.clone());
        }
        debug!(method = %options.method, url, "sending request");
        Ok(req.send().await?)
    }

    /// Mints a new Spotify access token and stores it before returning it.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let mut req = self.http.post(self.url(REFRESH_ENDPOINT));
        if let Some(refresh_token) = self.store.get(TokenKey::ProviderRefresh) {
            req = req.header(
                COOKIE,
                format!("{}={}", REFRESH_COOKIE, urlencoding::encode(&refresh_token)),
            );
        }

        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::RefreshFailed { status, body });
        }

        let token: TokenResponse = res.json().await?;
        self.store
            .set(TokenKey::ProviderAccess, token.access_token.clone());
        if let Some(rotated) = token.refresh_token {
            self.store.set(TokenKey::ProviderRefresh, rotated);
        }
        Ok(token.access_token)
    }

    /// Asks the server to expire the refresh cookie.
    pub async fn clear_refresh_cookie(&self) -> Result<(), ClientError> {
        let res = self.http.post(self.url(CLEAR_COOKIE_ENDPOINT)).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(())
    }
}

/// Caller headers plus the injected credentials. Content type defaults to JSON.
fn request_headers(
    base: &HeaderMap,
    identity_token: &str,
    provider_token: Option<&str>,
) -> Result<HeaderMap, ClientError> {
    let mut headers = base.clone();
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", identity_token))?);
    if let Some(token) = provider_token {
        headers.insert(
            HeaderName::from_static(PROVIDER_TOKEN_HEADER),
            header_value(token)?,
        );
    }
    headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader(e.to_string()))
}

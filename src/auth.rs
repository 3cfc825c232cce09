//! Identity verification against the auth provider, and the extractors that
//! gate every catalog and playlist route.
//!
//! The identity token is verified with the user's own JWT and the public anon
//! key (`GET /auth/v1/user`); no service-role credential is ever held by the
//! web tier.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::{error::AppError, AppState};

/// Header carrying the user's Spotify access token alongside the identity token.
pub const PROVIDER_TOKEN_HEADER: &str = "x-spotify-token";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity token rejected with status {0}")]
    Rejected(u16),

    #[error("identity request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse identity response: {0}")]
    Parse(String),
}

/// The signed-in user, as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, anon_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    /// Resolves an identity token to its user. Any non-2xx is a rejection.
    pub async fn verify(&self, token: &str) -> Result<User, IdentityError> {
        let res = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(IdentityError::Rejected(res.status().as_u16()));
        }

        res.json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }
}

/// Extracts `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn provider_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(PROVIDER_TOKEN_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// A verified identity token and its user.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("No authorization header".into()))?
            .to_string();

        match state.identity.verify(&token).await {
            Ok(user) => Ok(Identity { user, token }),
            Err(IdentityError::Rejected(status)) => {
                tracing::warn!(status, "identity token rejected");
                Err(AppError::Unauthorized("Unauthorized".into()))
            }
            Err(e) => Err(AppError::Upstream(e.to_string())),
        }
    }
}

/// A verified identity plus the Spotify access token to call the catalog with.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    pub provider_token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let identity = Identity::from_request_parts(parts, state).await?;
        let provider_token = provider_token(&parts.headers).ok_or(AppError::ProviderTokenMissing)?;
        Ok(AuthContext {
            identity,
            provider_token,
        })
    }
}

//! SpotiVibe: build playlists from your Spotify listening.
//!
//! The HTTP side validates the caller's identity, forwards to the Spotify Web
//! API and reshapes the responses. The [`client`] module is the counterpart
//! used by callers of that API: it owns the session tokens and refreshes an
//! expired Spotify token once per request.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod playlist;
pub mod spotify;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::IdentityClient;
use crate::config::Config;
use crate::history::HistoryStore;
use crate::spotify::SpotifyClient;

/// Shared, cheaply clonable handles to the upstream services.
#[derive(Clone)]
pub struct AppState {
    pub spotify: SpotifyClient,
    pub identity: IdentityClient,
    pub history: HistoryStore,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            spotify: SpotifyClient::with_base_urls(
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
                &config.spotify_api_base,
                &config.spotify_accounts_base,
            ),
            identity: IdentityClient::new(&config.supabase_url, config.supabase_anon_key.clone()),
            history: HistoryStore::new(&config.supabase_url, config.supabase_anon_key.clone()),
            secure_cookies: config.secure_cookies,
        }
    }
}

/// The full application router with request tracing.
pub fn app(state: AppState) -> Router {
    handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

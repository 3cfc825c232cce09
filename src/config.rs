use std::env;

use crate::spotify::{ACCOUNTS_BASE, API_BASE};

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_api_base: String,
    pub spotify_accounts_base: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Adds `Secure` to the refresh cookie. Enable behind HTTPS.
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} is required", key))
        };

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let secure_cookies = lookup("SECURE_COOKIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Ok(Self {
            port,
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            spotify_api_base: lookup("SPOTIFY_API_BASE").unwrap_or_else(|| API_BASE.into()),
            spotify_accounts_base: lookup("SPOTIFY_ACCOUNTS_BASE")
                .unwrap_or_else(|| ACCOUNTS_BASE.into()),
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            secure_cookies,
        })
    }
}

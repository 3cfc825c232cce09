//! Session credentials held by the caller of the API.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// The three credentials a session holds, each under a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Identity,
    ProviderAccess,
    ProviderRefresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 3] = [
        TokenKey::Identity,
        TokenKey::ProviderAccess,
        TokenKey::ProviderRefresh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKey::Identity => "identity_token",
            TokenKey::ProviderAccess => "provider_access_token",
            TokenKey::ProviderRefresh => "provider_refresh_token",
        }
    }
}

/// A complete credential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity_token: String,
    pub provider_access_token: String,
    pub provider_refresh_token: String,
}

/// Storage for session credentials: populated at sign-in, read on every call,
/// cleared at sign-out.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Option<String>;
    fn set(&self, key: TokenKey, value: String);
    fn clear(&self);

    /// All three credentials, or `None` if any is missing.
    fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            identity_token: self.get(TokenKey::Identity)?,
            provider_access_token: self.get(TokenKey::ProviderAccess)?,
            provider_refresh_token: self.get(TokenKey::ProviderRefresh)?,
        })
    }

    /// Stores the tokens from an OAuth redirect fragment
    /// (`#access_token=..&provider_token=..&provider_refresh_token=..`).
    /// Returns how many credentials were written.
    fn populate_from_fragment(&self, fragment: &str) -> usize {
        let params = parse_fragment(fragment);
        let refresh = params
            .get("provider_refresh_token")
            .or_else(|| params.get("refresh_token"));

        let found = [
            (TokenKey::Identity, params.get("access_token")),
            (TokenKey::ProviderAccess, params.get("provider_token")),
            (TokenKey::ProviderRefresh, refresh),
        ];

        let mut written = 0;
        for (key, value) in found {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                self.set(key, value.clone());
                written += 1;
            }
        }
        written
    }
}

fn parse_fragment(fragment: &str) -> HashMap<String, String> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(k, v)| {
            let v = urlencoding::decode(v).ok()?;
            Some((k.to_string(), v.into_owned()))
        })
        .collect()
}

/// In-process store shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    values: Arc<RwLock<HashMap<&'static str, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::new();
        store.set(TokenKey::Identity, credentials.identity_token);
        store.set(TokenKey::ProviderAccess, credentials.provider_access_token);
        store.set(TokenKey::ProviderRefresh, credentials.provider_refresh_token);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: TokenKey, value: String) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.as_str(), value);
    }

    fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

//! Playlist history, stored in the auth provider's `playlists` table.
//!
//! Requests carry the user's own JWT so row-level security scopes every read
//! and write to the signed-in user. Records are append-only.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of records shown in the history panel.
pub const HISTORY_LIMIT: usize = 10;

const TABLE: &str = "playlists";
const COLUMNS: &str = "id,name,track_count,spotify_url,created_at";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse history response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub id: String,
    pub name: String,
    pub track_count: u32,
    pub spotify_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NewPlaylistRecord<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub track_count: u32,
    pub spotify_url: &'a str,
    pub spotify_playlist_id: &'a str,
}

#[derive(Clone)]
pub struct HistoryStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HistoryStore {
    pub fn new(base_url: &str, anon_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    /// Appends a record and returns it as stored.
    pub async fn record(
        &self,
        token: &str,
        record: &NewPlaylistRecord<'_>,
    ) -> Result<PlaylistRecord, HistoryError> {
        let res = self
            .client
            .post(self.table_url())
            .query(&[("select", COLUMNS)])
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Prefer", "return=representation")
            .json(&[record])
            .send()
            .await?;

        let rows: Vec<PlaylistRecord> = Self::parse(res).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| HistoryError::Parse("insert returned no rows".into()))
    }

    /// The user's most recent records, newest first.
    pub async fn recent(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<PlaylistRecord>, HistoryError> {
        let user_filter = format!("eq.{}", user_id);
        let limit = HISTORY_LIMIT.to_string();
        let res = self
            .client
            .get(self.table_url())
            .query(&[
                ("select", COLUMNS),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let mut rows: Vec<PlaylistRecord> = Self::parse(res).await?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(HISTORY_LIMIT);
        Ok(rows)
    }

    async fn parse(res: reqwest::Response) -> Result<Vec<PlaylistRecord>, HistoryError> {
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(HistoryError::Status { status, body });
        }
        res.json()
            .await
            .map_err(|e| HistoryError::Parse(e.to_string()))
    }
}

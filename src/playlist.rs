//! Playlist generation: fan out over the selected artists, dedupe, sample.

use std::collections::HashSet;
use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::spotify::{Artist, PlayHistoryItem, PlayedArtist, SpotifyClient, SpotifyError, Track};

pub const MAX_PLAYLIST_TRACKS: usize = 50;
pub const RELATED_ARTISTS_PER_ARTIST: usize = 2;
pub const TRACKS_PER_RELATED_ARTIST: usize = 3;

/// Keeps the first item for every key, preserving traversal order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

pub fn dedup_tracks(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    dedup_by_key(tracks, |t| t.id.clone())
}

/// Every distinct artist across the played tracks, in order of first appearance.
/// Artists of local files have no id and are skipped.
pub fn artists_from_recently_played(items: &[PlayHistoryItem]) -> Vec<Artist> {
    dedup_by_key(
        items
            .iter()
            .flat_map(|item| item.track.artists.iter())
            .filter_map(PlayedArtist::to_artist),
        |a| a.id.clone(),
    )
}

/// Dedupes, shuffles and caps the collected tracks.
pub fn sample<R: Rng + ?Sized>(tracks: Vec<Track>, rng: &mut R) -> Vec<Track> {
    let mut tracks = dedup_tracks(tracks);
    tracks.shuffle(rng);
    tracks.truncate(MAX_PLAYLIST_TRACKS);
    tracks
}

/// Result of the best-effort fan-out. Failed fetches contribute no tracks and
/// are listed by the artist id whose fetch failed.
#[derive(Debug, Default)]
pub struct FanOut {
    pub tracks: Vec<Track>,
    pub failed_artist_ids: Vec<String>,
}

/// Collects candidate tracks for the selected artists, in input order.
///
/// Each artist contributes all of its top tracks. With `include_related`, the
/// first two related artists contribute up to three top tracks each. A 401 on a
/// selected artist's top tracks means the access token expired and aborts the
/// whole fan-out; every other failure is recorded and skipped.
pub async fn collect_tracks(
    spotify: &SpotifyClient,
    token: &str,
    artist_ids: &[String],
    include_related: bool,
) -> Result<FanOut, SpotifyError> {
    let mut out = FanOut::default();

    for artist_id in artist_ids {
        match spotify.artist_top_tracks(token, artist_id).await {
            Ok(tracks) => out.tracks.extend(tracks),
            Err(SpotifyError::Unauthorized) => return Err(SpotifyError::Unauthorized),
            Err(e) => {
                warn!(artist_id = %artist_id, error = %e, "top tracks unavailable");
                out.failed_artist_ids.push(artist_id.clone());
            }
        }

        if include_related {
            collect_related(spotify, token, artist_id, &mut out).await;
        }
    }

    Ok(out)
}

async fn collect_related(spotify: &SpotifyClient, token: &str, artist_id: &str, out: &mut FanOut) {
    let related = match spotify.related_artists(token, artist_id).await {
        Ok(related) => related,
        Err(e) => {
            debug!(artist_id = %artist_id, error = %e, "related artists unavailable");
            out.failed_artist_ids.push(artist_id.to_string());
            return;
        }
    };

    for related_artist in related.iter().take(RELATED_ARTISTS_PER_ARTIST) {
        match spotify.artist_top_tracks(token, &related_artist.id).await {
            Ok(tracks) => out
                .tracks
                .extend(tracks.into_iter().take(TRACKS_PER_RELATED_ARTIST)),
            Err(e) => {
                debug!(artist_id = %related_artist.id, error = %e, "related top tracks unavailable");
                out.failed_artist_ids.push(related_artist.id.clone());
            }
        }
    }
}

/// The user's working copy of a generated playlist, edited before saving.
#[derive(Debug, Clone, Default)]
pub struct PlaylistDraft {
    tracks: Vec<Track>,
}

impl PlaylistDraft {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: dedup_tracks(tracks),
        }
    }

    /// Appends a track. Returns false if a track with the same id is present.
    pub fn add(&mut self, track: Track) -> bool {
        if self.contains(&track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(pos))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::spotify::{Album, PlayedTrack, TrackArtist};

    fn track(id: &str, name: &str) -> Track {
        Track {
            id: id.into(),
            name: name.into(),
            artists: vec![TrackArtist { name: "X".into() }],
            album: Album::default(),
            preview_url: None,
        }
    }

    fn artist(id: &str) -> Artist {
        Artist {
            id: id.into(),
            name: format!("Artist {}", id),
            images: vec![],
            genres: vec![],
        }
    }

    fn played(id: Option<&str>) -> PlayedArtist {
        PlayedArtist {
            id: id.map(String::from),
            name: format!("Artist {}", id.unwrap_or("local")),
            images: vec![],
            genres: vec![],
        }
    }

    fn ids(tracks: &[Track]) -> HashSet<String> {
        tracks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn dedup_keeps_lowest_index_copy() {
        let out = dedup_tracks(vec![
            track("a", "first a"),
            track("b", "first b"),
            track("a", "second a"),
            track("c", "c"),
            track("b", "second b"),
        ]);

        let names: Vec<_> = out.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["first a", "first b", "c"]);
    }

    #[test]
    fn recently_played_shared_artist_counted_once() {
        let items = vec![
            PlayHistoryItem {
                track: PlayedTrack {
                    artists: vec![played(Some("solo1")), played(Some("feat"))],
                },
            },
            PlayHistoryItem {
                track: PlayedTrack {
                    artists: vec![played(Some("feat")), played(Some("solo2"))],
                },
            },
        ];

        let artists = artists_from_recently_played(&items);
        let order: Vec<_> = artists.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, ["solo1", "feat", "solo2"]);
    }

    #[test]
    fn local_file_artists_are_skipped() {
        let items = vec![
            PlayHistoryItem {
                track: PlayedTrack {
                    artists: vec![played(None)],
                },
            },
            PlayHistoryItem {
                track: PlayedTrack {
                    artists: vec![played(Some("a1")), played(None)],
                },
            },
        ];

        let artists = artists_from_recently_played(&items);
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].id, "a1");
        assert_eq!(artists[0].name, "Artist a1");
    }

    #[test]
    fn sample_caps_at_fifty_unique_tracks() {
        let mut input: Vec<Track> = (0..80).map(|i| track(&format!("t{}", i), "n")).collect();
        input.extend((0..20).map(|i| track(&format!("t{}", i), "dup")));

        let out = sample(input.clone(), &mut rand::thread_rng());

        assert_eq!(out.len(), MAX_PLAYLIST_TRACKS);
        assert_eq!(ids(&out).len(), MAX_PLAYLIST_TRACKS);
        assert!(ids(&out).is_subset(&ids(&input)));
        assert!(out.iter().all(|t| t.name == "n"));
    }

    #[test]
    fn sample_of_small_list_keeps_every_track() {
        let input = vec![track("a", "a"), track("b", "b"), track("a", "a2")];
        let out = sample(input, &mut StdRng::seed_from_u64(7));
        assert_eq!(ids(&out), HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn sample_of_nothing_is_empty() {
        assert!(sample(vec![], &mut rand::thread_rng()).is_empty());
    }

    #[test]
    fn draft_add_and_remove() {
        let mut draft = PlaylistDraft::new(vec![track("a", "a"), track("a", "again")]);
        assert_eq!(draft.len(), 1);

        assert!(draft.add(track("b", "b")));
        assert!(!draft.add(track("b", "b again")));
        assert_eq!(draft.len(), 2);

        assert_eq!(draft.remove("a").map(|t| t.name), Some("a".to_string()));
        assert!(draft.remove("a").is_none());
        assert!(!draft.contains("a"));
        assert_eq!(draft.into_tracks()[0].id, "b");
    }

    // -----------------------------------------------------------------------
    // Fan-out against a mock Spotify
    // -----------------------------------------------------------------------

    fn tracks_body(prefix: &str, n: usize) -> serde_json::Value {
        let tracks: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "id": format!("{}-{}", prefix, i),
                    "name": format!("{} {}", prefix, i),
                    "artists": [{ "name": prefix }],
                    "album": { "name": "Album", "images": [] },
                    "preview_url": null
                })
            })
            .collect();
        serde_json::json!({ "tracks": tracks })
    }

    async fn mount_top_tracks(server: &MockServer, artist_id: &str, n: usize) {
        Mock::given(method("GET"))
            .and(path(format!("/artists/{}/top-tracks", artist_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(artist_id, n)))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> SpotifyClient {
        SpotifyClient::with_base_urls("id".into(), "secret".into(), &server.uri(), &server.uri())
    }

    #[tokio::test]
    async fn without_related_only_requested_artists_contribute() {
        let server = MockServer::start().await;
        mount_top_tracks(&server, "A1", 5).await;
        mount_top_tracks(&server, "A2", 2).await;
        Mock::given(method("GET"))
            .and(path("/artists/A1/related-artists"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let out = collect_tracks(&client(&server), "t", &["A1".into(), "A2".into()], false)
            .await
            .unwrap();

        assert_eq!(out.tracks.len(), 7);
        assert!(out.tracks.iter().all(|t| t.id.starts_with("A1-") || t.id.starts_with("A2-")));
        assert!(out.tracks[..5].iter().all(|t| t.id.starts_with("A1-")));
        assert!(out.failed_artist_ids.is_empty());
    }

    #[tokio::test]
    async fn related_contribution_is_bounded() {
        let server = MockServer::start().await;
        mount_top_tracks(&server, "A1", 10).await;
        mount_top_tracks(&server, "R1", 10).await;
        mount_top_tracks(&server, "R2", 1).await;
        Mock::given(method("GET"))
            .and(path("/artists/R3/top-tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body("R3", 10)))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artists/A1/related-artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artists": [artist("R1"), artist("R2"), artist("R3")]
            })))
            .mount(&server)
            .await;

        let out = collect_tracks(&client(&server), "t", &["A1".into()], true)
            .await
            .unwrap();

        let related: Vec<_> = out.tracks.iter().filter(|t| !t.id.starts_with("A1-")).collect();
        assert_eq!(related.len(), 4);
        assert_eq!(related.iter().filter(|t| t.id.starts_with("R1-")).count(), 3);
        assert_eq!(related.iter().filter(|t| t.id.starts_with("R2-")).count(), 1);
        assert_eq!(out.tracks.len(), 14);
    }

    #[tokio::test]
    async fn related_failures_are_recorded_not_raised() {
        let server = MockServer::start().await;
        mount_top_tracks(&server, "A1", 2).await;
        mount_top_tracks(&server, "R2", 5).await;
        Mock::given(method("GET"))
            .and(path("/artists/A1/related-artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artists": [artist("R1"), artist("R2")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artists/R1/top-tracks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artists/A2/top-tracks"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artists/A2/related-artists"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let out = collect_tracks(&client(&server), "t", &["A1".into(), "A2".into()], true)
            .await
            .unwrap();

        assert_eq!(out.tracks.len(), 2 + 3);
        assert_eq!(out.failed_artist_ids, ["R1", "A2", "A2"]);
    }

    #[tokio::test]
    async fn expired_token_on_selected_artist_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artists/A1/top-tracks"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = collect_tracks(&client(&server), "old", &["A1".into()], true)
            .await
            .unwrap_err();
        assert!(matches!(err, SpotifyError::Unauthorized));
    }
}

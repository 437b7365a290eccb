//!
//! src/testing.rs  Oct 19th, 2026
//!
//! Scripted in-memory catalog used by the unit tests. Every call is
//! recorded so tests can assert on what did (or did not) hit the network.
//!

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::catalog::CatalogClient;
use crate::errors::ReleaseError;
use crate::types::{
    Album, ArtistRef, Cursor, DatePrecision, Page, PlaylistSummary, SavedTrack, Track, WirePage
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistOp {
    Replace(Vec<String>),
    Remove(Vec<String>),
    Add(Vec<String>),
    Create(String)
}

struct FailRule {
    prefix: String,
    after_pages: usize,
    status: u16
}

pub struct FakeCatalog {
    pub followed: Vec<ArtistRef>,
    pub liked: Vec<Track>,
    pub artist_albums: HashMap<String, Vec<Album>>,
    pub searches: HashMap<String, Vec<Album>>,
    /// Search results served as raw json, so entries may be `null`
    pub raw_searches: HashMap<String, Vec<Value>>,
    /// Searches that fail outright with the given status
    pub failing_searches: HashMap<String, u16>,
    pub albums: HashMap<String, Album>,
    pub album_tracks: HashMap<String, Vec<Track>>,
    pub failing_albums: HashSet<String>,
    pub playlists: Vec<PlaylistSummary>,
    pub user_id: String,
    pub fail_add_after: Option<usize>,
    page_size: usize,
    fail_rules: Vec<FailRule>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<String>>,
    ops: Mutex<Vec<PlaylistOp>>
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            followed: Vec::new(),
            liked: Vec::new(),
            artist_albums: HashMap::new(),
            searches: HashMap::new(),
            raw_searches: HashMap::new(),
            failing_searches: HashMap::new(),
            albums: HashMap::new(),
            album_tracks: HashMap::new(),
            failing_albums: HashSet::new(),
            playlists: Vec::new(),
            user_id: "listener".to_string(),
            fail_add_after: None,
            page_size: 50,
            fail_rules: Vec::new(),
            collections: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            ops: Mutex::new(Vec::new())
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Cursor requests for collections starting with `prefix` fail with
    /// `status` once `after_pages` pages of it have been served
    pub fn fail_cursors_after(&mut self, prefix: &str, after_pages: usize, status: u16) {
        self.fail_rules.push(FailRule { prefix: prefix.to_string(), after_pages, status });
    }

    /// Registers an album in a list view and its detail view in one go
    pub fn add_album(&mut self, album: Album, markets: &[&str], label: &str, tracks: Vec<Track>) {
        let mut detail = album;
        detail.available_markets = Some(markets.iter().map(|m| m.to_string()).collect());
        detail.label = Some(label.to_string());
        self.album_tracks.insert(detail.id.clone(), tracks);
        self.albums.insert(detail.id.clone(), detail);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn ops(&self) -> Vec<PlaylistOp> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn first_page<T>(
        &self,
        key: String,
        items: &[T],
        envelope: Option<&'static str>
    ) -> Result<Page<T>, ReleaseError>
    where
        T: Serialize + DeserializeOwned
    {
        let values = items.iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.first_raw_page(key, values, envelope)
    }

    fn first_raw_page<T: DeserializeOwned>(
        &self,
        key: String,
        values: Vec<Value>,
        envelope: Option<&'static str>
    ) -> Result<Page<T>, ReleaseError> {
        self.collections.lock().unwrap().insert(key.clone(), values);
        Ok(self.slice(&key, 0)?.into_page(envelope))
    }

    fn slice<T: DeserializeOwned>(&self, key: &str, offset: usize) ->
        Result<WirePage<T>, ReleaseError> {
        let collections = self.collections.lock().unwrap();
        let values = collections.get(key)
            .ok_or_else(|| ReleaseError::NotFound(format!("collection {key}")))?;
        let end = (offset + self.page_size).min(values.len());
        let next = (end < values.len()).then(|| format!("{key}@{end}"));
        // decoded as a whole page so null entries are dropped like live ones
        let page = serde_json::json!({
            "items": values[offset.min(end)..end].to_vec(),
            "next": next
        });
        Ok(serde_json::from_value(page)?)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn followed_artists(&self) -> Result<Page<ArtistRef>, ReleaseError> {
        self.record("followed_artists".into());
        self.first_page("followed".into(), &self.followed, Some("artists"))
    }

    async fn saved_tracks(&self) -> Result<Page<SavedTrack>, ReleaseError> {
        self.record("saved_tracks".into());
        let saved: Vec<SavedTrack> = self.liked.iter()
            .cloned()
            .map(|track| SavedTrack { track })
            .collect();
        self.first_page("saved".into(), &saved, None)
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        _album_types: &[String],
        _market: &str
    ) -> Result<Page<Album>, ReleaseError> {
        self.record(format!("artist_albums:{artist_id}"));
        let albums = self.artist_albums.get(artist_id).cloned().unwrap_or_default();
        self.first_page(format!("artist_albums:{artist_id}"), &albums, None)
    }

    async fn search_albums(&self, query: &str) -> Result<Page<Album>, ReleaseError> {
        self.record(format!("search_albums:{query}"));
        if let Some(&status) = self.failing_searches.get(query) {
            return Err(ReleaseError::Status { status, body: "search failed".into() });
        }
        if let Some(values) = self.raw_searches.get(query) {
            return self.first_raw_page(format!("search:{query}"), values.clone(), Some("albums"));
        }
        let albums = self.searches.get(query).cloned().unwrap_or_default();
        self.first_page(format!("search:{query}"), &albums, Some("albums"))
    }

    async fn album(&self, album_id: &str) -> Result<Album, ReleaseError> {
        self.record(format!("album:{album_id}"));
        if self.failing_albums.contains(album_id) {
            return Err(ReleaseError::Status { status: 502, body: "bad gateway".into() });
        }
        let mut album = self.albums.get(album_id)
            .cloned()
            .ok_or_else(|| ReleaseError::NotFound(format!("album {album_id}")))?;
        let tracks = self.album_tracks.get(album_id).cloned().unwrap_or_default();
        let page = self.first_page(format!("album_tracks:{album_id}"), &tracks, None)?;
        album.tracks = Some(WirePage {
            items: page.items,
            next: page.next.map(|c| c.url)
        });
        Ok(album)
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Page<Track>, ReleaseError> {
        self.record(format!("album_tracks:{album_id}"));
        let tracks = self.album_tracks.get(album_id).cloned().unwrap_or_default();
        self.first_page(format!("album_tracks:{album_id}"), &tracks, None)
    }

    async fn next_page<T>(&self, cursor: &Cursor) -> Result<Page<T>, ReleaseError>
    where
        T: DeserializeOwned + Send + 'static
    {
        self.record(format!("next_page:{}", cursor.url));
        let (key, offset) = cursor.url.rsplit_once('@')
            .ok_or_else(|| ReleaseError::Parse(format!("bad cursor {}", cursor.url)))?;
        let offset: usize = offset.parse()
            .map_err(|_| ReleaseError::Parse(format!("bad cursor {}", cursor.url)))?;

        let page_index = offset / self.page_size;
        if let Some(rule) = self.fail_rules.iter()
            .find(|r| key.starts_with(&r.prefix) && page_index >= r.after_pages) {
            return Err(ReleaseError::Status {
                status: rule.status,
                body: "scripted failure".into()
            });
        }
        Ok(self.slice::<T>(key, offset)?.into_page(cursor.envelope))
    }

    async fn current_user_id(&self) -> Result<String, ReleaseError> {
        self.record("current_user_id".into());
        Ok(self.user_id.clone())
    }

    async fn current_user_playlists(&self) -> Result<Page<PlaylistSummary>, ReleaseError> {
        self.record("current_user_playlists".into());
        self.first_page("playlists".into(), &self.playlists, None)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str
    ) -> Result<PlaylistSummary, ReleaseError> {
        self.record(format!("create_playlist:{user_id}"));
        self.ops.lock().unwrap().push(PlaylistOp::Create(name.to_string()));
        Ok(PlaylistSummary {
            id: "created".into(),
            uri: "spotify:playlist:created".into(),
            name: name.to_string(),
            description: Some(description.to_string())
        })
    }

    async fn replace_playlist_items(&self, _playlist_id: &str, uris: &[String]) ->
        Result<(), ReleaseError> {
        self.ops.lock().unwrap().push(PlaylistOp::Replace(uris.to_vec()));
        Ok(())
    }

    async fn remove_playlist_items(&self, _playlist_id: &str, uris: &[String]) ->
        Result<(), ReleaseError> {
        self.ops.lock().unwrap().push(PlaylistOp::Remove(uris.to_vec()));
        Ok(())
    }

    async fn add_playlist_items(&self, _playlist_id: &str, uris: &[String]) ->
        Result<(), ReleaseError> {
        let mut ops = self.ops.lock().unwrap();
        let adds = ops.iter().filter(|op| matches!(op, PlaylistOp::Add(_))).count();
        if self.fail_add_after.is_some_and(|limit| adds >= limit) {
            return Err(ReleaseError::Status { status: 500, body: "write failed".into() });
        }
        ops.push(PlaylistOp::Add(uris.to_vec()));
        Ok(())
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn album(id: &str, name: &str, released: NaiveDate) -> Album {
    Album {
        id: id.to_string(),
        name: name.to_string(),
        album_type: "single".to_string(),
        release_date: released.format("%Y-%m-%d").to_string(),
        release_date_precision: DatePrecision::Day,
        available_markets: None,
        label: None,
        tracks: None
    }
}

pub fn track(id: &str, name: &str, artists: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: artists.iter()
            .map(|a| ArtistRef::new(format!("id-{a}"), *a))
            .collect()
    }
}

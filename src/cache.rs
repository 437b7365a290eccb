//!
//! src/cache.rs  Oct 19th, 2026
//!
//! Rerelease cache: album track listings memoized for the current run
//! and persisted across runs through a `SnapshotStore`.
//!

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::errors::ReleaseError;
use crate::paging::album_listing;
use crate::persistent::SnapshotStore;
use crate::types::{Album, AlbumSnapshot, Track};

/// `abs(today - released) <= window_days`; future dates count like past ones
pub fn within_window(today: NaiveDate, released: NaiveDate, window_days: u32) -> bool {
    (today - released).num_days().abs() <= i64::from(window_days)
}

pub struct RereleaseCache<S> {
    store: S,
    memo: HashMap<String, AlbumSnapshot>
}

impl<S: SnapshotStore> RereleaseCache<S> {
    pub fn new(store: S) -> Self {
        Self { store, memo: HashMap::new() }
    }

    /// Track listing of `album_id`: in-run memo first, then the store,
    /// then a detail fetch which is projected, stored and memoized
    pub async fn snapshot<C: CatalogClient>(&mut self, client: &C, album_id: &str) ->
        Result<&AlbumSnapshot, ReleaseError> {

        if !self.memo.contains_key(album_id) {
            let snapshot = match self.store.get(album_id).await? {
                Some(stored) => {
                    debug!(album = %album_id, "cache.hit");
                    stored
                }
                None => {
                    let fetched = Self::fetch_snapshot(client, album_id).await?;
                    self.store.put(&fetched).await?;
                    debug!(album = %album_id, tracks = fetched.tracks.len(), "cache.write");
                    fetched
                }
            };
            self.memo.insert(album_id.to_string(), snapshot);
        }
        self.memo.get(album_id)
            .ok_or_else(|| ReleaseError::NotFound(format!("snapshot {album_id}")))
    }

    async fn fetch_snapshot<C: CatalogClient>(client: &C, album_id: &str) ->
        Result<AlbumSnapshot, ReleaseError> {
        let album = client.album(album_id).await?;
        let tracks = album_listing(client, album).await?;
        Ok(AlbumSnapshot::project(album_id, tracks))
    }

    /// True when an older sibling album (outside the window, with a full
    /// release date) already carries a track of the same name credited to
    /// exactly the same set of artist names
    pub async fn is_rerelease<C: CatalogClient>(
        &mut self,
        client: &C,
        track: &Track,
        siblings: &[Album],
        today: NaiveDate,
        window_days: u32
    ) -> Result<bool, ReleaseError> {
        let artists: HashSet<&str> = track.artist_names().collect();

        for sibling in siblings {
            // partial or malformed dates are skipped
            let Some(released) = sibling.release_day() else {
                continue;
            };
            if within_window(today, released, window_days) {
                continue;
            }

            let listing: &[Track] = match &sibling.tracks {
                Some(embedded) => &embedded.items,
                None => &self.snapshot(client, &sibling.id).await?.tracks
            };
            let matched = listing.iter()
                .filter(|t| t.name == track.name)
                .any(|t| t.artist_names().collect::<HashSet<_>>() == artists);
            if matched {
                debug!(track = %track.name, album = %sibling.id, "track.rerelease");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn close(&self) -> Result<(), ReleaseError> {
        self.store.close().await
    }
}

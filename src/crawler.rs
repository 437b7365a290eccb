//!
//! src/crawler.rs  Oct 19th, 2026
//!
//! Discovery runs. `ArtistRun` walks the albums of followed (or listed)
//! artists, `LabelRun` searches recent releases of listed labels. Both
//! filter albums, then tracks, and publish the accepted set in one write.
//!

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::album_check::{AlbumEligibility, AlbumVerdict};
use crate::cache::RereleaseCache;
use crate::catalog::CatalogClient;
use crate::config::{FilterConfig, GeneralConfig, RunMode, LABEL_NEW_TAG_DAYS};
use crate::errors::ReleaseError;
use crate::paging::{album_listing, Pages};
use crate::persistent::SnapshotStore;
use crate::playlist::{resolve_playlist, PlaylistWriter};
use crate::track_check::{TrackContext, TrackEligibility, TrackVerdict};
use crate::types::{Album, ArtistRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub seeds: usize,
    pub albums_inspected: usize,
    pub albums_eligible: usize,
    pub tracks_inspected: usize,
    pub accepted: usize,
    pub batches: usize
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            seeds: 0,
            albums_inspected: 0,
            albums_eligible: 0,
            tracks_inspected: 0,
            accepted: 0,
            batches: 0
        }
    }

    fn log(&self) {
        info!(
            mode = self.mode.as_str(),
            seeds = self.seeds,
            albums = self.albums_inspected,
            eligible = self.albums_eligible,
            tracks = self.tracks_inspected,
            accepted = self.accepted,
            batches = self.batches,
            "run.report"
        );
    }
}

/// Search query for the recent releases of `label`
pub fn label_query(label: &str, days: u32) -> String {
    let term = label.to_lowercase().replace(' ', "+");
    if days <= LABEL_NEW_TAG_DAYS {
        format!("label:\"{term}\" tag:new")
    } else {
        format!("label:\"{term}\"")
    }
}

async fn liked_track_ids<C: CatalogClient>(client: &C) -> Result<Vec<String>, ReleaseError> {
    info!("liked.fetch");
    let saved = Pages::new(client, client.saved_tracks().await?).collect_all().await?;
    Ok(saved.into_iter().map(|s| s.track.id).collect())
}

async fn followed_artists<C: CatalogClient>(client: &C) -> Result<Vec<ArtistRef>, ReleaseError> {
    info!("followed.fetch");
    Pages::new(client, client.followed_artists().await?).collect_all().await
}

async fn publish<C: CatalogClient>(
    client: &C,
    general: &GeneralConfig,
    mode: RunMode,
    accepted: &[String]
) -> Result<usize, ReleaseError> {
    let playlist = resolve_playlist(client, general, mode).await?;
    PlaylistWriter::new(client, playlist).replace(accepted).await
}

///
/// Discovery over artists. Owns the rerelease cache for the length of
/// one run and closes it whether or not discovery succeeds.
///
pub struct ArtistRun<'c, C, S> {
    client: &'c C,
    general: GeneralConfig,
    filters: FilterConfig,
    today: NaiveDate,
    cache: RereleaseCache<S>,
    artists: Option<Vec<ArtistRef>>,
    artist_albums: HashMap<String, Vec<Album>>
}

impl<'c, C, S> ArtistRun<'c, C, S>
where
    C: CatalogClient,
    S: SnapshotStore
{
    pub fn new(
        client: &'c C,
        general: &GeneralConfig,
        filters: &FilterConfig,
        store: S,
        today: NaiveDate
    ) -> Self {
        Self {
            client,
            general: general.clone(),
            filters: filters.clone(),
            today,
            cache: RereleaseCache::new(store),
            artists: None,
            artist_albums: HashMap::new()
        }
    }

    /// Use these artists instead of the followed ones
    pub fn set_artist_list(&mut self, artists: Vec<ArtistRef>) {
        self.artists = Some(artists);
    }

    pub async fn run(mut self) -> Result<RunReport, ReleaseError> {
        let outcome = self.discover().await;
        let closed = self.cache.close().await;
        if let Err(e) = &closed {
            error!(error = %e, "cache.close.failed");
        }
        let (accepted, mut report) = outcome?;
        closed?;

        report.batches = publish(self.client, &self.general, RunMode::Artists, &accepted).await?;
        report.log();
        Ok(report)
    }

    async fn albums_of(&mut self, artist_id: &str) -> Result<(), ReleaseError> {
        if self.artist_albums.contains_key(artist_id) {
            return Ok(());
        }
        let first = self.client
            .artist_albums(artist_id, &self.general.album_types, &self.general.region)
            .await?;
        let albums = Pages::new(self.client, first).collect_all().await?;
        self.artist_albums.insert(artist_id.to_string(), albums);
        Ok(())
    }

    async fn discover(&mut self) -> Result<(Vec<String>, RunReport), ReleaseError> {
        let mut report = RunReport::new(RunMode::Artists);
        let mut album_check = AlbumEligibility::new(&self.general, &self.filters, self.today);
        let mut track_check = TrackEligibility::new(&self.general, &self.filters, self.today);
        let mut accepted = Vec::new();

        let seeds = match self.artists.take() {
            Some(listed) => listed,
            None => followed_artists(self.client).await?
        };
        if self.filters.ignore_liked {
            track_check.set_liked(liked_track_ids(self.client).await?);
        }
        report.seeds = seeds.len();
        info!(artists = seeds.len(), days = self.general.days, "artists.start");

        for seed in &seeds {
            debug!(artist = %seed.name, id = %seed.id, "artist.start");
            self.albums_of(&seed.id).await?;
            let siblings: &[Album] = self.artist_albums.get(&seed.id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for album in siblings {
                report.albums_inspected += 1;
                let AlbumVerdict::Eligible(detail) = album_check.check(self.client, album, None).await
                else {
                    continue;
                };
                report.albums_eligible += 1;

                let ctx = TrackContext {
                    seed_artist: Some(seed),
                    siblings,
                    require_unfollowed: false
                };
                for track in album_listing(self.client, *detail).await? {
                    report.tracks_inspected += 1;
                    let verdict = track_check.check(self.client, &mut self.cache, &track, &ctx).await?;
                    match verdict {
                        TrackVerdict::Accepted => accepted.push(track.id),
                        rejected => debug!(track = %track.name, reason = rejected.as_str(),
                            "track.rejected")
                    }
                }
            }
        }

        report.accepted = accepted.len();
        Ok((accepted, report))
    }
}

///
/// Discovery over record labels through album search
///
pub struct LabelRun<'c, C> {
    client: &'c C,
    general: GeneralConfig,
    filters: FilterConfig,
    today: NaiveDate,
    labels: Vec<String>
}

impl<'c, C: CatalogClient> LabelRun<'c, C> {
    pub fn new(
        client: &'c C,
        general: &GeneralConfig,
        filters: &FilterConfig,
        today: NaiveDate
    ) -> Self {
        Self {
            client,
            general: general.clone(),
            filters: filters.clone(),
            today,
            labels: Vec::new()
        }
    }

    pub fn set_label_list(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    pub async fn run(self) -> Result<RunReport, ReleaseError> {
        let mut report = RunReport::new(RunMode::Labels);
        let mut album_check = AlbumEligibility::new(&self.general, &self.filters, self.today);
        let mut track_check = TrackEligibility::new(&self.general, &self.filters, self.today);
        let mut accepted = Vec::new();

        if self.general.days >= LABEL_NEW_TAG_DAYS {
            warn!(days = self.general.days,
                "label search is capped upstream, long windows will miss releases");
        }
        if self.filters.ignore_liked {
            track_check.set_liked(liked_track_ids(self.client).await?);
        }
        if self.filters.ignore_followed_in_labels {
            let followed = followed_artists(self.client).await?;
            track_check.set_followed(followed.into_iter().map(|a| a.id));
        }

        report.seeds = self.labels.len();
        info!(labels = self.labels.len(), days = self.general.days, "labels.start");

        let ctx = TrackContext {
            seed_artist: None,
            siblings: &[],
            require_unfollowed: self.filters.ignore_followed_in_labels
        };

        for label in &self.labels {
            let query = label_query(label, self.general.days);
            debug!(label = %label, query = %query, "label.start");

            let first = match self.client.search_albums(&query).await {
                Ok(first) => first,
                Err(e) if e.is_search_cap() => {
                    warn!(label = %label, error = %e, "label.search.capped");
                    continue;
                }
                Err(e) => return Err(e)
            };
            let mut results = Pages::new(self.client, first);

            loop {
                let album = match results.next_item().await {
                    Ok(Some(album)) => album,
                    Ok(None) => break,
                    Err(e) if e.is_search_cap() => {
                        warn!(label = %label, pages = results.pages_fetched(), error = %e,
                            "label.search.capped");
                        break;
                    }
                    Err(e) => return Err(e)
                };

                report.albums_inspected += 1;
                let AlbumVerdict::Eligible(detail) =
                    album_check.check(self.client, &album, Some(label.as_str())).await
                else {
                    continue;
                };
                report.albums_eligible += 1;

                for track in album_listing(self.client, *detail).await? {
                    report.tracks_inspected += 1;
                    let verdict = track_check.screen(&track, &ctx);
                    match verdict {
                        TrackVerdict::Accepted => accepted.push(track.id),
                        rejected => debug!(track = %track.name, reason = rejected.as_str(),
                            "track.rejected")
                    }
                }
            }
        }

        report.accepted = accepted.len();
        report.batches = publish(self.client, &self.general, RunMode::Labels, &accepted).await?;
        report.log();
        Ok(report)
    }
}

//!
//! src/album_check.rs  Oct 19th, 2026
//!
//! Decides whether an album is recent enough, of an accepted type and
//! available in the configured region to be worth opening up.
//!

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, error, warn};

use crate::cache::within_window;
use crate::catalog::CatalogClient;
use crate::config::{FilterConfig, GeneralConfig};
use crate::denylist::Denylist;
use crate::types::{Album, DatePrecision};

#[derive(Debug, Clone)]
pub enum AlbumVerdict {
    /// Passed every check; carries the extended album detail
    Eligible(Box<Album>),
    CoarseDate,
    UnparsableDate,
    RadioShow,
    OutsideWindow,
    AlreadyChecked,
    AlbumType,
    FetchFailed,
    NotInRegion,
    LabelMismatch
}

impl AlbumVerdict {
    #[cfg(test)]
    pub fn is_eligible(&self) -> bool {
        matches!(self, AlbumVerdict::Eligible(_))
    }
}

pub struct AlbumEligibility {
    today: NaiveDate,
    window_days: u32,
    region: String,
    album_types: Vec<String>,
    radio_shows: Denylist,
    checked: HashSet<String>
}

impl AlbumEligibility {
    pub fn new(general: &GeneralConfig, filters: &FilterConfig, today: NaiveDate) -> Self {
        Self {
            today,
            window_days: general.days,
            region: general.region.clone(),
            album_types: general.album_types.clone(),
            radio_shows: filters.radio_shows.clone(),
            checked: HashSet::new()
        }
    }

    /// Checks that need nothing but the list-view record. `None` means
    /// the album should be fetched in extended form.
    pub fn screen(&self, album: &Album) -> Option<AlbumVerdict> {
        if album.release_date_precision != DatePrecision::Day {
            return Some(AlbumVerdict::CoarseDate);
        }
        if self.radio_shows.matches(&album.name) {
            return Some(AlbumVerdict::RadioShow);
        }
        let Some(released) = album.release_day() else {
            warn!(album = %album.id, date = %album.release_date, "album.date.invalid");
            return Some(AlbumVerdict::UnparsableDate);
        };
        if !within_window(self.today, released, self.window_days) {
            return Some(AlbumVerdict::OutsideWindow);
        }
        if self.checked.contains(&album.id) {
            return Some(AlbumVerdict::AlreadyChecked);
        }
        if !self.album_types.iter().any(|t| *t == album.album_type) {
            return Some(AlbumVerdict::AlbumType);
        }
        None
    }

    /// Full decision. A failed detail fetch is logged and rejects the
    /// album without failing the run. Once the detail is in hand the
    /// album counts as checked whatever the market/label outcome.
    pub async fn check<C: CatalogClient>(
        &mut self,
        client: &C,
        album: &Album,
        label: Option<&str>
    ) -> AlbumVerdict {
        if let Some(rejected) = self.screen(album) {
            return rejected;
        }

        let extended = match client.album(&album.id).await {
            Ok(extended) => extended,
            Err(e) => {
                error!(album = %album.id, name = %album.name, error = %e, "album.fetch.failed");
                return AlbumVerdict::FetchFailed;
            }
        };
        self.checked.insert(album.id.clone());

        if !extended.is_available_in(&self.region) {
            debug!(album = %album.id, region = %self.region, "album.skip.region");
            return AlbumVerdict::NotInRegion;
        }
        if let Some(label) = label {
            if extended.label.as_deref() != Some(label) {
                debug!(album = %album.id, label = ?extended.label, "album.skip.label");
                return AlbumVerdict::LabelMismatch;
            }
        }
        AlbumVerdict::Eligible(Box::new(extended))
    }

    #[cfg(test)]
    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }
}

//!
//! src/types.rs  Oct 19th, 2026
//!
//! Typed shapes of the catalog responses the pipeline consumes.
//! Upstream json is deserialized into these at the http boundary.
//!

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Missing and explicit `null` both decode to the default value
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Page items with `null` entries dropped
fn present_items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>
{
    let items = Option::<Vec<Option<T>>>::deserialize(d)?.unwrap_or_default();
    let total = items.len();
    let present: Vec<T> = items.into_iter().flatten().collect();
    if present.len() < total {
        debug!(skipped = total - present.len(), "page.items.null");
    }
    Ok(present)
}

/// (id, name) pair, used for track credits, followed artists and artist seeds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String
}

impl ArtistRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<ArtistRef>
}

impl Track {
    pub fn artist_names(&self) -> impl Iterator<Item = &str> {
        self.artists.iter().map(|a| a.name.as_str())
    }
}

/// Entry of the liked-tracks collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrack {
    pub track: Track
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
    Year,
    #[serde(other)]
    Unknown
}

/// Album as returned by list views (artist albums, search) or, when
/// `available_markets`/`label`/`tracks` are filled, by the detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub album_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default = "Album::unknown_precision")]
    pub release_date_precision: DatePrecision,
    #[serde(default)]
    pub available_markets: Option<Vec<String>>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tracks: Option<WirePage<Track>>
}

impl Album {
    fn unknown_precision() -> DatePrecision { DatePrecision::Unknown }

    /// Full ISO date, `None` for partial ("2004", "2004-03") or malformed dates
    pub fn release_day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.release_date, "%Y-%m-%d").ok()
    }

    pub fn is_available_in(&self, region: &str) -> bool {
        self.available_markets
            .as_deref()
            .is_some_and(|markets| markets.iter().any(|m| m == region))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>
}

/// Paging object exactly as the catalog sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePage<T> {
    #[serde(default = "Vec::new", deserialize_with = "present_items")]
    #[serde(bound(deserialize = "T: Deserialize<'de>"))]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>
}

impl<T> WirePage<T> {
    pub fn into_page(self, envelope: Option<&'static str>) -> Page<T> {
        Page {
            items: self.items,
            next: self.next.map(|url| Cursor { url, envelope })
        }
    }
}

/// Location of the next page. Some collections (followed artists, search)
/// wrap their paging object under a key, which `envelope` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub url: String,
    pub envelope: Option<&'static str>
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>
}

/// Normalized track listing of one album, the rerelease cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSnapshot {
    #[serde(skip)]
    pub album_id: String,
    pub tracks: Vec<Track>
}

impl AlbumSnapshot {
    /// Projects tracks down to name, id and credited (id, name) pairs
    pub fn project(album_id: &str, tracks: impl IntoIterator<Item = Track>) -> Self {
        let tracks = tracks.into_iter()
            .map(|t| Track {
                id: t.id,
                name: t.name,
                artists: t.artists.into_iter()
                    .map(|a| ArtistRef { id: a.id, name: a.name })
                    .collect()
            })
            .collect();
        Self { album_id: album_id.to_string(), tracks }
    }
}

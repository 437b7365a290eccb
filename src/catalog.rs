//!
//! src/catalog.rs  Oct 19th, 2026
//!
//! Capabilities the pipeline needs from the music catalog service.
//! `fetch::SpotifyClient` implements them over http.
//!

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::errors::ReleaseError;
use crate::types::{Album, ArtistRef, Cursor, Page, PlaylistSummary, SavedTrack, Track};

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// First page of the artists the user follows
    async fn followed_artists(&self) -> Result<Page<ArtistRef>, ReleaseError>;

    /// First page of the user's liked tracks
    async fn saved_tracks(&self) -> Result<Page<SavedTrack>, ReleaseError>;

    /// First page of an artist's albums of the given types, limited to a market
    async fn artist_albums(
        &self,
        artist_id: &str,
        album_types: &[String],
        market: &str
    ) -> Result<Page<Album>, ReleaseError>;

    /// First page of an album search
    async fn search_albums(&self, query: &str) -> Result<Page<Album>, ReleaseError>;

    /// Album detail including markets, label and the first page of tracks
    async fn album(&self, album_id: &str) -> Result<Album, ReleaseError>;

    async fn album_tracks(&self, album_id: &str) -> Result<Page<Track>, ReleaseError>;

    /// Follows a cursor handed out by any of the paged calls above
    async fn next_page<T>(&self, cursor: &Cursor) -> Result<Page<T>, ReleaseError>
    where
        T: DeserializeOwned + Send + 'static;

    async fn current_user_id(&self) -> Result<String, ReleaseError>;

    async fn current_user_playlists(&self) -> Result<Page<PlaylistSummary>, ReleaseError>;

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str
    ) -> Result<PlaylistSummary, ReleaseError>;

    /// Replaces every item of the playlist with `uris` (at most 100)
    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError>;

    /// Removes every occurrence of each of `uris`
    async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError>;

    /// Appends `uris` in order (at most 100)
    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError>;
}

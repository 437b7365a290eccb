//!
//! src/playlist.rs  Oct 19th, 2026
//!
//! Finds (or creates) the target playlist of a mode and replaces its
//! contents with the accepted tracks.
//!

use tracing::{debug, info};

use crate::catalog::CatalogClient;
use crate::config::{GeneralConfig, RunMode};
use crate::errors::ReleaseError;
use crate::ids::{to_id, track_uri};
use crate::paging::Pages;

/// Track used to blank a playlist before it is refilled
pub const PLACEHOLDER_TRACK: &str = "4RWkW7tGWseUu1T9LzpEBP";

/// Upper bound on the number of uris per append request
pub const WRITE_BATCH: usize = 50;

pub struct PlaylistWriter<'c, C> {
    client: &'c C,
    playlist_id: String
}

impl<'c, C: CatalogClient> PlaylistWriter<'c, C> {
    pub fn new(client: &'c C, playlist_id: impl Into<String>) -> Self {
        Self { client, playlist_id: playlist_id.into() }
    }

    /// Clears the playlist, then appends `track_ids` in order, `WRITE_BATCH`
    /// at a time. Any failed request aborts the write as is.
    pub async fn replace(&self, track_ids: &[String]) -> Result<usize, ReleaseError> {
        let placeholder = vec![track_uri(PLACEHOLDER_TRACK)];
        self.client.replace_playlist_items(&self.playlist_id, &placeholder).await?;
        self.client.remove_playlist_items(&self.playlist_id, &placeholder).await?;

        let mut batches = 0;
        for chunk in track_ids.chunks(WRITE_BATCH) {
            let uris: Vec<String> = chunk.iter().map(|id| track_uri(id)).collect();
            self.client.add_playlist_items(&self.playlist_id, &uris).await?;
            batches += 1;
            debug!(playlist = %self.playlist_id, batch = batches, size = uris.len(),
                "playlist.batch");
        }
        info!(playlist = %self.playlist_id, tracks = track_ids.len(), batches, "playlist.write");
        Ok(batches)
    }
}

/// Playlist id for `mode`: the configured id/uri/url if there is one,
/// otherwise a playlist of the user's with the same name and description,
/// otherwise a freshly created one
pub async fn resolve_playlist<C: CatalogClient>(
    client: &C,
    general: &GeneralConfig,
    mode: RunMode
) -> Result<String, ReleaseError> {
    if let Some(configured) = general.playlist_uri(mode) {
        return to_id(configured, "playlist");
    }

    let name = general.playlist_name_for(mode);
    let description = general.playlist_description.as_str();

    let mut owned = Pages::new(client, client.current_user_playlists().await?);
    while let Some(playlist) = owned.next_item().await? {
        if playlist.name == name && playlist.description.as_deref().unwrap_or("") == description {
            debug!(playlist = %playlist.id, name = %name, "playlist.found");
            return Ok(playlist.id);
        }
    }

    let user_id = client.current_user_id().await?;
    let created = client.create_playlist(&user_id, &name, description).await?;
    info!(playlist = %created.id, name = %name, "playlist.created");
    Ok(created.id)
}

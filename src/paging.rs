//!
//! src/paging.rs  Oct 19th, 2026
//!
//! Flattens cursor-paginated collections into a single item sequence.
//!

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::errors::ReleaseError;
use crate::types::{Album, Cursor, Page, Track};

/// One traversal over a paged collection, starting from an already
/// fetched first page. Pages are requested only when the buffered
/// items run out, and an error on any later page is returned as is.
pub struct Pages<'c, C, T> {
    client: &'c C,
    buffer: std::vec::IntoIter<T>,
    next: Option<Cursor>,
    fetched: usize
}

impl<'c, C, T> Pages<'c, C, T>
where
    C: CatalogClient,
    T: DeserializeOwned + Send + 'static
{
    pub fn new(client: &'c C, first: Page<T>) -> Self {
        Self {
            client,
            buffer: first.items.into_iter(),
            next: first.next,
            fetched: 1
        }
    }

    pub async fn next_item(&mut self) -> Result<Option<T>, ReleaseError> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Ok(Some(item));
            }
            let Some(cursor) = self.next.take() else {
                return Ok(None);
            };
            let page = self.client.next_page::<T>(&cursor).await?;
            self.fetched += 1;
            debug!(page = self.fetched, items = page.items.len(), "paging.next");
            self.buffer = page.items.into_iter();
            self.next = page.next;
        }
    }

    pub async fn collect_all(mut self) -> Result<Vec<T>, ReleaseError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Number of pages pulled so far, the first one included
    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }
}

/// Every track of `album`: the embedded listing and its remaining pages
/// when the detail view carried one, a separate listing request otherwise
pub async fn album_listing<C: CatalogClient>(client: &C, album: Album) ->
    Result<Vec<Track>, ReleaseError> {
    let first = match album.tracks {
        Some(listing) => listing.into_page(None),
        None => client.album_tracks(&album.id).await?
    };
    Pages::new(client, first).collect_all().await
}

//!
//! src/persistent.rs  Oct 19th, 2026
//!
//! Defines module for persisting album snapshots across runs.
//! Snapshots live in an sqlite database, one json row per album.
//!

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use tracing::debug;

use crate::errors::ReleaseError;
use crate::types::AlbumSnapshot;

/// Key-value storage behind the rerelease cache
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, album_id: &str) -> Result<Option<AlbumSnapshot>, ReleaseError>;

    /// Stores a snapshot; an existing entry for the same album is kept
    async fn put(&self, snapshot: &AlbumSnapshot) -> Result<(), ReleaseError>;

    async fn close(&self) -> Result<(), ReleaseError>;
}

pub struct Persistent {
    pool: Pool<Sqlite>
}

impl Persistent {

    async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), ReleaseError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS album_snapshots (
              album_id    TEXT PRIMARY KEY,
              tracks      TEXT NOT NULL,
              created_at  INTEGER NOT NULL
            );
            "
        ).execute(pool).await?;

        Ok(())
    }

    /// Opens (creating if needed) the cache database at `path`
    pub async fn open(path: &Path) -> Result<Self, ReleaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(opts)
            .await?;

        Self::ensure_schema(&pool).await?;
        debug!(path = %path.display(), "cache.open");
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, ReleaseError> {
        let opts = "sqlite::memory:".parse::<SqliteConnectOptions>()?;

        // a second connection would see a different, empty database
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    pub async fn count(&self) -> Result<i64, ReleaseError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM album_snapshots;")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl SnapshotStore for Persistent {
    async fn get(&self, album_id: &str) -> Result<Option<AlbumSnapshot>, ReleaseError> {
        let row = sqlx::query("SELECT tracks FROM album_snapshots WHERE album_id = ?1;")
            .bind(album_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tracks: String = row.try_get("tracks")?;
        let mut snapshot: AlbumSnapshot = serde_json::from_str(&tracks)?;
        snapshot.album_id = album_id.to_string();
        Ok(Some(snapshot))
    }

    async fn put(&self, snapshot: &AlbumSnapshot) -> Result<(), ReleaseError> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO album_snapshots (album_id, tracks, created_at)
            VALUES (?1, ?2, ?3);
            "
        )
        .bind(&snapshot.album_id)
        .bind(serde_json::to_string(snapshot)?)
        .bind(Self::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ReleaseError> {
        self.pool.close().await;
        debug!("cache.close");
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::ThumbnailEntry;
use crate::error::CacheError;

/// How the uploader writes fresh entries into the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheWriteMode {
    /// Overwrite any existing entry under the same key (last writer wins).
    #[default]
    Replace,
    /// Keep an existing entry untouched; only insert missing keys.
    InsertIfAbsent,
}

/// Trait for persisting cached attachment payloads keyed by raw id.
///
/// Implementations must be `Send + Sync` and safe for concurrent access:
/// writes to different keys never interfere, and concurrent writes to the
/// same key resolve to one of the written entries.
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Insert or replace the entry under `entry.id`.
    async fn put(&self, entry: ThumbnailEntry) -> Result<(), CacheError>;

    /// Insert the entry only if the key is vacant.
    /// Returns `true` if it was inserted, `false` if a value already existed.
    async fn add(&self, entry: ThumbnailEntry) -> Result<bool, CacheError>;

    /// Get the entry for `id`. Returns `None` if not cached.
    async fn get(&self, id: &str) -> Result<Option<ThumbnailEntry>, CacheError>;

    /// Refresh the access timestamp. Returns `false` if the key is missing.
    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CacheError>;

    /// Remove an entry. Returns `true` if it existed.
    async fn remove(&self, id: &str) -> Result<bool, CacheError>;

    /// Number of cached entries.
    async fn len(&self) -> Result<usize, CacheError>;

    /// Returns `true` if nothing is cached.
    async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Write an entry using the given mode.
    ///
    /// Returns `true` if the store now holds `entry`.
    async fn write(&self, entry: ThumbnailEntry, mode: CacheWriteMode) -> Result<bool, CacheError> {
        match mode {
            CacheWriteMode::Replace => self.put(entry).await.map(|()| true),
            CacheWriteMode::InsertIfAbsent => self.add(entry).await,
        }
    }
}

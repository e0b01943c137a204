use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use attach_cache::{CacheError, ThumbnailEntry, ThumbnailStore, validate_key};

use crate::record::EntryRecord;

const ENTRY_EXT: &str = "entry";

/// Filesystem [`ThumbnailStore`].
///
/// Keys are hashed into file names, so ids never become path components.
///
/// Operations on the same key are serialized within this store and its
/// clones; separate processes sharing a root are not coordinated.
#[derive(Debug, Clone)]
pub struct FsThumbnailStore {
    root: PathBuf,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FsThumbnailStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn thumbs_dir(&self) -> PathBuf {
        self.root.join("thumbs")
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(id.as_bytes()));
        self.thumbs_dir()
            .join(&digest[..2])
            .join(format!("{digest}.{ENTRY_EXT}"))
    }

    async fn lock_key(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(id.to_owned()).or_default().value());
        lock.lock_owned().await
    }

    /// Release the key lock and drop its slot once nobody else holds it.
    fn unlock_key(&self, id: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        self.locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Write `bytes` to a fresh temporary file next to `final_path`.
    async fn write_temp(&self, final_path: &Path, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "thumb cache: create_dir_all failed");
                e
            })?;
        }

        let temp_path = final_path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        let written = write_synced(&temp_path, bytes).await;
        discard_on_error(&temp_path, written).await?;
        Ok(temp_path)
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<ThumbnailEntry>, CacheError> {
        match fs::read(path).await {
            Ok(raw) => EntryRecord::decode(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, entry: &ThumbnailEntry) -> Result<(), CacheError> {
        let final_path = self.entry_path(&entry.id);
        let bytes = EntryRecord::encode(entry)?;
        let temp_path = self.write_temp(&final_path, &bytes).await?;

        let renamed = fs::rename(&temp_path, &final_path).await;
        if let Err(e) = &renamed {
            warn!(from = %temp_path.display(), to = %final_path.display(), error = %e, "thumb cache: rename failed");
        }
        discard_on_error(&temp_path, renamed).await
    }

    async fn put_locked(&self, entry: &ThumbnailEntry) -> Result<(), CacheError> {
        debug!(id = %entry.id, size = entry.size(), "thumb cache: put");
        self.replace(entry).await
    }

    async fn add_locked(&self, entry: &ThumbnailEntry) -> Result<bool, CacheError> {
        let final_path = self.entry_path(&entry.id);
        let bytes = EntryRecord::encode(entry)?;
        let temp_path = self.write_temp(&final_path, &bytes).await?;

        // A hard link fails if the target exists, which makes this an atomic
        // insert-if-absent.
        let linked = fs::hard_link(&temp_path, &final_path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => {
                debug!(id = %entry.id, size = entry.size(), "thumb cache: add");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn touch_locked(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        match self.read_entry(&self.entry_path(id)).await? {
            Some(entry) => {
                self.replace(&entry.with_recent_used(at)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_locked(&self, id: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.entry_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Pass `result` through, deleting the temporary file at `path` if it failed.
async fn discard_on_error<T>(path: &Path, result: io::Result<T>) -> Result<T, CacheError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            match fs::remove_file(path).await {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    warn!(path = %path.display(), error = %cleanup, "thumb cache: temp cleanup failed");
                }
                _ => {}
            }
            Err(e.into())
        }
    }
}

#[async_trait]
impl ThumbnailStore for FsThumbnailStore {
    async fn put(&self, entry: ThumbnailEntry) -> Result<(), CacheError> {
        validate_key(&entry.id)?;
        let guard = self.lock_key(&entry.id).await;
        let result = self.put_locked(&entry).await;
        self.unlock_key(&entry.id, guard);
        result
    }

    async fn add(&self, entry: ThumbnailEntry) -> Result<bool, CacheError> {
        validate_key(&entry.id)?;
        let guard = self.lock_key(&entry.id).await;
        let result = self.add_locked(&entry).await;
        self.unlock_key(&entry.id, guard);
        result
    }

    async fn get(&self, id: &str) -> Result<Option<ThumbnailEntry>, CacheError> {
        if validate_key(id).is_err() {
            return Ok(None);
        }
        self.read_entry(&self.entry_path(id)).await
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        if validate_key(id).is_err() {
            return Ok(false);
        }
        let guard = self.lock_key(id).await;
        let result = self.touch_locked(id, at).await;
        self.unlock_key(id, guard);
        result
    }

    async fn remove(&self, id: &str) -> Result<bool, CacheError> {
        if validate_key(id).is_err() {
            return Ok(false);
        }
        let guard = self.lock_key(id).await;
        let result = self.remove_locked(id).await;
        self.unlock_key(id, guard);
        result
    }

    async fn len(&self) -> Result<usize, CacheError> {
        let mut shards = match fs::read_dir(self.thumbs_dir()).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(shard.path()).await?;
            while let Some(file) = files.next_entry().await? {
                if file.path().extension().is_some_and(|ext| ext == ENTRY_EXT) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

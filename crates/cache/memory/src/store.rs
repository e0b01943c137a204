use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use dashmap::DashMap;

use attach_cache::{CacheError, ThumbnailEntry, ThumbnailStore, validate_key};

/// In-memory [`ThumbnailStore`] backed by a [`DashMap`].
///
/// Nothing is evicted; hosts that need a bound call [`ThumbnailStore::remove`]
/// themselves. Payloads are reference-counted, so `get` does not copy bytes.
#[derive(Debug, Default)]
pub struct MemoryThumbnailStore {
    data: DashMap<String, ThumbnailEntry>,
}

impl MemoryThumbnailStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of all cached entries, least recently used first.
    pub fn ids_by_recency(&self) -> Vec<String> {
        let mut items: Vec<(DateTime<Utc>, String)> = self
            .data
            .iter()
            .map(|e| (e.recent_used, e.key().clone()))
            .collect();
        items.sort();
        items.into_iter().map(|(_, id)| id).collect()
    }
}

#[async_trait]
impl ThumbnailStore for MemoryThumbnailStore {
    async fn put(&self, entry: ThumbnailEntry) -> Result<(), CacheError> {
        validate_key(&entry.id)?;
        self.data.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn add(&self, entry: ThumbnailEntry) -> Result<bool, CacheError> {
        validate_key(&entry.id)?;

        // Use `entry` API for atomicity: only insert if vacant.
        let was_inserted = match self.data.entry(entry.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        };

        Ok(was_inserted)
    }

    async fn get(&self, id: &str) -> Result<Option<ThumbnailEntry>, CacheError> {
        Ok(self.data.get(id).map(|e| e.value().clone()))
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        match self.data.get_mut(id) {
            Some(mut entry) => {
                entry.recent_used = at.trunc_subsecs(3);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, CacheError> {
        Ok(self.data.remove(id).is_some())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryThumbnailStore::new();
        attach_cache::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn ids_by_recency_orders_oldest_first() {
        let store = MemoryThumbnailStore::new();
        let now = Utc::now();
        store
            .put(ThumbnailEntry::new("new", "n", "m", Vec::new()).with_recent_used(now))
            .await
            .unwrap();
        store
            .put(
                ThumbnailEntry::new("old", "o", "m", Vec::new())
                    .with_recent_used(now - Duration::hours(1)),
            )
            .await
            .unwrap();

        assert_eq!(store.ids_by_recency(), vec!["old", "new"]);

        store
            .touch("old", now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(store.ids_by_recency(), vec!["new", "old"]);
    }

    #[tokio::test]
    async fn concurrent_tasks_share_store() {
        let store = std::sync::Arc::new(MemoryThumbnailStore::new());
        let mut handles = Vec::new();
        for i in 0u8..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(ThumbnailEntry::new(format!("k{i}"), "f", "m", vec![i]))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.len().await.unwrap(), 8);
    }
}

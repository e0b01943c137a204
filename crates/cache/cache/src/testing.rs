use chrono::{Duration, SubsecRound, Utc};
use futures::future::{join, join_all};

use crate::entry::ThumbnailEntry;
use crate::error::CacheError;
use crate::store::{CacheWriteMode, ThumbnailStore};

fn entry(id: &str, payload: &[u8]) -> ThumbnailEntry {
    ThumbnailEntry::new(id, format!("{id}.png"), "image/png", payload.to_vec())
}

/// Run the full thumbnail store conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if a store operation fails unexpectedly.
pub async fn run_store_conformance_tests(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    test_get_missing(store).await?;
    test_put_and_get(store).await?;
    test_put_overwrites(store).await?;
    test_add_new(store).await?;
    test_add_existing(store).await?;
    test_write_modes(store).await?;
    test_touch(store).await?;
    test_remove(store).await?;
    test_invalid_keys(store).await?;
    test_concurrent_distinct_keys(store).await?;
    test_concurrent_same_key(store).await?;
    test_touch_races_put(store).await?;
    test_touch_races_remove(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let val = store.get("missing").await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_put_and_get(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let e = entry("put-get", b"hello");
    store.put(e.clone()).await?;
    let val = store.get("put-get").await?;
    assert_eq!(val.as_ref(), Some(&e), "get should return the stored entry");
    Ok(())
}

async fn test_put_overwrites(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    store.put(entry("overwrite", b"v1")).await?;
    store.put(entry("overwrite", b"v2")).await?;
    let val = store.get("overwrite").await?.expect("entry should exist");
    assert_eq!(&val.data[..], b"v2", "put should replace the previous entry");
    Ok(())
}

async fn test_add_new(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let inserted = store.add(entry("add-new", b"v1")).await?;
    assert!(inserted, "add on a vacant key should insert");
    let val = store.get("add-new").await?.expect("entry should exist");
    assert_eq!(&val.data[..], b"v1");
    Ok(())
}

async fn test_add_existing(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    store.put(entry("add-existing", b"v1")).await?;
    let inserted = store.add(entry("add-existing", b"v2")).await?;
    assert!(!inserted, "add on an occupied key should not insert");
    let val = store.get("add-existing").await?.expect("entry should exist");
    assert_eq!(&val.data[..], b"v1", "original entry should remain");
    Ok(())
}

async fn test_write_modes(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    assert!(store.write(entry("mode", b"v1"), CacheWriteMode::Replace).await?);
    assert!(
        !store
            .write(entry("mode", b"v2"), CacheWriteMode::InsertIfAbsent)
            .await?
    );
    assert_eq!(&store.get("mode").await?.expect("entry").data[..], b"v1");
    assert!(store.write(entry("mode", b"v3"), CacheWriteMode::Replace).await?);
    assert_eq!(&store.get("mode").await?.expect("entry").data[..], b"v3");
    Ok(())
}

async fn test_touch(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let old = Utc::now() - Duration::days(3);
    store
        .put(entry("touch", b"data").with_recent_used(old))
        .await?;

    let later = Utc::now().trunc_subsecs(3);
    let touched = store.touch("touch", later).await?;
    assert!(touched, "touch on existing key should return true");
    let val = store.get("touch").await?.expect("entry should exist");
    assert_eq!(val.recent_used, later, "touch should refresh recent_used");
    assert_eq!(&val.data[..], b"data", "touch should keep the payload");

    let touched = store.touch("touch-missing", later).await?;
    assert!(!touched, "touch on missing key should return false");
    Ok(())
}

async fn test_remove(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    store.put(entry("to-remove", b"bye")).await?;
    assert!(store.remove("to-remove").await?, "remove should report existing key");
    assert!(store.get("to-remove").await?.is_none());
    assert!(!store.remove("to-remove").await?, "remove on missing key should be false");
    Ok(())
}

async fn test_invalid_keys(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let before = store.len().await?;
    for bad in ["", "id:prefixed"] {
        let result = store.put(entry(bad, b"x")).await;
        assert!(
            matches!(result, Err(CacheError::InvalidKey(_))),
            "put with key {bad:?} should be rejected"
        );
    }
    assert_eq!(store.len().await?, before, "rejected writes must not store anything");
    Ok(())
}

async fn test_concurrent_distinct_keys(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let entries: Vec<_> = (0..16)
        .map(|i| entry(&format!("concurrent-{i}"), format!("payload-{i}").as_bytes()))
        .collect();
    let results = join_all(entries.iter().cloned().map(|e| store.put(e))).await;
    for r in results {
        r?;
    }
    for e in &entries {
        let val = store.get(&e.id).await?;
        assert_eq!(val.as_ref(), Some(e), "concurrent writes must not corrupt each other");
    }
    Ok(())
}

async fn test_concurrent_same_key(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    let payloads: Vec<Vec<u8>> = (0..8).map(|i| vec![i; 32]).collect();
    let results = join_all(payloads.iter().map(|p| store.put(entry("contended", p)))).await;
    for r in results {
        r?;
    }
    let val = store.get("contended").await?.expect("entry should exist");
    assert!(
        payloads.iter().any(|p| val.data[..] == p[..]),
        "same-key writes should leave one complete payload"
    );
    Ok(())
}

async fn test_touch_races_put(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    for round in 0u8..8 {
        store.put(entry("touch-put", &[round])).await?;
        let later = Utc::now().trunc_subsecs(3);
        let (touched, put) = join(
            store.touch("touch-put", later),
            store.put(entry("touch-put", &[round, round])),
        )
        .await;
        touched?;
        put?;
        let val = store.get("touch-put").await?.expect("entry should exist");
        assert_eq!(
            &val.data[..],
            &[round, round][..],
            "touch must not revert a concurrent put"
        );
    }
    Ok(())
}

async fn test_touch_races_remove(store: &dyn ThumbnailStore) -> Result<(), CacheError> {
    for _ in 0..8 {
        store.put(entry("touch-remove", b"doomed")).await?;
        let later = Utc::now().trunc_subsecs(3);
        let (touched, removed) = join(
            store.touch("touch-remove", later),
            store.remove("touch-remove"),
        )
        .await;
        touched?;
        assert!(removed?, "remove should find the entry");
        assert!(
            store.get("touch-remove").await?.is_none(),
            "touch must not bring a removed entry back"
        );
    }
    Ok(())
}

use attach_cache::{CacheError, ThumbnailEntry};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// On-disk form of a [`ThumbnailEntry`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    id: String,
    recent_used_ms: i64,
    filename: String,
    mime_type: String,
    data_base64: String,
}

impl EntryRecord {
    pub(crate) fn encode(entry: &ThumbnailEntry) -> Result<Vec<u8>, CacheError> {
        let record = Self {
            id: entry.id.clone(),
            recent_used_ms: entry.recent_used.timestamp_millis(),
            filename: entry.filename.clone(),
            mime_type: entry.mime_type.clone(),
            data_base64: B64.encode(&entry.data),
        };
        serde_json::to_vec(&record).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(raw: &[u8]) -> Result<ThumbnailEntry, CacheError> {
        let record: Self =
            serde_json::from_slice(raw).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let recent_used = DateTime::from_timestamp_millis(record.recent_used_ms).ok_or_else(|| {
            CacheError::Serialization(format!(
                "recent_used out of range: {}",
                record.recent_used_ms
            ))
        })?;
        let data = B64
            .decode(record.data_base64.as_bytes())
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(ThumbnailEntry {
            id: record.id,
            recent_used,
            filename: record.filename,
            mime_type: record.mime_type,
            data: data.into(),
        })
    }
}

use attach_core::{ID_PREFIX, UploadFile};
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};

use crate::error::CacheError;

/// A cached copy of an uploaded attachment.
///
/// `recent_used` is the eviction hint for the backing store; it is kept at
/// millisecond precision so every backend round-trips it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailEntry {
    /// Raw (unprefixed) attachment id.
    pub id: String,
    /// Last write or access time.
    pub recent_used: DateTime<Utc>,
    /// Filename copied from the source file.
    pub filename: String,
    /// MIME type copied from the source file.
    pub mime_type: String,
    /// Full payload.
    pub data: Bytes,
}

impl ThumbnailEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: id.into(),
            recent_used: now_millis(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build an entry for a freshly uploaded file.
    pub fn from_upload(id: impl Into<String>, file: &UploadFile) -> Self {
        Self::new(id, file.filename.clone(), file.mime_type.clone(), file.data.clone())
    }

    /// Override the access timestamp.
    #[must_use]
    pub fn with_recent_used(mut self, at: DateTime<Utc>) -> Self {
        self.recent_used = at.trunc_subsecs(3);
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Current time truncated to milliseconds.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Reject keys a store must never hold: empty or `id:`-prefixed ids.
pub fn validate_key(id: &str) -> Result<(), CacheError> {
    if id.trim().is_empty() || id.starts_with(ID_PREFIX) {
        return Err(CacheError::InvalidKey(id.to_owned()));
    }
    Ok(())
}

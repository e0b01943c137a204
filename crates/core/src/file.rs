use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::reference::AttachmentRef;

/// A binary payload selected for upload.
///
/// The payload is immutable once built; cloning is cheap because the data is
/// reference-counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original filename, sent as the multipart file name.
    pub filename: String,
    /// MIME type (e.g. `"image/png"`).
    pub mime_type: String,
    /// Raw file content.
    pub data: Bytes,
}

impl UploadFile {
    /// Create a new upload payload.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload has no content.
    ///
    /// Empty payloads are still uploaded; the server decides whether to
    /// accept them.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Per-call routing options for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Destination channel. Falls back to the active conversation when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl UploadOptions {
    /// Options routed to an explicit channel.
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
        }
    }

    /// Pick the channel to route to: the explicit one, else `fallback`.
    ///
    /// Blank identifiers count as absent on both sides.
    pub fn effective_channel(&self, fallback: Option<String>) -> Option<String> {
        self.channel_id
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| fallback.filter(|c| !c.trim().is_empty()))
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Canonical `id:`-prefixed reference to the uploaded attachment.
    pub attachment_id: AttachmentRef,
    /// The raw server payload, untouched.
    pub response: serde_json::Value,
}

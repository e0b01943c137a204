use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Server-side metadata for an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttachmentMeta {
    /// Raw attachment id.
    pub id: String,
    /// Original filename.
    #[serde(default)]
    pub filename: String,
    /// Stored size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Content hash as reported by the server (encoding is server-defined).
    #[serde(default)]
    pub hash: Option<String>,
}

impl AttachmentMeta {
    /// Extract the metadata from a `{"message": ..., "item": {...}}` body.
    pub(crate) fn from_response(body: Value) -> Result<Self, Error> {
        let item = match body {
            Value::Object(mut map) => map.remove("item"),
            _ => None,
        }
        .ok_or_else(|| Error::Deserialization("metadata response has no `item`".to_owned()))?;
        serde_json::from_value(item).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_item() {
        let meta = AttachmentMeta::from_response(json!({
            "message": "ok",
            "item": {"id": "abc123", "filename": "photo.png", "size": 12, "hash": "q83v"}
        }))
        .unwrap();
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.filename, "photo.png");
        assert_eq!(meta.size, 12);
        assert_eq!(meta.hash.as_deref(), Some("q83v"));
    }

    #[test]
    fn missing_item_is_a_deserialization_error() {
        let err = AttachmentMeta::from_response(json!({"message": "ok"})).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
        let err = AttachmentMeta::from_response(json!(["abc"])).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }
}

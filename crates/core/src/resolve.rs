//! Resolution of upload responses into a single attachment identifier.
//!
//! Upload endpoints have answered in two shapes over time:
//!
//! - **Assigned ids**: `{"ids": [...], "files": [...]}`. `ids` carries the
//!   attachment ids; `files` is the legacy token list and is no longer
//!   accepted on its own.
//! - **Storage tokens**: `{"files": ...}` without an `ids` key. `files`
//!   holds the tokens and is the primary field.
//!
//! A field value may be a string, a sequence or a keyed mapping; see
//! [`resolve_field_value`]. Everything here is pure so it can be tested
//! without a transport or a cache.

use serde_json::Value;
use thiserror::Error;

use crate::reference::AttachmentRef;

/// Response key holding server-assigned attachment ids.
pub const IDS_FIELD: &str = "ids";

/// Response key holding storage tokens.
pub const FILES_FIELD: &str = "files";

/// Errors from resolving an upload response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No known field yielded an identifier.
    #[error("upload failed, please try again later")]
    Unresolved,

    /// Only the deprecated field was populated.
    #[error(
        "server returned no attachment id; the legacy upload format is no longer supported, please upgrade the server"
    )]
    LegacyFormat,
}

/// Which response generation answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The response carries an `ids` key (possibly empty).
    AssignedIds,
    /// No `ids` key; `files` tokens are authoritative.
    StorageTokens,
}

impl ResponseShape {
    /// Detect the shape from the presence of the `ids` key.
    pub fn detect(response: &Value) -> Self {
        match response.as_object() {
            Some(obj) if obj.contains_key(IDS_FIELD) => Self::AssignedIds,
            _ => Self::StorageTokens,
        }
    }

    /// The field the identifier is read from.
    pub fn primary_field(self) -> &'static str {
        match self {
            Self::AssignedIds => IDS_FIELD,
            Self::StorageTokens => FILES_FIELD,
        }
    }

    /// The deprecated field checked only to reject old-format data.
    pub fn legacy_field(self) -> Option<&'static str> {
        match self {
            Self::AssignedIds => Some(FILES_FIELD),
            Self::StorageTokens => None,
        }
    }
}

/// A successfully resolved upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpload {
    /// Canonical reference returned to the caller.
    pub reference: AttachmentRef,
    /// Shape the identifier was read from.
    pub shape: ResponseShape,
}

impl ResolvedUpload {
    /// Thumbnail cache key: the raw, unprefixed id.
    pub fn cache_key(&self) -> &str {
        self.reference.raw()
    }
}

/// Resolve one response field to a single identifier string.
///
/// Precedence:
/// 1. absent or falsy (`null`, `false`, `0`, `""`) → `None`
/// 2. sequence → first element, stringified
/// 3. string → as-is
/// 4. keyed mapping → value at the first key in document order, stringified
///
/// Other scalars, nested containers and blank results yield `None`.
pub fn resolve_field_value(value: Option<&Value>) -> Option<String> {
    let candidate = match value? {
        Value::Array(items) => items.first().and_then(stringify),
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.values().next().and_then(stringify),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    };
    candidate.filter(|s| !s.trim().is_empty())
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Resolve an upload response to its canonical reference.
///
/// Reads the primary field for the detected [`ResponseShape`]. When that
/// yields nothing, a populated legacy field is a hard
/// [`ResolveError::LegacyFormat`]; otherwise [`ResolveError::Unresolved`].
pub fn resolve_upload_response(response: &Value) -> Result<ResolvedUpload, ResolveError> {
    let shape = ResponseShape::detect(response);

    if let Some(raw) = resolve_field_value(response.get(shape.primary_field())) {
        let reference = AttachmentRef::parse(&raw).map_err(|_| ResolveError::Unresolved)?;
        return Ok(ResolvedUpload { reference, shape });
    }

    let legacy = shape
        .legacy_field()
        .and_then(|field| resolve_field_value(response.get(field)));
    if legacy.is_some() {
        return Err(ResolveError::LegacyFormat);
    }

    Err(ResolveError::Unresolved)
}

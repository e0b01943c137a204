use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix that marks a canonical attachment reference.
pub const ID_PREFIX: &str = "id:";

/// Content-addressed storage token: `<hex digest>_<size in bytes>`.
static STORAGE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{32,}_[0-9]+$").expect("storage token regex is valid"));

/// Errors from parsing an attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
    /// The reference (or its raw part after the prefix) is empty.
    #[error("attachment reference is empty")]
    Empty,
}

/// Prefix `raw` with `id:` unless it already carries the prefix.
///
/// Idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(raw: &str) -> String {
    if raw.starts_with(ID_PREFIX) {
        raw.to_owned()
    } else {
        format!("{ID_PREFIX}{raw}")
    }
}

/// Returns `true` if `token` looks like a server storage token
/// (`<32+ hex chars>_<digits>`) rather than an assigned attachment id.
pub fn is_storage_token(token: &str) -> bool {
    STORAGE_TOKEN_RE.is_match(token.trim())
}

/// Canonical reference to an uploaded attachment, always `id:<raw>`.
///
/// This is the identifier used downstream in message bodies and re-fetch
/// requests. The raw part is the thumbnail cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttachmentRef(String);

impl AttachmentRef {
    /// Parse a canonical (`id:abc`) or bare (`abc`) reference.
    ///
    /// Surrounding whitespace is ignored. Fails when no raw id remains.
    pub fn parse(input: &str) -> Result<Self, RefError> {
        let trimmed = input.trim();
        let raw = trimmed.strip_prefix(ID_PREFIX).unwrap_or(trimmed);
        if raw.is_empty() {
            return Err(RefError::Empty);
        }
        Ok(Self(canonicalize(raw)))
    }

    /// The canonical `id:`-prefixed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw server-assigned id, without the prefix.
    pub fn raw(&self) -> &str {
        self.0.strip_prefix(ID_PREFIX).unwrap_or(&self.0)
    }

    /// Consume the reference, returning the canonical string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AttachmentRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AttachmentRef {
    type Error = RefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AttachmentRef> for String {
    fn from(value: AttachmentRef) -> Self {
        value.0
    }
}

impl AsRef<str> for AttachmentRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_adds_prefix_once() {
        assert_eq!(canonicalize("abc123"), "id:abc123");
        assert_eq!(canonicalize("id:abc123"), "id:abc123");
        assert_eq!(canonicalize(&canonicalize("abc123")), "id:abc123");
    }

    #[test]
    fn parse_accepts_bare_and_canonical() {
        let bare = AttachmentRef::parse("abc123").unwrap();
        let canonical = AttachmentRef::parse("id:abc123").unwrap();
        assert_eq!(bare, canonical);
        assert_eq!(bare.as_str(), "id:abc123");
        assert_eq!(bare.raw(), "abc123");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(AttachmentRef::parse(""), Err(RefError::Empty));
        assert_eq!(AttachmentRef::parse("   "), Err(RefError::Empty));
        assert_eq!(AttachmentRef::parse("id:"), Err(RefError::Empty));
    }

    #[test]
    fn parse_trims_whitespace() {
        let r: AttachmentRef = " id:xyz \n".parse().unwrap();
        assert_eq!(r.as_str(), "id:xyz");
    }

    #[test]
    fn serde_uses_canonical_string() {
        let r = AttachmentRef::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"id:abc\"");

        let back: AttachmentRef = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back.as_str(), "id:abc");

        assert!(serde_json::from_str::<AttachmentRef>("\"id:\"").is_err());
    }

    #[test]
    fn storage_token_detection() {
        let token = format!("{}_{}", "a1".repeat(16), 2048);
        assert!(is_storage_token(&token));
        assert!(!is_storage_token("abc123"));
        assert!(!is_storage_token("tok456"));
        assert!(!is_storage_token(&format!("{}_", "f".repeat(32))));
        assert!(!is_storage_token(&format!("{}_12", "g".repeat(32))));
    }
}

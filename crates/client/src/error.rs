//! Error types for the attachment client.

use attach_cache::CacheError;
use attach_core::{RefError, ResolveError};
use thiserror::Error;

/// Errors that can occur when using the attachment client.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error (network failure, DNS resolution, timeout, etc.).
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP error with status code.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the status text.
        message: String,
    },

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// The upload response carried no usable attachment id.
    #[error("{}", ResolveError::Unresolved)]
    UnresolvedIdentifier,

    /// The upload response only carried the deprecated token field.
    #[error("{}", ResolveError::LegacyFormat)]
    UnsupportedLegacyFormat,

    /// The upload was cancelled before the server answered.
    #[error("upload cancelled")]
    Cancelled,

    /// An attachment reference could not be parsed.
    #[error("invalid attachment reference: {0}")]
    InvalidReference(#[from] RefError),

    /// Thumbnail cache failure on an explicit cache operation.
    ///
    /// Uploads never return this; cache writes during upload are logged only.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Unresolved => Self::UnresolvedIdentifier,
            ResolveError::LegacyFormat => Self::UnsupportedLegacyFormat,
        }
    }
}

impl Error {
    /// Returns `true` if this error is retryable.
    ///
    /// Connection errors, HTTP 5xx errors and unresolved upload responses
    /// return `true`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::UnresolvedIdentifier => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Deserialization(_)
            | Self::UnsupportedLegacyFormat
            | Self::Cancelled
            | Self::InvalidReference(_)
            | Self::Cache(_)
            | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if the failure happened in the transport step.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Http { .. } | Self::Deserialization(_)
        )
    }

    /// Returns the HTTP status if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_is_retryable_transport() {
        let err = Error::Connection("timeout".to_string());
        assert!(err.is_retryable());
        assert!(err.is_transport());
    }

    #[test]
    fn http_status_drives_retry() {
        let err = Error::Http {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(502));

        let err = Error::Http {
            status: 400,
            message: "Bad Request".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.is_transport());
    }

    #[test]
    fn resolve_errors_map_to_distinct_variants() {
        assert!(matches!(
            Error::from(ResolveError::Unresolved),
            Error::UnresolvedIdentifier
        ));
        assert!(matches!(
            Error::from(ResolveError::LegacyFormat),
            Error::UnsupportedLegacyFormat
        ));
    }

    #[test]
    fn identifier_errors_are_not_transport_errors() {
        assert!(!Error::UnresolvedIdentifier.is_transport());
        assert!(!Error::UnsupportedLegacyFormat.is_transport());
        assert!(Error::UnresolvedIdentifier.is_retryable());
        assert!(!Error::UnsupportedLegacyFormat.is_retryable());
    }

    #[test]
    fn messages_match_resolver_wording() {
        assert_eq!(
            Error::UnresolvedIdentifier.to_string(),
            ResolveError::Unresolved.to_string()
        );
        assert!(
            Error::UnsupportedLegacyFormat
                .to_string()
                .contains("no longer supported")
        );
    }
}

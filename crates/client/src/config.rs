//! Uploader configuration, loaded from TOML.
//!
//! Values come from user-editable files, so every field is validated and
//! falls back to its default when blank or out of range instead of failing
//! the whole load.
//!
//! ```toml
//! base_url = "https://chat.example.com"
//! timeout_secs = 60
//! cache_write = "insert_if_absent"
//! cache_dir = "/var/cache/attach"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use attach_cache::CacheWriteMode;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;

/// Characters escaped when an id is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn default_base_url() -> String {
    "http://localhost:3212".to_owned()
}

fn default_upload_path() -> String {
    "/api/v1/attachment-upload".to_owned()
}

fn default_attachment_path() -> String {
    "/api/v1/attachment".to_owned()
}

fn default_file_field() -> String {
    "file".to_owned()
}

fn default_channel_header() -> String {
    "ChannelId".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration for [`AttachmentUploader`](crate::AttachmentUploader) and
/// its HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Server base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Multipart upload endpoint.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Attachment download endpoint; `/{id}` and `/{id}/meta` are appended.
    #[serde(default = "default_attachment_path")]
    pub attachment_path: String,
    /// Multipart field name carrying the file.
    #[serde(default = "default_file_field")]
    pub file_field: String,
    /// Header carrying the routing channel.
    #[serde(default = "default_channel_header")]
    pub channel_header: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How fresh uploads are written into the thumbnail cache.
    #[serde(default)]
    pub cache_write: CacheWriteMode,
    /// Directory for the on-disk thumbnail cache, if any.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_path: default_upload_path(),
            attachment_path: default_attachment_path(),
            file_field: default_file_field(),
            channel_header: default_channel_header(),
            timeout_secs: default_timeout_secs(),
            cache_write: CacheWriteMode::default(),
            cache_dir: None,
        }
    }
}

impl UploaderConfig {
    /// Parse and normalize a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let config: Self =
            toml::from_str(raw).map_err(|e| Error::Configuration(format!("invalid config: {e}")))?;
        Ok(config.normalized())
    }

    /// Read, parse and normalize a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Configuration(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Replace invalid values with defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        let defaults = Self::default();

        let base_url = self.base_url.trim().trim_end_matches('/').to_owned();
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url
        } else {
            warn!(value = %self.base_url, "invalid base_url, using default");
            defaults.base_url
        };

        let timeout_secs = if self.timeout_secs == 0 {
            warn!("timeout_secs must be positive, using default");
            defaults.timeout_secs
        } else {
            self.timeout_secs
        };

        let cache_dir = self
            .cache_dir
            .filter(|dir| !dir.as_os_str().is_empty());

        Self {
            base_url,
            upload_path: normalize_path("upload_path", &self.upload_path, defaults.upload_path),
            attachment_path: normalize_path(
                "attachment_path",
                &self.attachment_path,
                defaults.attachment_path,
            ),
            file_field: non_blank("file_field", self.file_field, defaults.file_field),
            channel_header: non_blank("channel_header", self.channel_header, defaults.channel_header),
            timeout_secs,
            cache_write: self.cache_write,
            cache_dir,
        }
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Download path for a raw attachment id.
    pub fn attachment_url_path(&self, raw_id: &str) -> String {
        format!(
            "{}/{}",
            self.attachment_path,
            utf8_percent_encode(raw_id, PATH_SEGMENT)
        )
    }

    /// Metadata path for a raw attachment id.
    pub fn meta_url_path(&self, raw_id: &str) -> String {
        format!("{}/meta", self.attachment_url_path(raw_id))
    }
}

fn non_blank(field: &str, value: String, default: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        warn!(field, "blank value, using default");
        default
    } else {
        trimmed.to_owned()
    }
}

fn normalize_path(field: &str, value: &str, default: String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        warn!(field, "blank path, using default");
        return default;
    }
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

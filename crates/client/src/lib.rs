//! Attachment upload client
//!
//! Uploads a local file to the chat server, turns whichever response shape
//! the server answers with into one canonical `id:` reference, and keeps a
//! copy of the payload in a local thumbnail cache for instant redisplay.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use attach_cache_memory::MemoryThumbnailStore;
//! use attach_client::{AttachmentUploader, StaticSession, UploaderConfig};
//! use attach_core::{UploadFile, UploadOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), attach_client::Error> {
//!     let uploader = AttachmentUploader::builder()
//!         .config(UploaderConfig::default())
//!         .session(Arc::new(StaticSession::new("session-token")))
//!         .cache(Arc::new(MemoryThumbnailStore::new()))
//!         .build()?;
//!
//!     let file = UploadFile::new("photo.png", "image/png", vec![0u8; 12]);
//!     let result = uploader.upload(&file, &UploadOptions::channel("ch-1")).await?;
//!     println!("uploaded as {}", result.attachment_id);
//!     Ok(())
//! }
//! ```
//!
//! # Failure model
//!
//! - Transport failures and unusable responses are returned to the caller.
//! - A response carrying only the deprecated token field is rejected with
//!   [`Error::UnsupportedLegacyFormat`] rather than silently accepted.
//! - Cache failures are logged with `tracing` and never fail an upload.

pub mod config;
pub mod context;
mod error;
pub mod meta;
pub mod transport;
mod uploader;

pub use config::UploaderConfig;
pub use context::{ActiveConversation, ConversationContext, SessionContext, StaticSession};
pub use error::Error;
pub use meta::AttachmentMeta;
pub use transport::{HttpTransport, HttpTransportBuilder, RemoteBlob, Transport};
pub use uploader::{AttachmentUploader, AttachmentUploaderBuilder};

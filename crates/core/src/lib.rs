//! Core types for the attachment ingestion pipeline.
//!
//! This crate is free of I/O. It holds the data model shared by the client,
//! the thumbnail cache backends and the CLI, plus the pure resolver that turns
//! an untrusted upload response into a single [`AttachmentRef`].

pub mod file;
pub mod reference;
pub mod resolve;

pub use file::{UploadFile, UploadOptions, UploadResult};
pub use reference::{AttachmentRef, ID_PREFIX, RefError, canonicalize, is_storage_token};
pub use resolve::{
    FILES_FIELD, IDS_FIELD, ResolveError, ResolvedUpload, ResponseShape, resolve_field_value,
    resolve_upload_response,
};

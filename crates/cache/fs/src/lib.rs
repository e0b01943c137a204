//! Filesystem-backed thumbnail cache.
//!
//! Each entry lives in its own file so writes to different keys never touch
//! the same path. Files are written to a unique temporary path and moved into
//! place, so a reader sees either the previous entry or the new one.
//!
//! Layout: `{root}/thumbs/{first-2-hex}/{sha256(id)}.entry`

mod record;
mod store;

pub use store::FsThumbnailStore;

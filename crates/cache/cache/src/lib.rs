pub mod entry;
pub mod error;
pub mod store;
pub mod testing;

pub use entry::{ThumbnailEntry, validate_key};
pub use error::CacheError;
pub use store::{CacheWriteMode, ThumbnailStore};

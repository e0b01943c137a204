mod store;

pub use store::MemoryThumbnailStore;

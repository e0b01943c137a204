pub mod cache;
pub mod fetch;
pub mod meta;
pub mod upload;

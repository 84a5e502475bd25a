//! Data models for the lending library

pub mod book;
pub mod lending;
pub mod search;

// Re-export commonly used types
pub use book::{Book, NewBook};
pub use lending::Lend;
pub use search::{BookQuery, SearchQuery};

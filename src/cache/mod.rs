//! Local persistence: the [`KeyValueStorage`] collaborator and the [`LocalCache`] built on it.

pub mod error;
pub mod local;
pub mod storage;

pub use error::CacheError;
pub use local::LocalCache;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

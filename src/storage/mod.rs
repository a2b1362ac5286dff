//!
//! stockgate storage module
//! ------------------------
//! Persisted key/value state that outlives a process restart, playing the part
//! browser local storage plays for the web front-end. Two implementations:
//! a JSON document on disk (`FileStore`) and a process-local map
//! (`MemoryStore`). Both are cheap to share behind an `Arc<dyn KeyValueStore>`.
//!
//! Values are opaque strings; callers own their encoding.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;

/// Key under which the bearer credential is persisted.
pub const TOKEN_KEY: &str = "jwt_token";
/// Key under which the last policy snapshot is persisted.
pub const CLEARANCE_LEVELS_KEY: &str = "clearance_levels";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

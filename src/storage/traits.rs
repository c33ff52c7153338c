//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::StoreKey;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt record {key}: {message}")]
    Corrupt { key: String, message: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable key -> JSON storage backends
///
/// Keys are namespaced by platform, so one backend instance may be shared
/// by several crawls as long as each platform is crawled by one task.
pub trait Store: Send {
    /// Reads a record; a missing record is `Ok(None)`
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>>;

    /// Writes a record, replacing any previous value
    ///
    /// A concurrent or subsequent `get` observes either the old or the new
    /// value, never a partial write.
    fn put(&mut self, key: &StoreKey, value: &Value) -> StorageResult<()>;

    /// Removes a record; removing a missing record succeeds
    fn delete(&mut self, key: &StoreKey) -> StorageResult<()>;

    /// Lists the stored page fragment numbers for a platform, ascending
    fn page_numbers(&self, platform: &str) -> StorageResult<Vec<u64>>;

    /// Short description of the backend for log lines
    fn describe(&self) -> String;
}

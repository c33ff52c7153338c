//! Storage module for persisting crawl data
//!
//! This module handles every durable write the crawler makes, including:
//! - Crawl progress checkpoints
//! - Raw listing page fragments
//! - The working collection of enriched programs
//! - The final per-platform artifact
//!
//! Records are addressed by [`StoreKey`], whose logical path is the same for
//! every backend:
//!
//! | Record | Logical path |
//! |--------|--------------|
//! | progress | `progress/<platform>.json` |
//! | page fragment | `progress/<platform>_page<N>.json` |
//! | working collection | `progress/<platform>_items.json` |
//! | final artifact | `programs/<platform>.json` |

mod files;
mod progress_store;
mod schema;
mod sqlite;
mod traits;

pub use files::FileStore;
pub use progress_store::ProgressStore;
pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, Store};

use crate::config::{OutputConfig, StorageBackend};
use crate::HarvestError;
use std::fmt;
use std::path::Path;

/// Kind of record stored for a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Progress,
    Page(u64),
    Collection,
    Final,
}

/// Address of one stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub platform: String,
    pub kind: RecordKind,
}

impl StoreKey {
    pub fn new(platform: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            platform: platform.into(),
            kind,
        }
    }

    pub fn progress(platform: &str) -> Self {
        Self::new(platform, RecordKind::Progress)
    }

    pub fn page(platform: &str, number: u64) -> Self {
        Self::new(platform, RecordKind::Page(number))
    }

    pub fn collection(platform: &str) -> Self {
        Self::new(platform, RecordKind::Collection)
    }

    pub fn final_artifact(platform: &str) -> Self {
        Self::new(platform, RecordKind::Final)
    }

    /// File name of the record inside its directory
    pub fn file_name(&self) -> String {
        match self.kind {
            RecordKind::Progress | RecordKind::Final => format!("{}.json", self.platform),
            RecordKind::Page(number) => format!("{}_page{}.json", self.platform, number),
            RecordKind::Collection => format!("{}_items.json", self.platform),
        }
    }

    /// Returns true for records living next to the final results
    pub fn is_final(&self) -> bool {
        self.kind == RecordKind::Final
    }

    /// Backend-independent path of the record
    pub fn logical_path(&self) -> String {
        let dir = if self.is_final() { "programs" } else { "progress" };
        format!("{}/{}", dir, self.file_name())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical_path())
    }
}

/// Parses the page number out of a fragment file name for `platform`
pub(crate) fn parse_page_file_name(platform: &str, file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(platform)?
        .strip_prefix("_page")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Opens the storage backend selected in the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(Box<dyn Store>)` - Successfully opened backend
/// * `Err(HarvestError)` - Failed to open the backend
pub fn open_store(config: &OutputConfig) -> Result<Box<dyn Store>, HarvestError> {
    match config.storage_backend {
        StorageBackend::Files => Ok(Box::new(FileStore::new(
            &config.progress_dir,
            &config.results_dir,
        ))),
        StorageBackend::Sqlite => {
            let path = config.database_path.as_deref().ok_or_else(|| {
                crate::ConfigError::Validation(
                    "database-path is required for the sqlite backend".to_string(),
                )
            })?;
            Ok(Box::new(SqliteStore::new(Path::new(path))?))
        }
    }
}

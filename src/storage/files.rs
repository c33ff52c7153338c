//! Directory-backed storage implementation
//!
//! Progress records and page fragments live in the progress directory;
//! final artifacts in the results directory. Writes go to a temporary file
//! first and are renamed over the target, so readers never see a torn file.

use crate::storage::traits::{StorageError, StorageResult, Store};
use crate::storage::{parse_page_file_name, StoreKey};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// JSON-file storage backend
#[derive(Debug, Clone)]
pub struct FileStore {
    progress_dir: PathBuf,
    results_dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at the two directories
    ///
    /// Directories are created on first write.
    pub fn new(progress_dir: impl AsRef<Path>, results_dir: impl AsRef<Path>) -> Self {
        Self {
            progress_dir: progress_dir.as_ref().to_path_buf(),
            results_dir: results_dir.as_ref().to_path_buf(),
        }
    }

    /// Filesystem path of a record
    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        let dir = if key.is_final() {
            &self.results_dir
        } else {
            &self.progress_dir
        };
        dir.join(key.file_name())
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(payload)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

impl Store for FileStore {
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
            key: key.logical_path(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }

    fn put(&mut self, key: &StoreKey, value: &Value) -> StorageResult<()> {
        let payload = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.path_for(key), &payload)?;
        tracing::trace!("Wrote {}", key);
        Ok(())
    }

    fn delete(&mut self, key: &StoreKey) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn page_numbers(&self, platform: &str) -> StorageResult<Vec<u64>> {
        let entries = match fs::read_dir(&self.progress_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(number) = parse_page_file_name(platform, name) {
                    numbers.push(number);
                }
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    fn describe(&self) -> String {
        format!(
            "files (progress: {}, results: {})",
            self.progress_dir.display(),
            self.results_dir.display()
        )
    }
}

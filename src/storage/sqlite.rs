//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.
//! Every record is one row keyed by its logical path.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, Store};
use crate::storage::{parse_page_file_name, StoreKey};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        // Several platform crawls may hold a connection to the same file
        conn.busy_timeout(Duration::from_secs(10))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, path: None })
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM blobs WHERE key = ?1",
                params![key.logical_path()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => {
                let value = serde_json::from_str(&body).map_err(|e| StorageError::Corrupt {
                    key: key.logical_path(),
                    message: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &StoreKey, value: &Value) -> StorageResult<()> {
        let body = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO blobs (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key.logical_path(), body, Utc::now().to_rfc3339()],
        )?;
        tracing::trace!("Wrote {}", key);
        Ok(())
    }

    fn delete(&mut self, key: &StoreKey) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM blobs WHERE key = ?1",
            params![key.logical_path()],
        )?;
        Ok(())
    }

    fn page_numbers(&self, platform: &str) -> StorageResult<Vec<u64>> {
        let prefix = "progress/";
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM blobs WHERE substr(key, 1, ?1) = ?2")?;
        let pattern = format!("{}{}", prefix, platform);
        let keys = stmt.query_map(params![pattern.len() as i64, pattern], |row| {
            row.get::<_, String>(0)
        })?;

        let mut numbers = Vec::new();
        for key in keys {
            let key = key?;
            if let Some(number) = key
                .strip_prefix(prefix)
                .and_then(|name| parse_page_file_name(platform, name))
            {
                numbers.push(number);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite ({})", path.display()),
            None => "sqlite (in memory)".to_string(),
        }
    }
}

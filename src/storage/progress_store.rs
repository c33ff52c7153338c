//! Platform-scoped view over a storage backend
//!
//! A `ProgressStore` owns every record of one platform crawl. Nothing in the
//! process shares it; concurrent crawls each get their own.

use crate::collection::{Page, ResultCollection};
use crate::state::CrawlProgress;
use crate::storage::traits::{StorageError, StorageResult, Store};
use crate::storage::StoreKey;
use chrono::Utc;
use serde_json::Value;

pub struct ProgressStore {
    store: Box<dyn Store>,
    platform: String,
}

impl ProgressStore {
    /// Creates a store for one platform's crawl records
    pub fn new(store: Box<dyn Store>, platform: impl Into<String>) -> Self {
        Self {
            store,
            platform: platform.into(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    // ===== Crawl Progress =====

    /// Loads the progress record, or an empty one if none exists
    pub fn load(&self) -> StorageResult<CrawlProgress> {
        let key = StoreKey::progress(&self.platform);
        match self.store.get(&key)? {
            Some(value) => serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
                key: key.logical_path(),
                message: e.to_string(),
            }),
            None => Ok(CrawlProgress::default()),
        }
    }

    /// Returns true if a progress record is stored
    pub fn has_progress(&self) -> StorageResult<bool> {
        Ok(self
            .store
            .get(&StoreKey::progress(&self.platform))?
            .is_some())
    }

    /// Stamps and atomically overwrites the progress record
    pub fn save(&mut self, progress: &mut CrawlProgress) -> StorageResult<()> {
        progress.updated_at = Some(Utc::now());
        let value = serde_json::to_value(&*progress)?;
        self.store.put(&StoreKey::progress(&self.platform), &value)?;
        tracing::debug!(
            "Saved {} progress: phase={}, last_page={}, processed={}",
            self.platform,
            progress.phase,
            progress.last_page,
            progress.processed_item_ids.len()
        );
        Ok(())
    }

    pub fn clear(&mut self) -> StorageResult<()> {
        self.store.delete(&StoreKey::progress(&self.platform))
    }

    // ===== Page Fragments =====

    pub fn write_page(&mut self, page: &Page) -> StorageResult<()> {
        self.store
            .put(&StoreKey::page(&self.platform, page.number), &page.body)
    }

    pub fn read_page(&self, number: u64) -> StorageResult<Option<Page>> {
        Ok(self
            .store
            .get(&StoreKey::page(&self.platform, number))?
            .map(|body| Page::new(number, body)))
    }

    /// Stored fragment numbers, ascending
    pub fn page_numbers(&self) -> StorageResult<Vec<u64>> {
        self.store.page_numbers(&self.platform)
    }

    pub fn delete_page(&mut self, number: u64) -> StorageResult<()> {
        self.store.delete(&StoreKey::page(&self.platform, number))
    }

    // ===== Working Collection =====

    /// Loads the enriched records saved during the enrichment phase
    pub fn load_collection(&self) -> StorageResult<Option<Vec<Value>>> {
        self.read_array(&StoreKey::collection(&self.platform))
    }

    pub fn save_collection(&mut self, collection: &ResultCollection) -> StorageResult<()> {
        self.store.put(
            &StoreKey::collection(&self.platform),
            &collection.to_value(),
        )
    }

    pub fn clear_collection(&mut self) -> StorageResult<()> {
        self.store.delete(&StoreKey::collection(&self.platform))
    }

    // ===== Final Artifact =====

    pub fn read_final(&self) -> StorageResult<Option<Vec<Value>>> {
        self.read_array(&StoreKey::final_artifact(&self.platform))
    }

    pub fn has_final(&self) -> StorageResult<bool> {
        Ok(self
            .store
            .get(&StoreKey::final_artifact(&self.platform))?
            .is_some())
    }

    pub fn write_final(&mut self, collection: &ResultCollection) -> StorageResult<()> {
        self.store.put(
            &StoreKey::final_artifact(&self.platform),
            &collection.to_value(),
        )
    }

    /// Removes every record of this platform, final artifact included
    pub fn reset(&mut self) -> StorageResult<()> {
        for number in self.page_numbers()? {
            self.delete_page(number)?;
        }
        self.clear_collection()?;
        self.store
            .delete(&StoreKey::final_artifact(&self.platform))?;
        self.clear()
    }

    fn read_array(&self, key: &StoreKey) -> StorageResult<Option<Vec<Value>>> {
        match self.store.get(key)? {
            Some(Value::Array(records)) => Ok(Some(records)),
            Some(_) => Err(StorageError::Corrupt {
                key: key.logical_path(),
                message: "expected a JSON array".to_string(),
            }),
            None => Ok(None),
        }
    }
}

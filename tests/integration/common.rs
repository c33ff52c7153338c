//! Shared fixtures for the integration tests
//!
//! `FakeTransport` answers from a scripted table of responses and records
//! every request it sees. `TestAdapter` is a minimal numbered-page
//! platform whose listing ends at the first empty page.

use async_trait::async_trait;
use bounty_harvest::crawler::{CrawlSettings, PlatformCrawl, Transport, TransportError};
use bounty_harvest::platform::{ListingContainer, PageRequest, PlatformAdapter};
use bounty_harvest::storage::{
    FileStore, ProgressStore, RecordKind, StorageError, StorageResult, Store, StoreKey,
};
use bounty_harvest::Item;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PLATFORM: &str = "test";

pub fn list_request(page: u64) -> PageRequest {
    PageRequest::new("mem://programs").with_param("page", page.to_string())
}

pub fn detail_request(id: &str) -> PageRequest {
    PageRequest::new(format!("mem://programs/{}", id))
}

/// Listing body holding one record per identifier
pub fn listing(ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "name": format!("Program {}", id)}))
        .collect();
    json!({ "items": items })
}

pub fn detail(id: &str) -> Value {
    json!({ "id": id, "scopes": [format!("*.{}.test", id)] })
}

pub struct TestAdapter;

impl PlatformAdapter for TestAdapter {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn container(&self) -> ListingContainer {
        ListingContainer::Key("items")
    }

    fn first_request(&self) -> PageRequest {
        list_request(1)
    }

    fn next_request(&self, current: &PageRequest, _response: &Value) -> Option<PageRequest> {
        let page: u64 = current.param("page")?.parse().ok()?;
        Some(list_request(page + 1))
    }

    fn item_id(&self, record: &Value) -> Option<String> {
        record.get("id")?.as_str().map(str::to_string)
    }

    fn detail_request(&self, item: &Item) -> PageRequest {
        detail_request(item.id())
    }

    fn detail_field(&self) -> &str {
        "scopes"
    }
}

enum Reply {
    Body(Value),
    Status(u16),
}

/// Scripted in-memory transport
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, request: &PageRequest, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(request.to_string(), Reply::Body(body));
    }

    pub fn fail(&self, request: &PageRequest, status: u16) {
        self.replies
            .lock()
            .unwrap()
            .insert(request.to_string(), Reply::Status(status));
    }

    /// Scripts a full listing, one page per slice, followed by an empty page
    pub fn listing_pages(&self, pages: &[&[&str]]) {
        for (i, ids) in pages.iter().enumerate() {
            self.respond(&list_request(i as u64 + 1), listing(ids));
        }
        self.respond(&list_request(pages.len() as u64 + 1), listing(&[]));
    }

    /// Scripts a detail response for each identifier
    pub fn details(&self, ids: &[&str]) {
        for id in ids {
            self.respond(&detail_request(id), detail(id));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, request: &PageRequest) -> usize {
        let url = request.to_string();
        self.calls().iter().filter(|call| **call == url).count()
    }

    pub fn detail_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !call.contains('?'))
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, request: &PageRequest) -> Result<Value, TransportError> {
        let url = request.to_string();
        self.calls.lock().unwrap().push(url.clone());
        match self.replies.lock().unwrap().get(&url) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(TransportError::Status {
                url,
                status: *status,
            }),
            None => Err(TransportError::Status { url, status: 404 }),
        }
    }
}

/// A file-backed store that starts failing progress writes after a budget
pub struct CrashingStore {
    inner: FileStore,
    progress_writes_left: Arc<AtomicUsize>,
}

impl CrashingStore {
    pub fn new(dirs: &TempDir, progress_writes: usize) -> Self {
        let (progress_dir, results_dir) = store_dirs(dirs);
        Self {
            inner: FileStore::new(progress_dir, results_dir),
            progress_writes_left: Arc::new(AtomicUsize::new(progress_writes)),
        }
    }
}

impl Store for CrashingStore {
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &StoreKey, value: &Value) -> StorageResult<()> {
        if key.kind == RecordKind::Progress {
            let left = self.progress_writes_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated crash",
                )));
            }
            self.progress_writes_left.store(left - 1, Ordering::SeqCst);
        }
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &StoreKey) -> StorageResult<()> {
        self.inner.delete(key)
    }

    fn page_numbers(&self, platform: &str) -> StorageResult<Vec<u64>> {
        self.inner.page_numbers(platform)
    }

    fn describe(&self) -> String {
        format!("crashing {}", self.inner.describe())
    }
}

pub fn store_dirs(dirs: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    (dirs.path().join("progress"), dirs.path().join("programs"))
}

pub fn file_store(dirs: &TempDir) -> ProgressStore {
    let (progress_dir, results_dir) = store_dirs(dirs);
    ProgressStore::new(Box::new(FileStore::new(progress_dir, results_dir)), PLATFORM)
}

pub fn crawl_with(
    store: ProgressStore,
    transport: &Arc<FakeTransport>,
    settings: CrawlSettings,
) -> PlatformCrawl {
    let transport: Arc<dyn Transport> = transport.clone();
    PlatformCrawl::new(Box::new(TestAdapter), transport, store, settings)
}

pub fn crawl(dirs: &TempDir, transport: &Arc<FakeTransport>) -> PlatformCrawl {
    crawl_with(file_store(dirs), transport, CrawlSettings::default())
}

/// Identifiers in the final artifact, in order
pub fn final_ids(dirs: &TempDir) -> Vec<String> {
    file_store(dirs)
        .read_final()
        .unwrap()
        .expect("final artifact")
        .iter()
        .map(|record| record["id"].as_str().unwrap().to_string())
        .collect()
}

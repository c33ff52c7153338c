//! Listing pages, program items and the accumulated result collection
//!
//! Items keep the platform's raw program record untouched apart from the
//! detail sub-structure merged into them, so the final artifact is the same
//! JSON a platform returns, plus one enriched field per program.

use crate::platform::PlatformAdapter;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One fetched listing page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number within the crawl
    pub number: u64,

    /// Raw response body
    pub body: Value,
}

impl Page {
    pub fn new(number: u64, body: Value) -> Self {
        Self { number, body }
    }

    /// Returns the listing records in this page, or None if the
    /// platform's container is missing
    pub fn records<'a>(&'a self, adapter: &dyn PlatformAdapter) -> Option<&'a [Value]> {
        adapter.listing_items(&self.body)
    }
}

/// Result of merging detail data into an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The field was added or replaced
    Merged,

    /// The field already held exactly this value
    Unchanged,
}

/// A single program record with a stable identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    record: Map<String, Value>,
}

impl Item {
    /// Creates an item from an identifier and an object record
    pub fn new(id: impl Into<String>, record: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }

    /// Builds an item from a raw listing record
    ///
    /// Returns None if the record is not an object or the adapter cannot
    /// find its identifier.
    pub fn from_record(adapter: &dyn PlatformAdapter, record: Value) -> Option<Self> {
        let id = adapter.item_id(&record)?;
        match record {
            Value::Object(map) => Some(Self::new(id, map)),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// Sets `key` to `value`, leaving the record untouched if it already
    /// holds that exact value
    pub fn merge_field(&mut self, key: &str, value: Value) -> MergeOutcome {
        if self.record.get(key) == Some(&value) {
            return MergeOutcome::Unchanged;
        }
        self.record.insert(key.to_string(), value);
        MergeOutcome::Merged
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

/// Ordered collection of items with unique identifiers
///
/// Insertion order is preserved. Pushing an item whose identifier is
/// already present is ignored, so the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from raw records, see [`ResultCollection::extend_records`]
    pub fn from_records(adapter: &dyn PlatformAdapter, records: &[Value]) -> Self {
        let mut collection = Self::new();
        collection.extend_records(adapter, records);
        collection
    }

    /// Adds an item, returning false if its identifier is already present
    pub fn push(&mut self, item: Item) -> bool {
        if self.index.contains_key(item.id()) {
            return false;
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Appends listing records that pass the adapter's filter
    ///
    /// Records without an identifier are dropped. Returns the number of
    /// records actually added.
    pub fn extend_records(&mut self, adapter: &dyn PlatformAdapter, records: &[Value]) -> usize {
        let mut added = 0;
        for record in records {
            if !adapter.retain(record) {
                continue;
            }
            match Item::from_record(adapter, record.clone()) {
                Some(item) => {
                    if self.push(item) {
                        added += 1;
                    }
                }
                None => {
                    tracing::warn!(
                        "Dropping {} record without an identifier",
                        adapter.name()
                    );
                }
            }
        }
        added
    }

    /// Replaces items with their counterparts from `enriched`
    ///
    /// Only identifiers already in this collection are touched; order is
    /// unchanged. Returns the number of replaced items.
    pub fn overlay(&mut self, enriched: ResultCollection) -> usize {
        let mut replaced = 0;
        for item in enriched.items {
            if let Some(&position) = self.index.get(item.id()) {
                self.items[position] = item;
                replaced += 1;
            }
        }
        replaced
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub(crate) fn item_mut(&mut self, position: usize) -> Option<&mut Item> {
        self.items.get_mut(position)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Item::id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serializes the collection as a JSON array of records
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.items
                .iter()
                .map(|item| Value::Object(item.record.clone()))
                .collect(),
        )
    }
}

impl Serialize for ResultCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

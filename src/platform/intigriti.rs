//! Intigriti public program adapter
//!
//! The listing is one unpaged JSON array. Program detail keeps every
//! revision of the scope under `domains`; only the latest one is kept.

use crate::collection::Item;
use crate::platform::{pointer_str, ListingContainer, PageRequest, PlatformAdapter};
use serde_json::Value;

/// Confidentiality level of programs visible to everyone
const PUBLIC_CONFIDENTIALITY: i64 = 4;

pub struct Intigriti {
    base_url: String,
}

impl Intigriti {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl PlatformAdapter for Intigriti {
    fn name(&self) -> &str {
        "intigriti"
    }

    fn container(&self) -> ListingContainer {
        ListingContainer::BareList
    }

    fn first_request(&self) -> PageRequest {
        PageRequest::new(format!("{}/programs", self.base_url))
    }

    fn next_request(&self, _current: &PageRequest, _response: &Value) -> Option<PageRequest> {
        None
    }

    fn item_id(&self, record: &Value) -> Option<String> {
        let company = pointer_str(record, "/companyHandle")?;
        let handle = pointer_str(record, "/handle")?;
        Some(format!("{}/{}", company, handle))
    }

    /// Public programs that do not require accepting terms first
    fn retain(&self, record: &Value) -> bool {
        let public = record.get("confidentialityLevel").and_then(Value::as_i64)
            == Some(PUBLIC_CONFIDENTIALITY);
        let tac_required = record
            .get("tacRequired")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        public && !tac_required
    }

    fn detail_request(&self, item: &Item) -> PageRequest {
        PageRequest::new(format!("{}/programs/{}", self.base_url, item.id()))
    }

    fn detail_field(&self) -> &str {
        "domains"
    }

    fn extract_detail(&self, detail: &Value) -> Option<Value> {
        detail
            .get("domains")?
            .as_array()?
            .last()?
            .get("content")
            .cloned()
    }
}

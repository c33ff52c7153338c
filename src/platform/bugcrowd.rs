//! Bugcrowd public program listing adapter

use crate::collection::Item;
use crate::platform::{
    next_numbered_page, pointer_count, pointer_str, ListingContainer, PageRequest,
    PlatformAdapter,
};
use serde_json::Value;

const PAGE_PARAM: &str = "page[]";

pub struct Bugcrowd {
    base_url: String,
}

impl Bugcrowd {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl PlatformAdapter for Bugcrowd {
    fn name(&self) -> &str {
        "bugcrowd"
    }

    fn container(&self) -> ListingContainer {
        ListingContainer::Key("programs")
    }

    fn first_request(&self) -> PageRequest {
        PageRequest::new(format!("{}/programs.json", self.base_url)).with_param(PAGE_PARAM, "1")
    }

    fn next_request(&self, current: &PageRequest, response: &Value) -> Option<PageRequest> {
        next_numbered_page(current, PAGE_PARAM, self.total_pages(response))
    }

    fn total_pages(&self, response: &Value) -> Option<u64> {
        pointer_count(response, "/meta/totalPages")
    }

    fn item_id(&self, record: &Value) -> Option<String> {
        pointer_str(record, "/code")
    }

    /// Only programs open to everyone
    fn retain(&self, record: &Value) -> bool {
        record.get("invited_status").and_then(Value::as_str) == Some("open")
    }

    fn detail_request(&self, item: &Item) -> PageRequest {
        PageRequest::new(format!("{}/{}/target_groups", self.base_url, item.id()))
    }

    fn detail_field(&self) -> &str {
        "target_groups"
    }
}

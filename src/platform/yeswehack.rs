//! YesWeHack public API adapter

use crate::collection::Item;
use crate::platform::{
    next_numbered_page, pointer_count, pointer_str, ListingContainer, PageRequest,
    PlatformAdapter,
};
use serde_json::Value;

const PAGE_PARAM: &str = "page";

pub struct YesWeHack {
    base_url: String,
}

impl YesWeHack {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl PlatformAdapter for YesWeHack {
    fn name(&self) -> &str {
        "yeswehack"
    }

    fn container(&self) -> ListingContainer {
        ListingContainer::Key("items")
    }

    fn first_request(&self) -> PageRequest {
        PageRequest::new(format!("{}/programs", self.base_url)).with_param(PAGE_PARAM, "1")
    }

    fn next_request(&self, current: &PageRequest, response: &Value) -> Option<PageRequest> {
        next_numbered_page(current, PAGE_PARAM, self.total_pages(response))
    }

    fn total_pages(&self, response: &Value) -> Option<u64> {
        pointer_count(response, "/pagination/nb_pages")
    }

    fn item_id(&self, record: &Value) -> Option<String> {
        pointer_str(record, "/slug")
    }

    fn detail_request(&self, item: &Item) -> PageRequest {
        PageRequest::new(format!("{}/programs/{}", self.base_url, item.id()))
    }

    fn detail_field(&self) -> &str {
        "scopes"
    }
}

//! HackerOne hacker API adapter
//!
//! The listing is cursor-paged: each response carries an absolute
//! `links.next` URL until the last page.

use crate::collection::Item;
use crate::platform::{pointer_str, ListingContainer, PageRequest, PlatformAdapter};
use serde_json::Value;

pub struct HackerOne {
    base_url: String,
}

impl HackerOne {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl PlatformAdapter for HackerOne {
    fn name(&self) -> &str {
        "hackerone"
    }

    fn container(&self) -> ListingContainer {
        ListingContainer::Key("data")
    }

    fn first_request(&self) -> PageRequest {
        PageRequest::new(format!("{}/v1/hackers/programs", self.base_url))
    }

    fn next_request(&self, _current: &PageRequest, response: &Value) -> Option<PageRequest> {
        // The next link already carries every query parameter
        pointer_str(response, "/links/next").map(PageRequest::new)
    }

    fn item_id(&self, record: &Value) -> Option<String> {
        pointer_str(record, "/attributes/handle")
    }

    fn detail_request(&self, item: &Item) -> PageRequest {
        PageRequest::new(format!(
            "{}/v1/hackers/programs/{}",
            self.base_url,
            item.id()
        ))
    }

    fn detail_field(&self) -> &str {
        "relationships"
    }
}

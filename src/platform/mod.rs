//! Platform adapters
//!
//! Every bug-bounty platform returns its listing in a slightly different
//! shape. The pagination and enrichment engine is written once against the
//! [`PlatformAdapter`] trait; each platform supplies:
//!
//! - the key holding the listing records (or a bare JSON array)
//! - the rule producing the next listing request
//! - the field identifying a program
//! - the detail endpoint for a program
//! - the detail sub-structure merged into the program

mod bugcrowd;
mod hackerone;
mod intigriti;
mod yeswehack;

pub use bugcrowd::Bugcrowd;
pub use hackerone::HackerOne;
pub use intigriti::Intigriti;
pub use yeswehack::YesWeHack;

use crate::collection::{Item, MergeOutcome};
use crate::crawler::ItemFetchError;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// An endpoint plus query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub endpoint: String,
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Sets a query parameter, replacing any previous value
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// Where a listing response keeps its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingContainer {
    /// Records live in an array under this top-level key
    Key(&'static str),

    /// The response body itself is the array
    BareList,
}

impl fmt::Display for ListingContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::BareList => write!(f, "<array>"),
        }
    }
}

/// Per-platform response shape
pub trait PlatformAdapter: Send + Sync {
    /// Platform name; also the storage namespace
    fn name(&self) -> &str;

    fn container(&self) -> ListingContainer;

    /// Request for the first listing page
    fn first_request(&self) -> PageRequest;

    /// Request for the page after `current`, or None when the listing ends
    fn next_request(&self, current: &PageRequest, response: &Value) -> Option<PageRequest>;

    /// Total page count, when the response exposes it
    fn total_pages(&self, _response: &Value) -> Option<u64> {
        None
    }

    fn item_id(&self, record: &Value) -> Option<String>;

    /// Whether a listing record belongs in the result set
    fn retain(&self, _record: &Value) -> bool {
        true
    }

    fn detail_request(&self, item: &Item) -> PageRequest;

    /// Field of the item that receives the detail data
    fn detail_field(&self) -> &str;

    /// Picks the sub-structure to merge out of a detail response
    fn extract_detail(&self, detail: &Value) -> Option<Value> {
        detail.get(self.detail_field()).cloned()
    }

    /// Returns the listing records, or None if the container is missing
    fn listing_items<'a>(&self, response: &'a Value) -> Option<&'a [Value]> {
        let list = match self.container() {
            ListingContainer::Key(key) => response.get(key)?,
            ListingContainer::BareList => response,
        };
        list.as_array().map(Vec::as_slice)
    }

    /// Merges a detail response into `item`
    fn merge_detail(&self, item: &mut Item, detail: &Value) -> Result<MergeOutcome, ItemFetchError> {
        let value = self
            .extract_detail(detail)
            .ok_or_else(|| ItemFetchError::MissingDetail {
                id: item.id().to_string(),
                field: self.detail_field().to_string(),
            })?;
        Ok(item.merge_field(self.detail_field(), value))
    }
}

/// Next request for listings paged with an incrementing page parameter
///
/// Stops once the known total is reached. Without a total the walk goes on
/// until a page comes back empty.
pub(crate) fn next_numbered_page(
    current: &PageRequest,
    param: &str,
    total_pages: Option<u64>,
) -> Option<PageRequest> {
    let page = current
        .param(param)
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1);
    if let Some(total) = total_pages {
        if page >= total {
            return None;
        }
    }
    let mut next = current.clone();
    next.set_param(param, (page + 1).to_string());
    Some(next)
}

/// Reads a string at a JSON pointer
pub(crate) fn pointer_str(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a page count at a JSON pointer, accepting numbers or numeric strings
pub(crate) fn pointer_count(value: &Value, pointer: &str) -> Option<u64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    HackerOne,
    Bugcrowd,
    YesWeHack,
    Intigriti,
}

impl Platform {
    pub fn all() -> [Platform; 4] {
        [
            Self::HackerOne,
            Self::Bugcrowd,
            Self::YesWeHack,
            Self::Intigriti,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HackerOne => "hackerone",
            Self::Bugcrowd => "bugcrowd",
            Self::YesWeHack => "yeswehack",
            Self::Intigriti => "intigriti",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::HackerOne => "https://api.hackerone.com",
            Self::Bugcrowd => "https://bugcrowd.com",
            Self::YesWeHack => "https://api.yeswehack.com",
            Self::Intigriti => "https://app.intigriti.com/api/core/public",
        }
    }

    /// Environment variables holding HTTP basic credentials, if required
    pub fn default_credential_env(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::HackerOne => Some(("HACKERONE_USERNAME", "HACKERONE_TOKEN")),
            _ => None,
        }
    }

    /// Builds the adapter for this platform rooted at `base_url`
    pub fn adapter(&self, base_url: &str) -> Box<dyn PlatformAdapter> {
        let base_url = base_url.trim_end_matches('/').to_string();
        match self {
            Self::HackerOne => Box::new(HackerOne::new(base_url)),
            Self::Bugcrowd => Box::new(Bugcrowd::new(base_url)),
            Self::YesWeHack => Box::new(YesWeHack::new(base_url)),
            Self::Intigriti => Box::new(Intigriti::new(base_url)),
        }
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|platform| platform.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPlatform(s.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

use crate::platform::PageRequest;
use crate::state::CrawlPhase;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Durable record of how far a platform crawl has progressed
///
/// A record holding only `last_page`, `total_pages` and `processed_item_ids`
/// still deserializes; every other field falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlProgress {
    /// Phase the crawl was in when this record was saved
    #[serde(default)]
    pub phase: CrawlPhase,

    /// Number of the last listing page fully written to storage (0 = none)
    #[serde(default)]
    pub last_page: u64,

    /// Total page count, if the platform exposes it
    #[serde(default)]
    pub total_pages: Option<u64>,

    /// Request for page `last_page + 1`
    #[serde(default)]
    pub next_request: Option<PageRequest>,

    /// Identifiers whose detail record has been merged
    #[serde(default)]
    pub processed_item_ids: BTreeSet<String>,

    /// When this record was last saved
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CrawlProgress {
    /// Creates an empty progress record
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the crawl to a new phase, rejecting illegal transitions
    pub fn advance(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Records a freshly stored listing page
    ///
    /// The phase becomes Enriching when the listing has no next request.
    pub fn record_page(
        &mut self,
        number: u64,
        total_pages: Option<u64>,
        next_request: Option<PageRequest>,
    ) -> Result<(), HarvestError> {
        let next_phase = if next_request.is_some() {
            CrawlPhase::Paginating
        } else {
            CrawlPhase::Enriching
        };
        self.advance(next_phase)?;
        self.last_page = number;
        if total_pages.is_some() {
            self.total_pages = total_pages;
        }
        self.next_request = next_request;
        Ok(())
    }

    /// Marks the listing as exhausted without recording a new page
    pub fn finish_listing(&mut self) -> Result<(), HarvestError> {
        self.advance(CrawlPhase::Enriching)?;
        self.next_request = None;
        Ok(())
    }

    /// Returns true if the detail record for `id` has been merged
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed_item_ids.contains(id)
    }

    /// Marks the detail record for `id` as merged
    ///
    /// Returns false if it was already marked.
    pub fn mark_processed(&mut self, id: impl Into<String>) -> bool {
        self.processed_item_ids.insert(id.into())
    }

    /// Returns true if nothing has been recorded yet
    pub fn is_fresh(&self) -> bool {
        self.phase == CrawlPhase::NotStarted
            && self.last_page == 0
            && self.processed_item_ids.is_empty()
    }
}

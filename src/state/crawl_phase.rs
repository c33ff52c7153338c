/// Crawl phase definitions for tracking per-platform crawl progress
///
/// This module defines the phases a platform crawl moves through and which
/// transitions between them are legal.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current phase of a platform crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// No listing page has been fetched yet
    #[default]
    NotStarted,

    /// Listing pages are being fetched; more pages remain
    Paginating,

    /// The listing is exhausted; detail records are being merged in
    Enriching,

    /// The final artifact has been written; cleanup may still be pending
    Finalized,
}

impl CrawlPhase {
    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Paginating and Enriching are re-entrant so a resumed crawl can stay in
    /// the phase it was interrupted in. NotStarted may jump straight to
    /// Enriching when the very first listing page is empty.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (self, next),
            (NotStarted, Paginating)
                | (NotStarted, Enriching)
                | (Paginating, Paginating)
                | (Paginating, Enriching)
                | (Enriching, Enriching)
                | (Enriching, Finalized)
                | (Finalized, Finalized)
        )
    }

    /// Returns true once the listing has been walked to the end
    pub fn is_listing_exhausted(&self) -> bool {
        matches!(self, Self::Enriching | Self::Finalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Paginating => "paginating",
            Self::Enriching => "enriching",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

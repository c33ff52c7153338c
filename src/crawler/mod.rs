//! Crawler module for listing pagination and detail enrichment
//!
//! This module contains the crawl engine, including:
//! - HTTP transport with retry logic
//! - The resumable listing paginator
//! - Per-program detail enrichment
//! - Fragment consolidation into the final artifact
//! - Concurrent per-platform coordination

mod coordinator;
mod enricher;
mod finalize;
mod paginator;
mod transport;

pub use coordinator::{
    build_crawl, run_crawl, run_platforms, select_platforms, CrawlOptions, CrawlOutcome,
    CrawlSettings, PlatformCrawl,
};
pub use enricher::{fetch_detail, EnrichmentReport, Enricher, ItemFetchError};
pub use finalize::{consolidate, finalize, rebuild_collection, FinalizeOutcome};
pub use paginator::Paginator;
pub use transport::{
    build_http_client, Credentials, HttpTransport, RetryPolicy, Transport, TransportError,
};

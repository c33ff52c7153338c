//! State module for tracking crawl progress
//!
//! This module provides the state kept for each platform crawl.
//!
//! # Components
//!
//! - `CrawlPhase`: Where a platform crawl is in its lifecycle (paginating, enriching, finalized)
//! - `CrawlProgress`: The durable checkpoint record a crawl resumes from

mod crawl_phase;
mod crawl_progress;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use crawl_progress::CrawlProgress;

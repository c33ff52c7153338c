//! Crawl status from stored records
//!
//! This module reads what a platform crawl has stored so far and renders
//! it for the `--stats` command. Nothing here writes to storage.

use crate::state::CrawlPhase;
use crate::storage::ProgressStore;
use crate::HarvestError;
use chrono::{DateTime, Utc};

/// Snapshot of one platform's stored crawl
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStatus {
    pub platform: String,

    /// Phase of the open crawl; NotStarted when none is stored
    pub phase: CrawlPhase,

    /// Last listing page stored
    pub last_page: u64,

    /// Total page count, if the platform exposes it
    pub total_pages: Option<u64>,

    /// Page fragments currently stored
    pub fragments: usize,

    /// Programs whose detail has been merged
    pub processed: usize,

    /// Number of programs in the final artifact, if one exists
    pub final_items: Option<usize>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl PlatformStatus {
    /// Returns true if the platform has a final artifact and no open crawl
    pub fn is_complete(&self) -> bool {
        self.final_items.is_some() && self.phase == CrawlPhase::NotStarted && self.fragments == 0
    }
}

/// Loads the status of the platform behind `store`
pub fn load_status(store: &ProgressStore) -> Result<PlatformStatus, HarvestError> {
    let progress = store.load()?;
    let fragments = store.page_numbers()?.len();
    let final_items = store.read_final()?.map(|records| records.len());

    Ok(PlatformStatus {
        platform: store.platform().to_string(),
        phase: progress.phase,
        last_page: progress.last_page,
        total_pages: progress.total_pages,
        fragments,
        processed: progress.processed_item_ids.len(),
        final_items,
        updated_at: progress.updated_at,
    })
}

/// Renders one status block
pub fn format_status(status: &PlatformStatus) -> String {
    let mut lines = vec![format!("{}:", status.platform)];

    if status.is_complete() {
        lines.push("  State: complete".to_string());
    } else if status.phase == CrawlPhase::NotStarted && status.fragments == 0 {
        lines.push("  State: not started".to_string());
    } else {
        lines.push(format!("  State: {}", status.phase));
        let pages = match status.total_pages {
            Some(total) => format!("{}/{}", status.last_page, total),
            None => status.last_page.to_string(),
        };
        lines.push(format!(
            "  Pages stored: {} ({} fragments)",
            pages, status.fragments
        ));
        lines.push(format!("  Programs enriched: {}", status.processed));
    }

    if let Some(items) = status.final_items {
        lines.push(format!("  Final artifact: {} programs", items));
    }
    if let Some(updated_at) = status.updated_at {
        lines.push(format!("  Last update: {}", updated_at.to_rfc3339()));
    }

    lines.join("\n")
}

/// Prints statuses to stdout
pub fn print_status(statuses: &[PlatformStatus]) {
    println!("=== Crawl Status ===\n");
    for status in statuses {
        println!("{}\n", format_status(status));
    }

    let complete = statuses.iter().filter(|s| s.is_complete()).count();
    println!("{} of {} platforms complete", complete, statuses.len());
}

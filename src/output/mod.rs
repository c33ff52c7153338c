//! Output module for reporting crawl state
//!
//! The crawl's real output is the per-platform JSON artifact written by the
//! finalizer. This module only reports on stored records.

pub mod stats;

pub use stats::{format_status, load_status, print_status, PlatformStatus};

use crate::config::Config;
use crate::platform::Platform;
use crate::storage::{open_store, ProgressStore};
use crate::HarvestError;

/// Loads the status of every configured platform
///
/// With no `[[platform]]` entries every supported platform is reported.
pub fn collect_status(config: &Config) -> Result<Vec<PlatformStatus>, HarvestError> {
    let platforms: Vec<Platform> = if config.platforms.is_empty() {
        Platform::all().to_vec()
    } else {
        config
            .platforms
            .iter()
            .map(|entry| entry.platform())
            .collect::<Result<_, _>>()?
    };

    let mut statuses = Vec::new();
    for platform in platforms {
        let store = ProgressStore::new(open_store(&config.output)?, platform.name());
        statuses.push(load_status(&store)?);
    }
    Ok(statuses)
}

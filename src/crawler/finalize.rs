//! Merging fragments into the final artifact
//!
//! Finalization runs in a fixed order so that a crash at any step can be
//! completed by a later run:
//!
//! 1. the consolidated collection is written as the final artifact
//! 2. progress is saved with phase Finalized
//! 3. page fragments and the working collection are deleted
//! 4. the progress record is deleted
//!
//! A run that finds a Finalized progress record only repeats steps 3 and 4.

use crate::collection::{Page, ResultCollection};
use crate::platform::PlatformAdapter;
use crate::state::CrawlPhase;
use crate::storage::ProgressStore;
use crate::HarvestError;
use serde_json::Value;

/// What a call to [`finalize`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The final artifact was written from `pages` fragments
    Completed { items: usize, pages: usize },

    /// The artifact already existed; only leftover records were removed
    AlreadyFinalized,
}

/// Merges page fragments, in order, into one deduplicated collection
///
/// Records from `enriched` replace their listing counterparts by identifier.
/// A fragment missing the platform's container is rejected.
pub fn consolidate(
    adapter: &dyn PlatformAdapter,
    pages: &[Page],
    enriched: Option<Vec<Value>>,
) -> Result<ResultCollection, HarvestError> {
    let mut collection = ResultCollection::new();
    for page in pages {
        let records = page
            .records(adapter)
            .ok_or_else(|| HarvestError::MalformedResponse {
                platform: adapter.name().to_string(),
                page: page.number,
                container: adapter.container().to_string(),
            })?;
        collection.extend_records(adapter, records);
    }

    if let Some(records) = enriched {
        let restored = collection.overlay(ResultCollection::from_records(adapter, &records));
        tracing::debug!(
            "{}: restored {} enriched programs",
            adapter.name(),
            restored
        );
    }

    Ok(collection)
}

/// Rebuilds the working collection from stored fragments up to `last_page`
pub fn rebuild_collection(
    adapter: &dyn PlatformAdapter,
    store: &ProgressStore,
    last_page: u64,
) -> Result<ResultCollection, HarvestError> {
    let mut pages = Vec::new();
    for number in store.page_numbers()? {
        if number > last_page {
            tracing::debug!(
                "{}: ignoring fragment {} past last recorded page {}",
                adapter.name(),
                number,
                last_page
            );
            continue;
        }
        if let Some(page) = store.read_page(number)? {
            pages.push(page);
        }
    }

    let enriched = store.load_collection()?;
    consolidate(adapter, &pages, enriched)
}

/// Writes the final artifact and removes every intermediate record
///
/// The listing must be exhausted (phase Enriching) or a previous
/// finalization must have been interrupted (phase Finalized). Calling it
/// on a platform whose artifact is written and whose records are gone
/// does nothing.
pub fn finalize(
    adapter: &dyn PlatformAdapter,
    store: &mut ProgressStore,
) -> Result<FinalizeOutcome, HarvestError> {
    let platform = adapter.name();
    if !store.has_progress()? && store.page_numbers()?.is_empty() && store.has_final()? {
        tracing::debug!("{}: already finalized", platform);
        return Ok(FinalizeOutcome::AlreadyFinalized);
    }

    let mut progress = store.load()?;
    match progress.phase {
        CrawlPhase::Finalized => {
            tracing::info!("{}: completing interrupted cleanup", platform);
            cleanup(store)?;
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        CrawlPhase::Enriching => {}
        phase => {
            return Err(HarvestError::InvalidTransition {
                from: phase,
                to: CrawlPhase::Finalized,
            });
        }
    }

    let collection = rebuild_collection(adapter, store, progress.last_page)?;
    let pages = store
        .page_numbers()?
        .into_iter()
        .filter(|&number| number <= progress.last_page)
        .count();

    store.write_final(&collection)?;
    progress.advance(CrawlPhase::Finalized)?;
    store.save(&mut progress)?;
    cleanup(store)?;

    tracing::info!(
        "{}: wrote {} programs from {} pages",
        platform,
        collection.len(),
        pages
    );

    Ok(FinalizeOutcome::Completed {
        items: collection.len(),
        pages,
    })
}

fn cleanup(store: &mut ProgressStore) -> Result<(), HarvestError> {
    for number in store.page_numbers()? {
        store.delete_page(number)?;
    }
    store.clear_collection()?;
    store.clear()?;
    Ok(())
}

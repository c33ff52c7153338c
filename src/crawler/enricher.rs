//! Detail enrichment
//!
//! Once the listing is exhausted every program is visited once more to fetch
//! its detail record. Each successful merge is checkpointed before the next
//! program is requested, so a resumed run only fetches what is still missing.

use crate::collection::ResultCollection;
use crate::crawler::{Transport, TransportError};
use crate::platform::{PageRequest, PlatformAdapter};
use crate::state::{CrawlPhase, CrawlProgress};
use crate::storage::ProgressStore;
use crate::HarvestError;
use serde_json::Value;
use thiserror::Error;

/// A single program whose detail could not be merged
///
/// These never abort the crawl; the program is left unprocessed and is
/// retried on the next run.
#[derive(Debug, Error)]
pub enum ItemFetchError {
    #[error("detail request for {id} failed: {source}")]
    Transport {
        id: String,
        #[source]
        source: TransportError,
    },

    #[error("detail response for {id} has no `{field}`")]
    MissingDetail { id: String, field: String },
}

impl ItemFetchError {
    pub fn id(&self) -> &str {
        match self {
            Self::Transport { id, .. } | Self::MissingDetail { id, .. } => id,
        }
    }
}

/// Summary of one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Programs fetched and merged during this pass
    pub fetched: usize,

    /// Programs already merged by an earlier run
    pub already_processed: usize,

    /// Identifiers whose detail fetch failed
    pub skipped: Vec<String>,
}

impl EnrichmentReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct Enricher<'a> {
    adapter: &'a dyn PlatformAdapter,
    transport: &'a dyn Transport,
    store: &'a mut ProgressStore,
    batch_size: usize,
}

impl<'a> Enricher<'a> {
    pub fn new(
        adapter: &'a dyn PlatformAdapter,
        transport: &'a dyn Transport,
        store: &'a mut ProgressStore,
        batch_size: usize,
    ) -> Self {
        Self {
            adapter,
            transport,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetches and merges the detail record of every unprocessed program
    ///
    /// Programs are visited in collection order. After each merge the
    /// working collection and then the progress record are saved. Storage
    /// failures abort the pass; per-program fetch failures are logged and
    /// reported in [`EnrichmentReport::skipped`].
    pub async fn enrich(
        &mut self,
        collection: &mut ResultCollection,
        progress: &mut CrawlProgress,
    ) -> Result<EnrichmentReport, HarvestError> {
        if progress.phase != CrawlPhase::Enriching {
            return Err(HarvestError::InvalidTransition {
                from: progress.phase,
                to: CrawlPhase::Enriching,
            });
        }

        let platform = self.adapter.name();
        let mut report = EnrichmentReport::default();
        let pending: Vec<(usize, String, PageRequest)> = collection
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                if progress.is_processed(item.id()) {
                    None
                } else {
                    Some((
                        position,
                        item.id().to_string(),
                        self.adapter.detail_request(item),
                    ))
                }
            })
            .collect();
        report.already_processed = collection.len() - pending.len();

        if pending.is_empty() {
            tracing::debug!("{}: every program already enriched", platform);
            return Ok(report);
        }
        tracing::info!(
            "{}: enriching {} programs ({} done earlier)",
            platform,
            pending.len(),
            report.already_processed
        );

        let total = pending.len();
        for (done, (position, id, request)) in pending.into_iter().enumerate() {
            let merged = match fetch_detail(self.transport, &id, &request).await {
                Ok(detail) => match collection.item_mut(position) {
                    Some(item) => self.adapter.merge_detail(item, &detail).map(|_| ()),
                    None => continue,
                },
                Err(e) => Err(e),
            };

            match merged {
                Ok(()) => {
                    progress.mark_processed(id);
                    self.store.save_collection(collection)?;
                    self.store.save(progress)?;
                    report.fetched += 1;
                }
                Err(e) => {
                    tracing::warn!("{}: skipping program: {}", platform, e);
                    report.skipped.push(e.id().to_string());
                }
            }

            if (done + 1) % self.batch_size == 0 || done + 1 == total {
                tracing::info!("{}: enriched {}/{} programs", platform, done + 1, total);
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                "{}: {} programs could not be enriched",
                platform,
                report.skipped.len()
            );
        }
        Ok(report)
    }
}

/// Fetches one detail record
pub async fn fetch_detail(
    transport: &dyn Transport,
    id: &str,
    request: &PageRequest,
) -> Result<Value, ItemFetchError> {
    tracing::debug!("Fetching detail for {}: {}", id, request);
    transport
        .fetch(request)
        .await
        .map_err(|source| ItemFetchError::Transport {
            id: id.to_string(),
            source,
        })
}

//! Resumable listing paginator
//!
//! The paginator is a pull-based cursor over a platform's listing. Every
//! call to [`Paginator::next_page`] issues at most one request, and a page
//! is handed to the caller only after:
//!
//! 1. its raw body is written as a page fragment, and
//! 2. the progress record pointing at the following page is saved.
//!
//! A crash at any point therefore replays at most the one in-flight page.

use crate::collection::Page;
use crate::crawler::Transport;
use crate::platform::{PageRequest, PlatformAdapter};
use crate::state::{CrawlPhase, CrawlProgress};
use crate::storage::ProgressStore;
use crate::HarvestError;
use futures::stream::{self, Stream};
use std::collections::HashSet;

pub struct Paginator<'a> {
    adapter: &'a dyn PlatformAdapter,
    transport: &'a dyn Transport,
    store: &'a mut ProgressStore,
    progress: CrawlProgress,
    pending: Option<PageRequest>,
    requested: HashSet<PageRequest>,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator positioned at the stored resume point
    ///
    /// Pages up to `last_page` are never requested again. A crawl whose
    /// listing is already exhausted yields nothing.
    pub fn resume(
        adapter: &'a dyn PlatformAdapter,
        transport: &'a dyn Transport,
        store: &'a mut ProgressStore,
    ) -> Result<Self, HarvestError> {
        let progress = store.load()?;

        let pending = match progress.phase {
            CrawlPhase::NotStarted if progress.last_page > 0 => {
                return Err(HarvestError::InvalidProgress {
                    platform: adapter.name().to_string(),
                    message: format!(
                        "{} pages recorded but no phase; rerun with --fresh",
                        progress.last_page
                    ),
                });
            }
            CrawlPhase::NotStarted => Some(adapter.first_request()),
            CrawlPhase::Paginating => {
                let next = progress.next_request.clone().ok_or_else(|| {
                    HarvestError::InvalidProgress {
                        platform: adapter.name().to_string(),
                        message: format!(
                            "paginating after page {} without a next request",
                            progress.last_page
                        ),
                    }
                })?;
                tracing::info!(
                    "Resuming {} listing at page {}",
                    adapter.name(),
                    progress.last_page + 1
                );
                Some(next)
            }
            CrawlPhase::Enriching | CrawlPhase::Finalized => None,
        };

        Ok(Self {
            adapter,
            transport,
            store,
            progress,
            pending,
            requested: HashSet::new(),
        })
    }

    /// Progress as of the last page handed out
    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    /// Fetches, stores and returns the next listing page
    ///
    /// Returns `Ok(None)` when the listing is exhausted. On error nothing
    /// has been written and the stored progress remains the resume point.
    pub async fn next_page(&mut self) -> Result<Option<Page>, HarvestError> {
        let Some(request) = self.pending.clone() else {
            return Ok(None);
        };
        let platform = self.adapter.name();
        let number = self.progress.last_page + 1;

        tracing::debug!("Fetching {} page {}: {}", platform, number, request);
        let transport = self.transport;
        let body = transport
            .fetch(&request)
            .await
            .map_err(|source| HarvestError::Transport {
                platform: platform.to_string(),
                source,
            })?;

        let record_count = match self.adapter.listing_items(&body) {
            Some(records) => records.len(),
            None => {
                return Err(HarvestError::MalformedResponse {
                    platform: platform.to_string(),
                    page: number,
                    container: self.adapter.container().to_string(),
                });
            }
        };

        if record_count == 0 {
            let mut progress = self.progress.clone();
            progress.finish_listing()?;
            self.store.save(&mut progress)?;
            self.progress = progress;
            self.pending = None;
            tracing::info!(
                "{} listing exhausted after {} pages",
                platform,
                self.progress.last_page
            );
            return Ok(None);
        }

        self.requested.insert(request.clone());
        let mut next = self.adapter.next_request(&request, &body);
        if let Some(link) = next.as_ref().filter(|link| self.requested.contains(*link)) {
            tracing::warn!(
                "{} page {} links back to an earlier page ({}), stopping",
                platform,
                number,
                link
            );
            next = None;
        }
        let total_pages = self.adapter.total_pages(&body);
        let page = Page::new(number, body);

        self.store.write_page(&page)?;

        let mut progress = self.progress.clone();
        progress.record_page(number, total_pages, next.clone())?;
        self.store.save(&mut progress)?;
        self.progress = progress;
        self.pending = next;

        match self.progress.total_pages {
            Some(total) => tracing::info!(
                "{}: stored page {}/{} ({} records)",
                platform,
                number,
                total,
                record_count
            ),
            None => tracing::info!(
                "{}: stored page {} ({} records)",
                platform,
                number,
                record_count
            ),
        }
        if self.pending.is_none() {
            tracing::info!("{} listing exhausted after {} pages", platform, number);
        }

        Ok(Some(page))
    }

    /// Turns the paginator into a stream of pages
    ///
    /// The stream ends after the last page or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page, HarvestError>> + 'a {
        stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok(page.map(|page| (page, paginator)))
        })
    }
}

//! Crawl coordination
//!
//! A [`PlatformCrawl`] drives one platform through its lifecycle:
//! pagination, enrichment and finalization, resuming from whatever phase
//! its stored progress records. [`run_crawl`] builds one per configured
//! platform and runs them concurrently; platforms share no state.

use crate::config::{Config, CrawlerConfig, PlatformEntry};
use crate::crawler::finalize::{finalize, rebuild_collection};
use crate::crawler::{Enricher, HttpTransport, Paginator, Transport};
use crate::platform::{Platform, PlatformAdapter};
use crate::state::CrawlPhase;
use crate::storage::{open_store, ProgressStore};
use crate::HarvestError;
use futures::TryStreamExt;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Per-crawl knobs taken from the `[crawler]` section
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    pub detail_batch_size: usize,
    pub finalize_partial: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            detail_batch_size: config.detail_batch_size,
            finalize_partial: config.finalize_partial,
        }
    }
}

/// How a platform crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// A final artifact already existed and nothing was left to do
    AlreadyCompleted,

    /// Some programs could not be enriched; progress is kept for the next run
    Incomplete {
        pages: u64,
        items: usize,
        skipped: Vec<String>,
    },

    /// The final artifact was written
    Finalized {
        pages: u64,
        items: usize,
        skipped: Vec<String>,
    },
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCompleted => write!(f, "already completed"),
            Self::Incomplete {
                pages,
                items,
                skipped,
            } => write!(
                f,
                "incomplete: {} programs from {} pages, {} awaiting detail",
                items,
                pages,
                skipped.len()
            ),
            Self::Finalized {
                pages,
                items,
                skipped,
            } if skipped.is_empty() => {
                write!(f, "finalized: {} programs from {} pages", items, pages)
            }
            Self::Finalized {
                pages,
                items,
                skipped,
            } => write!(
                f,
                "finalized: {} programs from {} pages ({} without detail)",
                items,
                pages,
                skipped.len()
            ),
        }
    }
}

/// One platform's crawl with everything it owns
pub struct PlatformCrawl {
    adapter: Box<dyn PlatformAdapter>,
    transport: Arc<dyn Transport>,
    store: ProgressStore,
    settings: CrawlSettings,
}

impl PlatformCrawl {
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        transport: Arc<dyn Transport>,
        store: ProgressStore,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            adapter,
            transport,
            store,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Discards every stored record of this platform, final artifact included
    pub fn reset(&mut self) -> Result<(), HarvestError> {
        tracing::info!("{}: discarding stored records", self.name());
        self.store.reset()?;
        Ok(())
    }

    /// Runs the crawl from its stored resume point to completion
    ///
    /// Listing errors abort the run and leave progress at the last stored
    /// page. Failed detail fetches leave the crawl Incomplete unless
    /// partial finalization is enabled.
    pub async fn run(&mut self) -> Result<CrawlOutcome, HarvestError> {
        let adapter = self.adapter.as_ref();
        let transport = self.transport.as_ref();
        let store = &mut self.store;
        let platform = adapter.name();

        if !store.has_progress()? && store.page_numbers()?.is_empty() && store.has_final()? {
            tracing::info!(
                "{}: final artifact already present, skipping (use --fresh to recrawl)",
                platform
            );
            return Ok(CrawlOutcome::AlreadyCompleted);
        }

        let phase = store.load()?.phase;
        if phase == CrawlPhase::Finalized {
            finalize(adapter, store)?;
            return Ok(CrawlOutcome::AlreadyCompleted);
        }

        tracing::info!("{}: crawling via {}", platform, store.describe());

        if !phase.is_listing_exhausted() {
            let pages = Paginator::resume(adapter, transport, store)?.into_stream();
            futures::pin_mut!(pages);
            while pages.try_next().await?.is_some() {}
        }

        let mut progress = store.load()?;
        let pages = progress.last_page;
        let mut collection = rebuild_collection(adapter, store, pages)?;
        tracing::info!(
            "{}: {} programs across {} pages",
            platform,
            collection.len(),
            pages
        );

        let report = Enricher::new(adapter, transport, store, self.settings.detail_batch_size)
            .enrich(&mut collection, &mut progress)
            .await?;

        if !report.is_complete() && !self.settings.finalize_partial {
            tracing::warn!(
                "{}: leaving crawl open, {} programs still need detail",
                platform,
                report.skipped.len()
            );
            return Ok(CrawlOutcome::Incomplete {
                pages,
                items: collection.len(),
                skipped: report.skipped,
            });
        }

        finalize(adapter, store)?;
        Ok(CrawlOutcome::Finalized {
            pages,
            items: collection.len(),
            skipped: report.skipped,
        })
    }
}

/// Which platforms to crawl and how
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Discard all stored records before crawling
    pub fresh: bool,

    /// Restrict the run to these platforms; empty means every enabled one
    pub platforms: Vec<Platform>,
}

/// Selects the platform entries a run covers
///
/// Platforms named in `options` but absent from the config run with
/// their defaults. A platform named twice is selected once.
pub fn select_platforms(
    config: &Config,
    options: &CrawlOptions,
) -> Result<Vec<PlatformEntry>, HarvestError> {
    if options.platforms.is_empty() {
        return Ok(config.enabled_platforms().cloned().collect());
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for platform in &options.platforms {
        if !seen.insert(*platform) {
            continue;
        }
        let mut configured = None;
        for entry in &config.platforms {
            if entry.platform()? == *platform {
                configured = Some(entry.clone());
            }
        }
        entries.push(configured.unwrap_or_else(|| PlatformEntry {
            name: platform.name().to_string(),
            enabled: true,
            base_url: None,
            username_env: None,
            token_env: None,
        }));
    }
    Ok(entries)
}

/// Builds the crawl for one platform entry
pub fn build_crawl(config: &Config, entry: &PlatformEntry) -> Result<PlatformCrawl, HarvestError> {
    let platform = entry.platform()?;
    let adapter = platform.adapter(&entry.base_url()?);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(config, entry)?);
    let store = ProgressStore::new(open_store(&config.output)?, platform.name());

    Ok(PlatformCrawl::new(
        adapter,
        transport,
        store,
        CrawlSettings::from(&config.crawler),
    ))
}

/// Runs every selected platform concurrently
///
/// With `fresh`, stored records are discarded only once every selected
/// platform has been built, so a bad entry leaves all records in place.
pub async fn run_crawl(
    config: &Config,
    options: &CrawlOptions,
) -> Result<Vec<(String, CrawlOutcome)>, HarvestError> {
    let mut crawls = Vec::new();
    for entry in select_platforms(config, options)? {
        crawls.push(build_crawl(config, &entry)?);
    }

    if options.fresh {
        for crawl in &mut crawls {
            crawl.reset()?;
        }
    }
    run_platforms(crawls).await
}

/// Runs the given crawls on separate tasks and collects their outcomes
///
/// Every crawl runs to its own end. If any failed, the error lists each
/// failing platform.
pub async fn run_platforms(
    crawls: Vec<PlatformCrawl>,
) -> Result<Vec<(String, CrawlOutcome)>, HarvestError> {
    if crawls.is_empty() {
        tracing::warn!("No platforms selected");
        return Ok(Vec::new());
    }

    let mut tasks = JoinSet::new();
    for mut crawl in crawls {
        tasks.spawn(async move {
            let name = crawl.name().to_string();
            let result = crawl.run().await;
            (name, result)
        });
    }

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(outcome))) => {
                tracing::info!("{}: {}", name, outcome);
                outcomes.push((name, outcome));
            }
            Ok((name, Err(e))) => {
                tracing::error!("{}: crawl failed: {}", name, e);
                failures.push(format!("{}: {}", name, e));
            }
            Err(e) => {
                tracing::error!("Crawl task aborted: {}", e);
                failures.push(e.to_string());
            }
        }
    }

    if !failures.is_empty() {
        return Err(HarvestError::Task(failures.join("; ")));
    }
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(outcomes)
}

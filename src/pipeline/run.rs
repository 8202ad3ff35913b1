// src/pipeline/run.rs

//! One site's harvest, from page discovery to reindex.
//!
//! ```text
//! Idle → DiscoveringPages → FetchingPage(1..=N) → Aggregating
//!      → Diffing → Archiving → Reindexing → Done
//! ```
//!
//! Any failure moves the run to `Aborted`. A run that extracts zero records
//! stops after `Aggregating` without touching the archive or the index.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, RunResult, SiteCapability};
use crate::pipeline::index::{IndexSyncer, SyncReport};
use crate::pipeline::snapshot::{ArchiveOutcome, ArchiveStore, Snapshot};
use crate::search::SearchBackend;
use crate::services::{
    Alert, AlertSink, IdentityCounter, PageCounter, PageFetcher, PageSource, RecordExtractor,
    RetryPolicy,
};
use crate::storage::{ArchiveBackend, ArchiveKeys};

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    DiscoveringPages,
    FetchingPage(u32),
    Aggregating,
    Diffing,
    Archiving,
    Reindexing,
    Done,
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::FetchingPage(page) => write!(f, "FetchingPage({page})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Shared backends a pipeline talks to.
#[derive(Clone)]
pub struct Components {
    pub source: Arc<dyn PageSource>,
    pub archive: Arc<dyn ArchiveBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Per-run knobs derived from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub index: String,
    pub archive_prefix: String,
    pub page_cap: Option<u32>,
    pub retry: RetryPolicy,
    pub max_concurrent: usize,
    /// Date for history keys; today when unset
    pub run_date: Option<NaiveDate>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index: config.search.index.clone(),
            archive_prefix: config.archive.prefix.clone(),
            page_cap: config.crawler.page_cap,
            retry: RetryPolicy::new(Duration::from_millis(config.crawler.retry_unit_ms)),
            max_concurrent: config.crawler.max_concurrent.max(1),
            run_date: None,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub site: String,
    pub pages: u32,
    pub records: usize,
    /// `None` when nothing was extracted and archiving was skipped
    pub archive: Option<ArchiveOutcome>,
    /// `None` when nothing was extracted and reindexing was skipped
    pub sync: Option<SyncReport>,
    pub elapsed: Duration,
}

/// Records every state a run passes through.
#[derive(Debug, Default)]
struct Tracker {
    states: Vec<PipelineState>,
}

impl Tracker {
    fn enter(&mut self, site: &str, state: PipelineState) {
        log::debug!("[{}] {}", site, state);
        self.states.push(state);
    }
}

/// Harvests one site.
pub struct Pipeline {
    site: Arc<dyn SiteCapability>,
    source: Arc<dyn PageSource>,
    alerts: Arc<dyn AlertSink>,
    counter: PageCounter,
    fetcher: PageFetcher,
    archive: ArchiveStore,
    syncer: IndexSyncer,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        site: Arc<dyn SiteCapability>,
        components: &Components,
        settings: PipelineSettings,
    ) -> Self {
        let keys = ArchiveKeys::new(&settings.archive_prefix, site.name());
        Self {
            counter: PageCounter::new(settings.page_cap),
            fetcher: PageFetcher::new(components.source.clone(), settings.retry),
            archive: ArchiveStore::new(components.archive.clone(), keys),
            syncer: IndexSyncer::new(components.search.clone(), components.alerts.clone()),
            source: components.source.clone(),
            alerts: components.alerts.clone(),
            site,
            settings,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_traced().await.1
    }

    /// Run and also return every state visited, ending in `Done` or
    /// `Aborted`.
    pub async fn run_traced(&self) -> (Vec<PipelineState>, Result<RunSummary>) {
        let mut tracker = Tracker::default();
        tracker.enter(self.site.name(), PipelineState::Idle);
        let start = Instant::now();

        let result = self.execute(&mut tracker, start).await;
        match &result {
            Ok(summary) => {
                tracker.enter(self.site.name(), PipelineState::Done);
                log::info!(
                    "[{}] Completed: {} records from {} pages in {:.1?}",
                    summary.site,
                    summary.records,
                    summary.pages,
                    summary.elapsed
                );
            }
            Err(error) => {
                tracker.enter(self.site.name(), PipelineState::Aborted);
                log::error!("[{}] Aborted: {}", self.site.name(), error);
                if !reported_at_source(error) {
                    self.alerts.report(&Alert::from_error(error)).await;
                }
            }
        }
        (tracker.states, result)
    }

    async fn execute(&self, tracker: &mut Tracker, start: Instant) -> Result<RunSummary> {
        let site = self.site.as_ref();
        let name = site.name();

        tracker.enter(name, PipelineState::DiscoveringPages);
        let pages = self.counter.count(site, self.source.as_ref()).await?;
        log::info!("[{}] {} pages to fetch", name, pages);

        let mut ids = IdentityCounter::new();
        let mut result = RunResult::new();
        let fetcher = &self.fetcher;

        // Bodies come back in page order, so ids stay monotonic whatever
        // the concurrency. Pages still in flight when one fails are dropped
        // unreported.
        let mut bodies = stream::iter(1..=pages)
            .map(|page| {
                let request = site.page_request(page);
                async move {
                    let body = fetcher.fetch(&request).await;
                    (request, body)
                }
            })
            .buffered(self.settings.max_concurrent.max(1));

        while let Some((request, body)) = bodies.next().await {
            tracker.enter(name, PipelineState::FetchingPage(request.page));
            let body = body?;
            let records = RecordExtractor::extract(site, &body, &request.label(), &mut ids)?;
            log::debug!(
                "[{}] {} records on page {}/{}",
                name,
                records.len(),
                request.page,
                pages
            );
            result.extend_page(records, &self.settings.index, site.doc_type());
        }

        tracker.enter(name, PipelineState::Aggregating);
        if result.is_empty() {
            log::warn!("[{}] No records extracted; skipping archive and reindex", name);
            return Ok(RunSummary {
                site: name.to_string(),
                pages,
                records: 0,
                archive: None,
                sync: None,
                elapsed: start.elapsed(),
            });
        }

        tracker.enter(name, PipelineState::Diffing);
        let snapshot = Snapshot::from_records(&result.records)?;
        let previous = self.archive.previous_fingerprint().await?;
        let changed = snapshot.differs_from(previous.as_deref());

        tracker.enter(name, PipelineState::Archiving);
        let archive = if changed {
            self.archive.store(&snapshot, self.run_date()).await?
        } else {
            log::info!("[{}] Archive: data scraped does not differ from archived data", name);
            ArchiveOutcome::Unchanged {
                fingerprint: snapshot.fingerprint.clone(),
            }
        };

        tracker.enter(name, PipelineState::Reindexing);
        let sync = self
            .syncer
            .replace(&self.settings.index, site.doc_type(), &result.documents)
            .await?;

        Ok(RunSummary {
            site: name.to_string(),
            pages,
            records: result.len(),
            archive: Some(archive),
            sync: Some(sync),
            elapsed: start.elapsed(),
        })
    }

    fn run_date(&self) -> NaiveDate {
        self.settings
            .run_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Index failures are alerted by the syncer itself.
fn reported_at_source(error: &AppError) -> bool {
    matches!(error, AppError::Sync { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::FetchingPage(3).to_string(), "FetchingPage(3)");
        assert_eq!(PipelineState::Diffing.to_string(), "Diffing");
    }

    #[test]
    fn test_only_sync_errors_are_self_reported() {
        let exhausted = AppError::FetchExhausted {
            target: "p".into(),
            attempts: 5,
            message: "boom".into(),
        };
        assert!(!reported_at_source(&exhausted));
        assert!(reported_at_source(&AppError::sync("bulk", "boom")));
        assert!(!reported_at_source(&AppError::discovery("p", "boom")));
        assert!(!reported_at_source(&AppError::extraction("p", "boom")));
        assert!(!reported_at_source(&AppError::archive("k", "boom")));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.crawler.page_cap = Some(4);
        config.crawler.retry_unit_ms = 10;
        config.crawler.max_concurrent = 0;

        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.page_cap, Some(4));
        assert_eq!(settings.retry.delay_after(1), Duration::from_millis(50));
        assert_eq!(settings.max_concurrent, 1);
        assert_eq!(settings.index, config.search.index);
    }
}

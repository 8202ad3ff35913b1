//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crawler::error::{AppError, Result};
use crawler::models::{PageRequest, SiteConfig, TableSite};
use crawler::pipeline::{Components, PipelineSettings};
use crawler::search::SearchBackend;
use crawler::services::{Alert, AlertSink, RetryPolicy};
use crawler::storage::ArchiveBackend;

pub const URL_TEMPLATE: &str = "http://register.test/list?page={}";

pub fn site_config(fields: &[&str]) -> SiteConfig {
    SiteConfig {
        name: "doctors".into(),
        url_template: URL_TEMPLATE.into(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        doc_type: "doctors".into(),
        table_selector: "table.zebra tbody".into(),
        row_selector: "tr".into(),
        cell_selector: "td".into(),
        pagination_selector: "div#tnt_pagination".into(),
        index_only: false,
    }
}

pub fn site(fields: &[&str]) -> Arc<TableSite> {
    Arc::new(TableSite::from_config(&site_config(fields)).unwrap())
}

/// A listing page with a pagination indicator and the given rows.
pub fn listing_page(pagination: &str, rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells.iter().map(|c| format!("<td> {c} </td>")).collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    format!(
        r#"<html><body>
        <table class="zebra"><thead><tr><th>Name</th></tr></thead><tbody>{rows}</tbody></table>
        <div id="tnt_pagination"><span>Viewing</span> {pagination}</div>
        </body></html>"#
    )
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        index: "healthtools".into(),
        archive_prefix: "data/".into(),
        page_cap: None,
        retry: RetryPolicy::new(Duration::from_millis(1)),
        max_concurrent: 1,
        run_date: NaiveDate::from_ymd_opt(2026, 10, 15),
    }
}

/// Serves canned bodies by page number and counts calls per page.
#[derive(Default)]
pub struct FakePages {
    bodies: HashMap<u32, String>,
    calls: Mutex<Vec<u32>>,
}

impl FakePages {
    pub fn new(bodies: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            bodies: bodies.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl crawler::services::PageSource for FakePages {
    async fn fetch(&self, request: &PageRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.page);
        self.bodies
            .get(&request.page)
            .cloned()
            .ok_or_else(|| AppError::fetch(request.label(), "HTTP status 503"))
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerts {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn report(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

/// One call made against [`RecordingSearch`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCall {
    Exists(String),
    Create(String),
    DeleteByQuery(String, String),
    Bulk(Vec<Value>, bool),
}

#[derive(Default)]
pub struct RecordingSearch {
    pub exists: bool,
    pub fail_bulk: bool,
    calls: Mutex<Vec<SearchCall>>,
}

impl RecordingSearch {
    pub fn new(exists: bool, fail_bulk: bool) -> Self {
        Self {
            exists,
            fail_bulk,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bulk_entries(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .find_map(|call| match call {
                SearchCall::Bulk(entries, _) => Some(entries),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn record(&self, call: SearchCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SearchBackend for RecordingSearch {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.record(SearchCall::Exists(index.into()));
        Ok(self.exists)
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        self.record(SearchCall::Create(index.into()));
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, doc_type: &str, _query: &Value) -> Result<u64> {
        self.record(SearchCall::DeleteByQuery(index.into(), doc_type.into()));
        Ok(0)
    }

    async fn bulk(&self, entries: &[Value], refresh: bool) -> Result<()> {
        self.record(SearchCall::Bulk(entries.to_vec(), refresh));
        if self.fail_bulk {
            return Err(AppError::sync("bulk", "HTTP 500 Internal Server Error"));
        }
        Ok(())
    }
}

/// Wraps an archive backend and counts writes.
pub struct CountingArchive<A> {
    pub inner: A,
    writes: AtomicUsize,
    copies: AtomicUsize,
}

impl<A> CountingArchive<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            copies: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<A: ArchiveBackend> ArchiveBackend for CountingArchive<A> {
    async fn latest_fingerprint(&self, key: &str) -> Result<Option<String>> {
        self.inner.latest_fingerprint(key).await
    }

    async fn write_latest(&self, key: &str, payload: &[u8], fingerprint: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_latest(key, payload, fingerprint).await
    }

    async fn copy_to_history(&self, from: &str, to: &str) -> Result<()> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        self.inner.copy_to_history(from, to).await
    }

    fn location(&self, key: &str) -> String {
        self.inner.location(key)
    }
}

pub struct Harness<A> {
    pub pages: Arc<FakePages>,
    pub archive: Arc<CountingArchive<A>>,
    pub search: Arc<RecordingSearch>,
    pub alerts: Arc<RecordingAlerts>,
}

impl<A: ArchiveBackend + 'static> Harness<A> {
    pub fn new(pages: FakePages, archive: A) -> Self {
        Self {
            pages: Arc::new(pages),
            archive: Arc::new(CountingArchive::new(archive)),
            search: Arc::new(RecordingSearch::default()),
            alerts: Arc::new(RecordingAlerts::default()),
        }
    }

    pub fn components(&self) -> Components {
        Components {
            source: self.pages.clone(),
            archive: self.archive.clone(),
            search: self.search.clone(),
            alerts: self.alerts.clone(),
        }
    }
}

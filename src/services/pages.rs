// src/services/pages.rs

//! Page retrieval and page-count discovery.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{PageRequest, SiteCapability};

static PAGE_COUNT: OnceLock<Regex> = OnceLock::new();

fn page_count_pattern() -> &'static Regex {
    PAGE_COUNT.get_or_init(|| Regex::new(r"(\d+) pages?").expect("static regex"))
}

/// Something that can return the raw body of one listing page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<String>;
}

/// Fetches pages over HTTP. Only understands URL-paginated requests.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, request: &PageRequest) -> Result<String> {
        let url = request.url.as_deref().ok_or_else(|| {
            AppError::fetch(
                request.label(),
                "index-only pages need a page source that resolves page numbers",
            )
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP status {status}")));
        }

        response.text().await.map_err(|e| AppError::fetch(url, e))
    }
}

/// Read "<N> page(s)" out of a pagination indicator.
pub fn parse_page_count(text: &str) -> Option<u32> {
    page_count_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Discovers how many listing pages a site has.
#[derive(Debug, Clone, Default)]
pub struct PageCounter {
    page_cap: Option<u32>,
}

impl PageCounter {
    /// `page_cap` clamps the discovered count in limited-batch runs.
    pub fn new(page_cap: Option<u32>) -> Self {
        Self { page_cap }
    }

    /// Fetch the first page once and read its pagination indicator.
    pub async fn count(&self, site: &dyn SiteCapability, source: &dyn PageSource) -> Result<u32> {
        let request = site.page_request(1);
        let label = request.label();

        let body = source
            .fetch(&request)
            .await
            .map_err(|e| AppError::discovery(&label, e.detail()))?;

        let text = site
            .pagination_text(&body)
            .ok_or_else(|| AppError::discovery(&label, "pagination indicator not found"))?;

        let count = parse_page_count(&text).ok_or_else(|| {
            AppError::discovery(
                &label,
                format!("no page count in pagination text '{}'", text.trim()),
            )
        })?;

        if count == 0 {
            return Err(AppError::discovery(&label, "No pages found."));
        }

        Ok(self.clamp(count))
    }

    fn clamp(&self, count: u32) -> u32 {
        match self.page_cap {
            Some(cap) if count > cap => {
                log::info!("Limiting {} discovered pages to {}", count, cap);
                cap
            }
            _ => count,
        }
    }
}

//! Register sites and how their listing pages are read.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::SiteConfig;

/// One page to fetch.
///
/// Sites paginated by URL carry the rendered URL; index-only sites carry just
/// the page number and rely on a [`PageSource`](crate::services::PageSource)
/// that knows how to resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub url: Option<String>,
}

impl PageRequest {
    /// What to call this page in logs, errors and alerts.
    pub fn label(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("page {}", self.page),
        }
    }
}

/// Capability every harvestable site provides.
pub trait SiteCapability: Send + Sync {
    /// Short identifier used in logs and archive keys.
    fn name(&self) -> &str;

    /// Listing URL with a `{}` placeholder for the page number.
    fn url_template(&self) -> &str;

    /// Data fields in column order, without the trailing `id`.
    fn field_schema(&self) -> &[String];

    /// Search document type for this site's records.
    fn doc_type(&self) -> &str;

    fn is_index_only_pagination(&self) -> bool {
        false
    }

    /// Text of the pagination indicator, if the page has one.
    fn pagination_text(&self, body: &str) -> Option<String>;

    /// Cell texts of every listing row, trimmed, in document order.
    ///
    /// Fails with [`AppError::Extraction`] when the listing table is missing.
    fn extract_rows(&self, body: &str) -> Result<Vec<Vec<String>>>;

    fn page_request(&self, page: u32) -> PageRequest {
        let url = if self.is_index_only_pagination() {
            None
        } else {
            Some(self.url_template().replacen("{}", &page.to_string(), 1))
        };
        PageRequest { page, url }
    }
}

/// A site whose listing is an HTML table, read with configured selectors.
#[derive(Debug, Clone)]
pub struct TableSite {
    config: SiteConfig,
    table: Selector,
    row: Selector,
    cell: Selector,
    pagination: Selector,
}

impl TableSite {
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            table: parse_selector(&config.table_selector)?,
            row: parse_selector(&config.row_selector)?,
            cell: parse_selector(&config.cell_selector)?,
            pagination: parse_selector(&config.pagination_selector)?,
            config: config.clone(),
        })
    }
}

impl SiteCapability for TableSite {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn url_template(&self) -> &str {
        &self.config.url_template
    }

    fn field_schema(&self) -> &[String] {
        &self.config.fields
    }

    fn doc_type(&self) -> &str {
        &self.config.doc_type
    }

    fn is_index_only_pagination(&self) -> bool {
        self.config.index_only
    }

    fn pagination_text(&self, body: &str) -> Option<String> {
        let document = Html::parse_document(body);
        document
            .select(&self.pagination)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    fn extract_rows(&self, body: &str) -> Result<Vec<Vec<String>>> {
        let document = Html::parse_document(body);
        let table = document.select(&self.table).next().ok_or_else(|| {
            AppError::extraction(
                self.name(),
                format!("listing table '{}' not found", self.config.table_selector),
            )
        })?;

        let rows = table
            .select(&self.row)
            .map(|row| {
                row.select(&self.cell)
                    .map(|cell| cell.text().collect::<String>().trim().to_string())
                    .collect()
            })
            .collect();
        Ok(rows)
    }
}

/// Build a [`TableSite`] for every configured site.
pub fn build_sites(configs: &[SiteConfig]) -> Result<Vec<TableSite>> {
    configs.iter().map(TableSite::from_config).collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

//! Application configuration structures.
//!
//! Tuning values come from an optional TOML file; deployment-specific values
//! (credentials region, bucket, search host, webhook) are overlaid from the
//! environment by [`Config::apply_env`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Snapshot archive destination
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Search engine connection
    #[serde(default)]
    pub search: SearchConfig,

    /// Alert webhook
    #[serde(default)]
    pub alert: AlertConfig,

    /// AWS settings shared by the S3 backend
    #[serde(default)]
    pub aws: AwsConfig,

    /// Register sites to harvest, in run order
    #[serde(default = "defaults::sites")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Empty values count as unset, so `S3_BUCKET=` selects the local
    /// archive the same way an absent variable does.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = get("AWS_REGION").or_else(|| get("MORPH_AWS_REGION")) {
            self.aws.region = Some(region);
        }
        if let Some(bucket) = get("S3_BUCKET") {
            self.archive.bucket = Some(bucket);
        }
        if let Some(prefix) = get("ARCHIVE_PREFIX") {
            self.archive.prefix = prefix;
        }
        if let Some(dir) = get("DATA_DIR") {
            self.archive.data_dir = dir;
        }
        if let Some(host) = get("ES_HOST") {
            self.search.host = host;
        }
        if let Some(port) = get("ES_PORT") {
            self.search.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("ES_PORT is not a port: {port}")))?;
        }
        if let Some(index) = get("ES_INDEX") {
            self.search.index = index;
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.alert.webhook_url = Some(url);
        }
        if let Some(pages) = get("SMALL_BATCH_PAGES") {
            self.crawler.small_batch_pages = parse_pages("SMALL_BATCH_PAGES", &pages)?;
        }
        if let Some(cap) = get("PAGE_CAP") {
            self.crawler.page_cap = Some(parse_pages("PAGE_CAP", &cap)?);
        }
        Ok(())
    }

    /// Switch to limited-batch mode, capping every site at `small_batch_pages`.
    pub fn enable_small_batch(&mut self) {
        log::info!(
            "Using small batch ({} pages per site)",
            self.crawler.small_batch_pages
        );
        self.crawler.page_cap = Some(self.crawler.small_batch_pages);
    }

    /// Find a configured site by name.
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::config("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.small_batch_pages == 0 {
            return Err(AppError::config("crawler.small_batch_pages must be > 0"));
        }
        if self.crawler.page_cap == Some(0) {
            return Err(AppError::config("crawler.page_cap must be > 0"));
        }
        if self.search.index.trim().is_empty() {
            return Err(AppError::config("search.index is empty"));
        }
        url::Url::parse(&self.search.base_url())?;
        if let Some(url) = &self.alert.webhook_url {
            url::Url::parse(url)?;
        }
        if self.sites.is_empty() {
            return Err(AppError::config("No sites defined"));
        }

        let mut names = HashSet::new();
        for site in &self.sites {
            if !names.insert(site.name.as_str()) {
                return Err(AppError::config(format!("Duplicate site name: {}", site.name)));
            }
            site.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            archive: ArchiveConfig::default(),
            search: SearchConfig::default(),
            alert: AlertConfig::default(),
            aws: AwsConfig::default(),
            sites: defaults::sites(),
        }
    }
}

fn parse_pages(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::config(format!("{key} is not a page count: {value}")))
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pages fetched in parallel (1 = strictly sequential)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Length of one backoff unit in milliseconds
    #[serde(default = "defaults::retry_unit")]
    pub retry_unit_ms: u64,

    /// Page cap applied by `--small-batch`
    #[serde(default = "defaults::small_batch_pages")]
    pub small_batch_pages: u32,

    /// Active page cap; `None` harvests every discovered page
    #[serde(default)]
    pub page_cap: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            retry_unit_ms: defaults::retry_unit(),
            small_batch_pages: defaults::small_batch_pages(),
            page_cap: None,
        }
    }
}

/// Where snapshots are archived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// S3 bucket; when unset the local directory is used instead
    #[serde(default)]
    pub bucket: Option<String>,

    /// Key prefix shared by latest and historical objects
    #[serde(default = "defaults::archive_prefix")]
    pub prefix: String,

    /// Root directory of the local fallback
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: defaults::archive_prefix(),
            data_dir: defaults::data_dir(),
        }
    }
}

/// Search engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "defaults::es_host")]
    pub host: String,

    #[serde(default = "defaults::es_port")]
    pub port: u16,

    /// Index shared by all sites; sites are told apart by document type
    #[serde(default = "defaults::es_index")]
    pub index: String,
}

impl SearchConfig {
    /// Base URL of the search engine, e.g. `http://localhost:9200`.
    ///
    /// A port already present in `host` wins over `port`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let (scheme, authority) = host.split_once("://").unwrap_or(("http", host));
        if has_port(authority) {
            format!("{scheme}://{authority}")
        } else {
            format!("{scheme}://{authority}:{}", self.port)
        }
    }
}

fn has_port(authority: &str) -> bool {
    authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: defaults::es_host(),
            port: defaults::es_port(),
            index: defaults::es_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertConfig {
    /// Slack-compatible webhook; alerts only go to the log when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
}

/// One register site and the selectors used to read its listing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short identifier, also used in archive keys
    pub name: String,

    /// Listing URL with a `{}` placeholder for the page number
    pub url_template: String,

    /// Data fields in column order; `id` is appended automatically
    pub fields: Vec<String>,

    /// Search document type
    pub doc_type: String,

    /// Selector for the listing table body
    #[serde(default = "defaults::table_selector")]
    pub table_selector: String,

    /// Selector for rows inside the table body
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Selector for cells inside a row
    #[serde(default = "defaults::cell_selector")]
    pub cell_selector: String,

    /// Selector for the element holding "<N> pages"
    #[serde(default = "defaults::pagination_selector")]
    pub pagination_selector: String,

    /// Pages are addressed by number rather than by URL
    #[serde(default)]
    pub index_only: bool,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::config("Site with empty name"));
        }
        if !self.index_only && !self.url_template.contains("{}") {
            return Err(AppError::config(format!(
                "Site {}: url_template has no {{}} page placeholder",
                self.name
            )));
        }
        if !self.index_only {
            url::Url::parse(&self.url_template.replacen("{}", "1", 1))?;
        }
        if self.fields.is_empty() {
            return Err(AppError::config(format!("Site {}: no fields", self.name)));
        }
        if self.fields.iter().any(|f| f == crate::models::ID_FIELD) {
            return Err(AppError::config(format!(
                "Site {}: field name '{}' is reserved",
                self.name,
                crate::models::ID_FIELD
            )));
        }
        if self.doc_type.trim().is_empty() {
            return Err(AppError::config(format!("Site {}: empty doc_type", self.name)));
        }
        Ok(())
    }
}

mod defaults {
    use super::SiteConfig;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; register-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        1
    }
    pub fn retry_unit() -> u64 {
        1000
    }
    pub fn small_batch_pages() -> u32 {
        5
    }

    // Archive defaults
    pub fn archive_prefix() -> String {
        "data/".into()
    }
    pub fn data_dir() -> String {
        "storage".into()
    }

    // Search defaults
    pub fn es_host() -> String {
        "localhost".into()
    }
    pub fn es_port() -> u16 {
        9200
    }
    pub fn es_index() -> String {
        "healthtools".into()
    }

    // Selector defaults
    pub fn table_selector() -> String {
        "table.zebra tbody".into()
    }
    pub fn row_selector() -> String {
        "tr".into()
    }
    pub fn cell_selector() -> String {
        "td".into()
    }
    pub fn pagination_selector() -> String {
        "div#tnt_pagination".into()
    }

    fn site(name: &str, url_template: &str, doc_type: &str, fields: &[&str]) -> SiteConfig {
        SiteConfig {
            name: name.into(),
            url_template: url_template.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            doc_type: doc_type.into(),
            table_selector: table_selector(),
            row_selector: row_selector(),
            cell_selector: cell_selector(),
            pagination_selector: pagination_selector(),
            index_only: false,
        }
    }

    pub fn sites() -> Vec<SiteConfig> {
        vec![
            site(
                "doctors",
                "http://medicalboard.co.ke/online-services/retention/?currpage={}",
                "doctors",
                &[
                    "name",
                    "reg_date",
                    "reg_no",
                    "postal_address",
                    "qualifications",
                    "speciality",
                    "sub_speciality",
                ],
            ),
            site(
                "foreign_doctors",
                "http://medicalboard.co.ke/online-services/foreign-doctors-license-register/?currpage={}",
                "foreign-doctors",
                &[
                    "name",
                    "reg_no",
                    "postal_address",
                    "qualifications",
                    "facility",
                    "practice_type",
                ],
            ),
            site(
                "clinical_officers",
                "http://clinicalofficerscouncil.org/online-services/retention/?currpage={}",
                "clinical-officers",
                &["name", "reg_date", "reg_no", "address", "qualifications"],
            ),
        ]
    }
}

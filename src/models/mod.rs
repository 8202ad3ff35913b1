// src/models/mod.rs

//! Domain models for the crawler.

mod config;
mod record;
mod site;

// Re-export all public types
pub use config::{
    AlertConfig, ArchiveConfig, AwsConfig, Config, CrawlerConfig, SearchConfig, SiteConfig,
};
pub use record::{IndexDocument, IndexMeta, Record, RunResult};
pub use site::{PageRequest, SiteCapability, TableSite, build_sites};

/// Name of the identity field appended to every record.
pub const ID_FIELD: &str = "id";

//! Service layer for the crawler.
//!
//! - Page-count discovery and page sources (`PageCounter`, `PageSource`)
//! - Retried page fetching (`PageFetcher`)
//! - Row-to-record extraction (`RecordExtractor`)
//! - Alert delivery (`AlertSink`)

pub mod alert;
mod extract;
mod fetcher;
mod pages;

pub use alert::{Alert, AlertSink, ConsoleAlertSink, Severity, WebhookAlertSink, alert_sink_from_config};
pub use extract::{IdentityCounter, RecordExtractor};
pub use fetcher::{PageFetcher, RetryPolicy};
pub use pages::{HttpPageSource, PageCounter, PageSource, parse_page_count};

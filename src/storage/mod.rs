//! Storage backends for archived snapshots.
//!
//! Both backends keep one "latest" payload per site plus dated copies:
//!
//! ```text
//! {prefix}
//! └── doctors/
//!     ├── data.json                 # latest snapshot
//!     └── archive/
//!         ├── data-20261001.json    # historical copies, one per changed run
//!         └── data-20261015.json
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::Config;

// Re-export for convenience
pub use local::LocalArchive;
#[cfg(feature = "s3")]
pub use s3::S3Archive;

/// A place snapshots can be archived to.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    /// Fingerprint of the payload stored at `key`, or `None` if there is
    /// nothing there (or nothing comparable).
    async fn latest_fingerprint(&self, key: &str) -> Result<Option<String>>;

    /// Replace the payload at `key`.
    async fn write_latest(&self, key: &str, payload: &[u8], fingerprint: &str) -> Result<()>;

    /// Duplicate the payload at `from` to `to`.
    async fn copy_to_history(&self, from: &str, to: &str) -> Result<()>;

    /// Human-readable location of `key`, for logs.
    fn location(&self, key: &str) -> String;
}

/// Hex SHA-256 of a payload.
pub fn fingerprint(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Storage keys for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveKeys {
    base: String,
}

impl ArchiveKeys {
    pub fn new(prefix: &str, site: &str) -> Self {
        Self {
            base: format!("{}{}/", prefix, site),
        }
    }

    /// Key of the latest snapshot.
    pub fn latest(&self) -> String {
        format!("{}data.json", self.base)
    }

    /// Key of the historical copy for `date`.
    pub fn history(&self, date: NaiveDate) -> String {
        format!("{}archive/data-{}.json", self.base, date.format("%Y%m%d"))
    }
}

/// Choose the archive backend: S3 when a bucket is configured, otherwise
/// the local data directory.
pub async fn archive_backend_from_config(config: &Config) -> Result<Arc<dyn ArchiveBackend>> {
    match &config.archive.bucket {
        #[cfg(feature = "s3")]
        Some(bucket) => {
            let archive = S3Archive::from_config(bucket, config.aws.region.clone()).await;
            log::info!("Archiving to s3://{}", bucket);
            Ok(Arc::new(archive))
        }
        #[cfg(not(feature = "s3"))]
        Some(bucket) => Err(crate::error::AppError::config(format!(
            "S3 bucket '{bucket}' configured but built without the `s3` feature"
        ))),
        None => {
            log::info!(
                "No archive bucket configured; archiving under {}",
                config.archive.data_dir
            );
            Ok(Arc::new(LocalArchive::new(&config.archive.data_dir)))
        }
    }
}

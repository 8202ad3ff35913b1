//! Snapshot fingerprinting and change-gated archiving.
//!
//! A run's records are serialized to one canonical JSON payload. The payload
//! is only archived when its fingerprint differs from the one already stored,
//! so re-running against unchanged upstream data writes nothing.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::Record;
use crate::storage::{ArchiveBackend, ArchiveKeys, fingerprint};

/// Serialized record set plus its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub payload: Vec<u8>,
    pub fingerprint: String,
    pub record_count: usize,
}

impl Snapshot {
    pub fn from_records(records: &[Record]) -> Result<Self> {
        let payload = serde_json::to_vec(records)?;
        Ok(Self {
            fingerprint: fingerprint(&payload),
            payload,
            record_count: records.len(),
        })
    }

    /// Whether this snapshot differs from a previously stored fingerprint.
    pub fn differs_from(&self, previous: Option<&str>) -> bool {
        previous != Some(self.fingerprint.as_str())
    }
}

/// What archiving did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Same fingerprint as the stored snapshot; nothing written
    Unchanged { fingerprint: String },
    /// New latest snapshot plus a dated copy
    Written {
        fingerprint: String,
        latest_key: String,
        history_key: String,
    },
}

impl ArchiveOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ArchiveOutcome::Written { .. })
    }
}

/// Archives one site's snapshots through an [`ArchiveBackend`].
pub struct ArchiveStore {
    backend: Arc<dyn ArchiveBackend>,
    keys: ArchiveKeys,
}

impl ArchiveStore {
    pub fn new(backend: Arc<dyn ArchiveBackend>, keys: ArchiveKeys) -> Self {
        Self { backend, keys }
    }

    /// Fingerprint of the currently archived snapshot.
    pub async fn previous_fingerprint(&self) -> Result<Option<String>> {
        self.backend.latest_fingerprint(&self.keys.latest()).await
    }

    /// Write `snapshot` as latest and copy it under the dated history key.
    pub async fn store(&self, snapshot: &Snapshot, date: NaiveDate) -> Result<ArchiveOutcome> {
        let latest_key = self.keys.latest();
        let history_key = self.keys.history(date);

        self.backend
            .write_latest(&latest_key, &snapshot.payload, &snapshot.fingerprint)
            .await?;
        self.backend
            .copy_to_history(&latest_key, &history_key)
            .await?;

        log::info!(
            "Archive: data has been updated ({} records at {})",
            snapshot.record_count,
            self.backend.location(&latest_key)
        );

        Ok(ArchiveOutcome::Written {
            fingerprint: snapshot.fingerprint.clone(),
            latest_key,
            history_key,
        })
    }
}

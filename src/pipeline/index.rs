//! Full replace of a site's documents in the search index.
//!
//! The replace is not transactional: between the delete and the bulk insert
//! the site has no documents in the index. Nothing is rolled back on failure.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::IndexDocument;
use crate::search::SearchBackend;
use crate::services::{Alert, AlertSink};

/// Counts from one replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub created_index: bool,
    pub deleted: u64,
    pub indexed: usize,
}

/// Replaces index contents: ensure index, delete all, bulk insert.
pub struct IndexSyncer {
    backend: Arc<dyn SearchBackend>,
    alerts: Arc<dyn AlertSink>,
}

impl IndexSyncer {
    pub fn new(backend: Arc<dyn SearchBackend>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { backend, alerts }
    }

    /// Alternating directive/document entries, two per document.
    pub fn bulk_body(documents: &[IndexDocument]) -> Result<Vec<Value>> {
        let mut entries = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            entries.push(doc.meta.to_directive());
            entries.push(serde_json::to_value(&doc.record)?);
        }
        Ok(entries)
    }

    /// Replace everything of `doc_type` in `index` with `documents`.
    ///
    /// Failures are reported to the alert sink before being returned.
    pub async fn replace(
        &self,
        index: &str,
        doc_type: &str,
        documents: &[IndexDocument],
    ) -> Result<SyncReport> {
        match self.try_replace(index, doc_type, documents).await {
            Ok(report) => Ok(report),
            Err(error) => {
                let error = with_target(error, index, doc_type);
                self.alerts.report(&Alert::from_error(&error)).await;
                Err(error)
            }
        }
    }

    async fn try_replace(
        &self,
        index: &str,
        doc_type: &str,
        documents: &[IndexDocument],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        if !self.backend.index_exists(index).await? {
            self.backend.create_index(index).await?;
            report.created_index = true;
        }

        let match_all = json!({ "query": { "match_all": {} } });
        report.deleted = self
            .backend
            .delete_by_query(index, doc_type, &match_all)
            .await?;
        log::info!(
            "Elasticsearch: deleted {} {} documents from {}",
            report.deleted,
            doc_type,
            index
        );

        let entries =
            Self::bulk_body(documents).map_err(|e| AppError::sync("bulk", e.detail()))?;
        self.backend.bulk(&entries, true).await?;
        report.indexed = documents.len();
        log::info!(
            "Elasticsearch: indexed {} {} documents into {}",
            report.indexed,
            doc_type,
            index
        );

        Ok(report)
    }
}

/// The index is shared between sites, so a failed step names its target.
fn with_target(error: AppError, index: &str, doc_type: &str) -> AppError {
    match error {
        AppError::Sync { step, message } => AppError::Sync {
            step: format!("{step} {index}/{doc_type}"),
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::Record;

    fn documents(n: u64) -> Vec<IndexDocument> {
        (1..=n)
            .map(|id| {
                let record = Record {
                    id,
                    fields: BTreeMap::from([("name".to_string(), format!("person {id}"))]),
                };
                IndexDocument::new("healthtools", "clinical-officers", record)
            })
            .collect()
    }

    #[test]
    fn test_bulk_body_alternates_directive_and_document() {
        let body = IndexSyncer::bulk_body(&documents(3)).unwrap();

        assert_eq!(body.len(), 6);
        for (pair, id) in body.chunks(2).zip(1u64..) {
            assert_eq!(pair[0]["index"]["_id"], id);
            assert_eq!(pair[0]["index"]["_type"], "clinical-officers");
            assert_eq!(pair[1]["id"], id);
        }
    }

    #[test]
    fn test_sync_errors_name_index_and_doc_type() {
        let error = with_target(
            AppError::sync("delete_by_query", "HTTP 503"),
            "healthtools",
            "doctors",
        );
        assert_eq!(
            error.source_hint(),
            Some("delete_by_query healthtools/doctors")
        );
        assert_eq!(error.detail(), "HTTP 503");

        let other = with_target(AppError::config("bad"), "healthtools", "doctors");
        assert!(matches!(other, AppError::Config(_)));
    }

    #[test]
    fn test_bulk_body_empty() {
        assert!(IndexSyncer::bulk_body(&[]).unwrap().is_empty());
    }
}

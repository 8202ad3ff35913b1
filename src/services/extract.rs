// src/services/extract.rs

//! Turns listing rows into records with run-wide identities.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::{Record, SiteCapability};

/// Hands out record ids for one run, starting at 1.
///
/// Owned by the orchestrator and passed down by `&mut`, so ids stay strictly
/// increasing in page-then-row order across the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCounter {
    next: u64,
}

impl IdentityCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for IdentityCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts records from a page body using a site's schema.
pub struct RecordExtractor;

impl RecordExtractor {
    /// Parse `body` and turn each listing row into a [`Record`].
    ///
    /// `page` names the page in errors. Nothing is taken from `counter`
    /// unless the whole page parses.
    pub fn extract(
        site: &dyn SiteCapability,
        body: &str,
        page: &str,
        counter: &mut IdentityCounter,
    ) -> Result<Vec<Record>> {
        let rows = site.extract_rows(body).map_err(|e| match e {
            AppError::Extraction { message, .. } => AppError::extraction(page, message),
            other => other,
        })?;
        Ok(Self::build_records(site.field_schema(), rows, counter))
    }

    /// Zip cells with field names and append the identity.
    ///
    /// Cells past the schema are dropped; rows without cells are skipped.
    pub fn build_records(
        fields: &[String],
        rows: Vec<Vec<String>>,
        counter: &mut IdentityCounter,
    ) -> Vec<Record> {
        rows.into_iter()
            .filter(|cells| !cells.is_empty())
            .map(|cells| {
                let fields: BTreeMap<String, String> = fields
                    .iter()
                    .cloned()
                    .zip(cells.into_iter().map(|c| c.trim().to_string()))
                    .collect();
                Record {
                    id: counter.next_id(),
                    fields,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<String> {
        vec!["name".into(), "license_no".into()]
    }

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ids_continue_across_pages() {
        let mut counter = IdentityCounter::new();
        let mut ids = Vec::new();

        for _page in 0..3 {
            let page = rows(&[&["a", "1"], &["b", "2"], &["c", "3"], &["d", "4"]]);
            let records = RecordExtractor::build_records(&schema(), page, &mut counter);
            ids.extend(records.iter().map(|r| r.id));
        }

        assert_eq!(ids, (1..=12).collect::<Vec<u64>>());
        assert_eq!(counter.issued(), 12);
    }

    #[test]
    fn test_extra_cells_are_dropped() {
        let mut counter = IdentityCounter::new();
        let records = RecordExtractor::build_records(
            &schema(),
            rows(&[&[" Jane Doe ", "A123", "Nairobi", "2019"]]),
            &mut counter,
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), Some("Jane Doe"));
        assert_eq!(records[0].get("license_no"), Some("A123"));
        assert_eq!(records[0].fields.len(), 2);
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn test_short_rows_keep_available_cells() {
        let mut counter = IdentityCounter::new();
        let records =
            RecordExtractor::build_records(&schema(), rows(&[&["Only Name"]]), &mut counter);
        assert_eq!(records[0].get("name"), Some("Only Name"));
        assert_eq!(records[0].get("license_no"), None);
    }

    #[test]
    fn test_empty_rows_take_no_id() {
        let mut counter = IdentityCounter::new();
        let records = RecordExtractor::build_records(
            &schema(),
            rows(&[&[], &["Jane", "A1"], &[], &["John", "B2"]]),
            &mut counter,
        );
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}

//! Register records and the search documents built from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One normalized listing row.
///
/// Serializes flat: `{"id": 1, "name": "...", "reg_no": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Run-scoped identity, assigned in page-then-row order from 1
    pub id: u64,

    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Bulk metadata directive for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    pub index: String,
    pub doc_type: String,
    pub id: u64,
}

impl IndexMeta {
    /// `{"index": {"_index": ..., "_type": ..., "_id": ...}}`
    pub fn to_directive(&self) -> Value {
        json!({
            "index": {
                "_index": self.index,
                "_type": self.doc_type,
                "_id": self.id,
            }
        })
    }
}

/// A record paired with the directive that places it in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub meta: IndexMeta,
    pub record: Record,
}

impl IndexDocument {
    pub fn new(index: &str, doc_type: &str, record: Record) -> Self {
        Self {
            meta: IndexMeta {
                index: index.to_string(),
                doc_type: doc_type.to_string(),
                id: record.id,
            },
            record,
        }
    }
}

/// Everything one pipeline run produced.
///
/// Filled page by page and consumed once at the end of the run.
#[derive(Debug, Default)]
pub struct RunResult {
    pub records: Vec<Record>,
    pub documents: Vec<IndexDocument>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page's records and their index documents, in order.
    pub fn extend_page(&mut self, records: Vec<Record>, index: &str, doc_type: &str) {
        self.documents.extend(
            records
                .iter()
                .cloned()
                .map(|record| IndexDocument::new(index, doc_type, record)),
        );
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Search engine access.

pub mod elasticsearch;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use elasticsearch::ElasticsearchClient;

/// The index operations a full replace needs.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str) -> Result<()>;

    /// Delete every document of `doc_type` matching `query`; returns how
    /// many were deleted.
    async fn delete_by_query(&self, index: &str, doc_type: &str, query: &Value) -> Result<u64>;

    /// Submit alternating directive/document entries.
    async fn bulk(&self, entries: &[Value], refresh: bool) -> Result<()>;
}

//! Elasticsearch over its REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::search::SearchBackend;

#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
}

impl ElasticsearchClient {
    /// `base_url` like `http://localhost:9200`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send_json(&self, step: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| AppError::sync(step, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::sync(step, e))?;

        if !status.is_success() {
            return Err(AppError::sync(step, format!("HTTP {status}: {body}")));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| AppError::sync(step, e))
    }
}

/// NDJSON body for the bulk endpoint; must end with a newline.
pub fn to_ndjson(entries: &[Value]) -> String {
    let mut body = String::new();
    for entry in entries {
        body.push_str(&entry.to_string());
        body.push('\n');
    }
    body
}

/// First item-level failure reason in a bulk response, if any.
fn first_bulk_error(response: &Value) -> Option<String> {
    if !response["errors"].as_bool().unwrap_or(false) {
        return None;
    }
    let reason = response["items"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item.as_object()?.values().next())
        .find_map(|action| {
            let error = action.get("error")?;
            Some(match error["reason"].as_str() {
                Some(reason) => format!("id {}: {}", action["_id"], reason),
                None => error.to_string(),
            })
        });
    Some(reason.unwrap_or_else(|| "bulk request reported errors".to_string()))
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .client
            .head(self.url(index))
            .send()
            .await
            .map_err(|e| AppError::sync("index_exists", e))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::sync("index_exists", format!("HTTP {status}"))),
        }
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        self.send_json("create_index", self.client.put(self.url(index)))
            .await?;
        log::info!("Elasticsearch: index {} created", index);
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, doc_type: &str, query: &Value) -> Result<u64> {
        let path = format!("{}/{}/_delete_by_query", index, doc_type);
        let response = self
            .send_json(
                "delete_by_query",
                self.client.post(self.url(&path)).json(query),
            )
            .await?;
        Ok(response["deleted"].as_u64().unwrap_or(0))
    }

    async fn bulk(&self, entries: &[Value], refresh: bool) -> Result<()> {
        let path = if refresh { "_bulk?refresh=true" } else { "_bulk" };
        let request = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(to_ndjson(entries));

        let response = self.send_json("bulk", request).await?;
        match first_bulk_error(&response) {
            Some(reason) => Err(AppError::sync("bulk", reason)),
            None => Ok(()),
        }
    }
}

// src/error.rs

//! Unified error handling for the crawler.
//!
//! The first five variants are the pipeline's failure taxonomy; each carries
//! the context an alert needs (component, source, message) so nothing has to
//! be recovered from a formatted string later.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Pagination indicator missing, unparseable, or first page unreachable
    #[error("Discovery error for {target}: {message}")]
    Discovery { target: String, message: String },

    /// Page fetch kept failing after every retry
    #[error("Fetch failed for {target} after {attempts} attempts: {message}")]
    FetchExhausted {
        target: String,
        attempts: u32,
        message: String,
    },

    /// Listing table missing or malformed
    #[error("Extraction error for {target}: {message}")]
    Extraction { target: String, message: String },

    /// Search index operation failed
    #[error("Search index error during {step}: {message}")]
    Sync { step: String, message: String },

    /// Archive read/write failed
    #[error("Archive error for {key}: {message}")]
    Archive { key: String, message: String },

    /// Single page fetch failed (retried by the fetcher)
    #[error("Fetch error for {target}: {message}")]
    Fetch { target: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more sites of a multi-site run failed
    #[error("{} of {total} sites failed: {}", .failed.len(), .failed.join(", "))]
    SitesFailed { failed: Vec<String>, total: usize },
}

impl AppError {
    /// Create a discovery error.
    pub fn discovery(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Discovery {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a single-attempt fetch error.
    pub fn fetch(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error.
    pub fn extraction(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a search index error for the named step.
    pub fn sync(step: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sync {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Create an archive error for the given storage key.
    pub fn archive(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Archive {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Component the error originated from, as shown in alerts.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "PageCounter",
            Self::FetchExhausted { .. } | Self::Fetch { .. } | Self::Http(_) => "PageFetcher",
            Self::Extraction { .. } | Self::Selector { .. } => "RecordExtractor",
            Self::Sync { .. } => "IndexSyncer",
            Self::Archive { .. } | Self::Io(_) => "ArchiveStore",
            Self::Json(_)
            | Self::Toml(_)
            | Self::Url(_)
            | Self::Config(_)
            | Self::SitesFailed { .. } => "Pipeline",
        }
    }

    /// URL, storage key, or index step the error is about, if known.
    pub fn source_hint(&self) -> Option<&str> {
        match self {
            Self::Discovery { target, .. }
            | Self::FetchExhausted { target, .. }
            | Self::Fetch { target, .. }
            | Self::Extraction { target, .. } => Some(target.as_str()),
            Self::Sync { step, .. } => Some(step.as_str()),
            Self::Archive { key, .. } => Some(key.as_str()),
            Self::Selector { selector, .. } => Some(selector.as_str()),
            _ => None,
        }
    }

    /// Underlying message without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Discovery { message, .. }
            | Self::FetchExhausted { message, .. }
            | Self::Fetch { message, .. }
            | Self::Extraction { message, .. }
            | Self::Sync { message, .. }
            | Self::Archive { message, .. }
            | Self::Selector { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_names() {
        assert_eq!(AppError::discovery("u", "m").component(), "PageCounter");
        assert_eq!(AppError::sync("bulk", "m").component(), "IndexSyncer");
        assert_eq!(AppError::archive("k", "m").component(), "ArchiveStore");
    }

    #[test]
    fn test_source_and_detail() {
        let err = AppError::archive("data/data.json", "access denied");
        assert_eq!(err.source_hint(), Some("data/data.json"));
        assert_eq!(err.detail(), "access denied");
        assert_eq!(
            err.to_string(),
            "Archive error for data/data.json: access denied"
        );
    }
}

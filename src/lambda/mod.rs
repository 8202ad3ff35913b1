// src/lambda/mod.rs

//! AWS Lambda handler for the crawler.
//!
//! Each invocation:
//! 1. Builds configuration from defaults plus the environment
//! 2. Harvests every configured site (or the one named in the payload)
//! 3. Reports per-site outcomes in the response body

use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::{self, ArchiveOutcome, RunSummary};

/// Lambda invocation payload. Scheduled triggers send `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct HarvestRequest {
    /// Only harvest this site
    #[serde(default)]
    pub site: Option<String>,

    /// Cap every site at `small_batch_pages`
    #[serde(default)]
    pub small_batch: bool,
}

/// Outcome of one site within an invocation.
#[derive(Debug, Serialize)]
pub struct SiteReport {
    pub site: String,
    pub success: bool,
    pub records: usize,
    pub archived: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteReport {
    fn from_result(site: String, result: &Result<RunSummary>) -> Self {
        match result {
            Ok(summary) => Self {
                site,
                success: true,
                records: summary.records,
                archived: matches!(summary.archive, Some(ArchiveOutcome::Written { .. })),
                error: None,
            },
            Err(e) => Self {
                site,
                success: false,
                records: 0,
                archived: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct HarvestResponse {
    pub success: bool,
    pub sites: Vec<SiteReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
///
/// Failures are returned in the response body; the invocation itself
/// always succeeds.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<HarvestRequest>,
) -> std::result::Result<HarvestResponse, LambdaError> {
    let start = Instant::now();
    let (request, _context) = event.into_parts();

    info!(
        "Starting harvest: site={:?}, small_batch={}",
        request.site, request.small_batch
    );

    let mut response = match harvest(&request).await {
        Ok(sites) => HarvestResponse {
            success: sites.iter().all(|s| s.success),
            sites,
            ..Default::default()
        },
        Err(e) => {
            error!("Harvest setup failed: {}", e);
            HarvestResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    response.execution_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "Harvest finished: success={}, {} sites in {}ms",
        response.success,
        response.sites.len(),
        response.execution_time_ms
    );
    Ok(response)
}

async fn harvest(request: &HarvestRequest) -> Result<Vec<SiteReport>> {
    let mut config = Config::default();
    config.apply_env()?;
    if request.small_batch {
        config.enable_small_batch();
    }
    config.validate()?;

    let results = pipeline::run_all(&config, request.site.as_deref()).await?;
    Ok(results
        .into_iter()
        .map(|(site, result)| SiteReport::from_result(site, &result))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_empty_payload_harvests_everything() {
        let request: HarvestRequest = serde_json::from_str("{}").unwrap();
        assert!(request.site.is_none());
        assert!(!request.small_batch);
    }

    #[test]
    fn test_site_report_from_results() {
        let summary = RunSummary {
            site: "doctors".into(),
            pages: 1,
            records: 3,
            archive: Some(ArchiveOutcome::Unchanged {
                fingerprint: "abc".into(),
            }),
            sync: None,
            elapsed: Duration::from_secs(1),
        };
        let ok = SiteReport::from_result("doctors".into(), &Ok(summary));
        assert!(ok.success);
        assert_eq!(ok.records, 3);
        assert!(!ok.archived);

        let failed = SiteReport::from_result(
            "doctors".into(),
            &Err(AppError::discovery("page 1", "No pages found.")),
        );
        assert!(!failed.success);
        assert!(failed.error.unwrap().contains("No pages found."));
    }
}

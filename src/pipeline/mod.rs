// src/pipeline/mod.rs

//! Pipeline entry points.
//!
//! - `Pipeline`: harvest one site end to end
//! - `run_all`: harvest every configured site (or one named site)
//! - `run_sites`: harvest several sites, each independently
//! - `build_components`: wire HTTP, archive, search and alert backends from config

pub mod index;
pub mod run;
pub mod snapshot;

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, SiteCapability, TableSite, build_sites};
use crate::search::ElasticsearchClient;
use crate::services::{HttpPageSource, alert_sink_from_config};
use crate::storage::archive_backend_from_config;
use crate::utils::http::create_async_client;

pub use index::{IndexSyncer, SyncReport};
pub use run::{Components, Pipeline, PipelineSettings, PipelineState, RunSummary};
pub use snapshot::{ArchiveOutcome, ArchiveStore, Snapshot};

/// Build the production backends described by `config`.
pub async fn build_components(config: &Config) -> Result<Components> {
    let client = create_async_client(&config.crawler)?;

    Ok(Components {
        source: Arc::new(HttpPageSource::new(client.clone())),
        archive: archive_backend_from_config(config).await?,
        search: Arc::new(ElasticsearchClient::new(
            client.clone(),
            config.search.base_url(),
        )),
        alerts: alert_sink_from_config(&config.alert, client),
    })
}

/// Configured sites to run: all of them, or only `only`.
pub fn select_sites(config: &Config, only: Option<&str>) -> Result<Vec<Arc<dyn SiteCapability>>> {
    let sites = match only {
        Some(name) => {
            let site = config
                .site(name)
                .ok_or_else(|| AppError::config(format!("Unknown site '{name}'")))?;
            vec![TableSite::from_config(site)?]
        }
        None => build_sites(&config.sites)?,
    };
    Ok(sites
        .into_iter()
        .map(|site| Arc::new(site) as Arc<dyn SiteCapability>)
        .collect())
}

/// Build production backends from `config` and harvest the selected sites.
pub async fn run_all(
    config: &Config,
    only: Option<&str>,
) -> Result<Vec<(String, Result<RunSummary>)>> {
    let sites = select_sites(config, only)?;
    let components = build_components(config).await?;
    let settings = PipelineSettings::from_config(config);
    Ok(run_sites(sites, &components, &settings).await)
}

/// Run every site in order. A failing site does not stop the others.
///
/// Returns one result per site, in input order.
pub async fn run_sites(
    sites: Vec<Arc<dyn SiteCapability>>,
    components: &Components,
    settings: &PipelineSettings,
) -> Vec<(String, Result<RunSummary>)> {
    let mut results = Vec::with_capacity(sites.len());
    for site in sites {
        let name = site.name().to_string();
        log::info!("[{}] Starting harvest", name);
        let pipeline = Pipeline::new(site, components, settings.clone());
        results.push((name, pipeline.run().await));
    }
    results
}

/// Collapse per-site results into one, naming every failed site.
pub fn overall_result(results: &[(String, Result<RunSummary>)]) -> Result<()> {
    let failed: Vec<String> = results
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(name, _)| name.clone())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::SitesFailed {
            failed,
            total: results.len(),
        })
    }
}

//! Register Crawler CLI
//!
//! Local execution entry point. For AWS Lambda, use `crawler-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crawler::{
    error::Result,
    models::{Config, build_sites},
    pipeline::{self, ArchiveOutcome},
};

/// Regulator register crawler
#[derive(Parser, Debug)]
#[command(
    name = "crawler",
    version,
    about = "Harvests regulator registers into an archive and a search index"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest configured sites: discover, fetch, archive, reindex
    Run {
        /// Only harvest this site
        #[arg(long)]
        site: Option<String>,

        /// Cap every site at `crawler.small_batch_pages` pages
        #[arg(long)]
        small_batch: bool,
    },

    /// List configured sites
    Sites,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env()?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { site, small_batch } => {
            if small_batch {
                config.enable_small_batch();
            }
            config.validate()?;

            let results = pipeline::run_all(&config, site.as_deref()).await?;
            for (name, result) in &results {
                match result {
                    Ok(summary) => {
                        let archive = match &summary.archive {
                            Some(ArchiveOutcome::Written { latest_key, .. }) => {
                                format!("archived to {latest_key}")
                            }
                            Some(ArchiveOutcome::Unchanged { .. }) => "unchanged".to_string(),
                            None => "skipped".to_string(),
                        };
                        log::info!(
                            "✓ {}: {} records from {} pages ({}) in {:.1?}",
                            name,
                            summary.records,
                            summary.pages,
                            archive,
                            summary.elapsed
                        );
                    }
                    Err(e) => log::error!("✗ {}: {}", name, e),
                }
            }
            pipeline::overall_result(&results)?;
        }

        Command::Sites => {
            for site in &config.sites {
                log::info!(
                    "{} (doc_type={}): {}",
                    site.name,
                    site.doc_type,
                    site.url_template
                );
                log::info!("  fields: {}", site.fields.join(", "));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            let sites = build_sites(&config.sites)?;
            log::info!("✓ Config OK ({} sites, selectors parse)", sites.len());
        }
    }

    Ok(())
}

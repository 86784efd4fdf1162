use anyhow::Context;
use blobsync::{read_config, run_all, PipelineContext};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "blobsync.json";

/// Blobsync - copy objects missing from the destination store, per category
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "BLOBSYNC_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Only run these categories (comma-separated). Runs all when omitted.
    #[arg(long, env = "BLOBSYNC_CATEGORIES", value_delimiter = ',')]
    categories: Vec<String>,

    /// Reconcile and log the work list without transferring anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every category completed without failures
async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = read_config(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let categories: Vec<String> = args
        .categories
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    config.select_categories(&categories);

    if config.categories.is_empty() {
        anyhow::bail!("None of the requested categories are configured: {}", categories.join(", "));
    }

    if args.dry_run {
        config.dry_run = true;
    }

    info!(
        "Reconciling {} -> {} for {} categories (cutoff {})",
        config.source.root.display(),
        config.destination.root.display(),
        config.categories.len(),
        config.cutoff_date
    );

    let ctx = Arc::new(PipelineContext::from_config(&config));
    let results = run_all(ctx, config.categories).await;

    let mut all_ok = true;
    for (category, result) in results {
        match result {
            Ok(report) => {
                all_ok &= report.is_success();
                info!(
                    category = %category,
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    failed = report.failed.len(),
                    skipped_by_cutoff = report.skipped_by_cutoff,
                    "Category report"
                );
                for failed in &report.failed {
                    error!(
                        category = %category,
                        "{} -> {}: {:?}",
                        failed.item.source_id,
                        failed.item.dest_id,
                        failed.failure
                    );
                }
                // Machine-readable copy for whatever collects the logs
                info!(target: "blobsync::report", "{}", serde_json::to_string(&report)?);
            }
            Err(e) => {
                all_ok = false;
                error!(category = %category, "Category run aborted: {}", e);
            }
        }
    }

    Ok(all_ok)
}

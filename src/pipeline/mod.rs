//! Category pipeline: list both stores, reconcile, transfer what is missing.
//!
//! A listing failure aborts the category it happened in. Anything that goes
//! wrong with a single object is recorded in the [`Report`] and the run moves
//! on to the next object. Nothing is retried here.

mod report;

pub use report::{FailedItem, Failure, Report, TransferredItem};

use crate::config::{CategoryConfig, SyncConfig};
use crate::listing::list_objects;
use crate::reconciliation::{reconcile, CutoffDate};
use crate::store::{LocalStore, ObjectStore, StoreError};
use crate::transfer::transfer;
use crate::utils::category_staging_dir;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Which side of the reconciliation a store is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSide {
    Source,
    Destination,
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSide::Source => f.write_str("source"),
            StoreSide::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{side} store unavailable while listing '{prefix}': {source}")]
    StoreUnavailable {
        side: StoreSide,
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Pipeline task for category '{0}' did not complete: {1}")]
    TaskFailed(String, String),
}

/// Everything a category run needs besides the category itself
#[derive(Clone)]
pub struct PipelineContext {
    pub source: Arc<dyn ObjectStore>,
    pub destination: Arc<dyn ObjectStore>,
    /// Root of the per-category staging directories
    pub staging_dir: PathBuf,
    /// Used for categories without their own cutoff
    pub cutoff: CutoffDate,
    pub dry_run: bool,
}

impl PipelineContext {
    pub fn new(
        source: Arc<dyn ObjectStore>,
        destination: Arc<dyn ObjectStore>,
        staging_dir: impl Into<PathBuf>,
        cutoff: CutoffDate,
    ) -> Self {
        Self {
            source,
            destination,
            staging_dir: staging_dir.into(),
            cutoff,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build a context over the directory stores named in the config
    pub fn from_config(config: &SyncConfig) -> Self {
        let source: Arc<dyn ObjectStore> =
            Arc::new(LocalStore::new("source", &config.source.root));
        let destination: Arc<dyn ObjectStore> =
            Arc::new(LocalStore::new("destination", &config.destination.root));

        Self::new(
            source,
            destination,
            &config.staging_dir,
            config.cutoff_date.clone(),
        )
        .with_dry_run(config.dry_run)
    }
}

/// Run one category end to end.
pub async fn run_category(
    ctx: &PipelineContext,
    category: &CategoryConfig,
) -> Result<Report, PipelineError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("category", category = %category.category, run_id = %run_id);

    run_category_inner(ctx, category, run_id)
        .instrument(span)
        .await
}

async fn run_category_inner(
    ctx: &PipelineContext,
    category: &CategoryConfig,
    run_id: Uuid,
) -> Result<Report, PipelineError> {
    let mut report = Report::new(&category.category, run_id, ctx.dry_run);

    let source_prefix = category.source_prefix();
    let source_ids = list_objects(
        ctx.source.as_ref(),
        &source_prefix,
        &category.source_filter_suffix,
    )
    .await
    .map_err(|source| PipelineError::StoreUnavailable {
        side: StoreSide::Source,
        prefix: source_prefix.to_string(),
        source,
    })?;

    let dest_ids = list_objects(ctx.destination.as_ref(), &category.dest_prefix, "")
        .await
        .map_err(|source| PipelineError::StoreUnavailable {
            side: StoreSide::Destination,
            prefix: category.dest_prefix.clone(),
            source,
        })?;

    let cutoff = category.effective_cutoff(&ctx.cutoff);
    let plan = reconcile(category, &source_ids, &dest_ids, cutoff);
    report.skipped_by_cutoff = plan.skipped_by_cutoff;

    info!(
        "{} source objects, {} destination objects, {} to transfer, {} malformed, {} before cutoff {}",
        source_ids.len(),
        dest_ids.len(),
        plan.work_items.len(),
        plan.malformed.len(),
        plan.skipped_by_cutoff,
        cutoff
    );

    for (item, err) in plan.malformed {
        warn!("Not transferring {}: {}", item.source_id, err);
        report.record_failure(item, Failure::from(err));
    }

    if ctx.dry_run {
        for item in &plan.work_items {
            info!("Would copy {} -> {}", item.source_id, item.dest_id);
        }
        report.planned = plan.work_items;
        report.finish();
        return Ok(report);
    }

    let staging_dir = category_staging_dir(&ctx.staging_dir, &category.category);

    for item in plan.work_items {
        let staging_path = item.staging_path(&staging_dir);
        let result = transfer(
            ctx.source.as_ref(),
            &item.source_id,
            ctx.destination.as_ref(),
            &item.dest_id,
            &staging_path,
        )
        .await;

        match result {
            Ok(outcome) => report.record_success(item, outcome),
            Err(e) => {
                error!("Failed to copy {} -> {}: {}", item.source_id, item.dest_id, e);
                report.record_failure(item, Failure::from(&e));
            }
        }
    }

    report.finish();
    info!(
        "Finished: {} attempted, {} succeeded, {} failed",
        report.attempted,
        report.succeeded,
        report.failed.len()
    );

    Ok(report)
}

/// Run every category concurrently, one task per category.
///
/// Results come back in the order the categories were given.
pub async fn run_all(
    ctx: Arc<PipelineContext>,
    categories: Vec<CategoryConfig>,
) -> Vec<(String, Result<Report, PipelineError>)> {
    let handles: Vec<_> = categories
        .into_iter()
        .map(|category| {
            let ctx = Arc::clone(&ctx);
            let name = category.category.clone();
            let handle = tokio::spawn(async move { run_category(&ctx, &category).await });
            (name, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::TaskFailed(name.clone(), e.to_string())),
        };
        results.push((name, result));
    }

    results
}

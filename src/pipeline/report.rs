use crate::reconciliation::{ReconcileError, WorkItem};
use crate::transfer::{TransferError, TransferOutcome, TransferStage};
use crate::utils::now_iso;
use serde::Serialize;
use uuid::Uuid;

/// Why a single object was not transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Failure {
    MalformedIdentifier { reason: String },
    TransferFailed { stage: TransferStage, message: String },
}

impl From<ReconcileError> for Failure {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::MalformedIdentifier { reason, .. } => {
                Failure::MalformedIdentifier { reason }
            }
            other => Failure::MalformedIdentifier {
                reason: other.to_string(),
            },
        }
    }
}

impl From<&TransferError> for Failure {
    fn from(err: &TransferError) -> Self {
        Failure::TransferFailed {
            stage: err.stage,
            message: err.source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferredItem {
    pub item: WorkItem,
    pub outcome: TransferOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub item: WorkItem,
    pub failure: Failure,
}

/// Outcome of one category run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub category: String,
    pub run_id: Uuid,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub dry_run: bool,
    /// Always `succeeded + failed.len()`
    pub attempted: usize,
    /// Always `transferred.len()`
    pub succeeded: usize,
    pub bytes_transferred: u64,
    pub skipped_by_cutoff: usize,
    /// Work list of a dry run; empty otherwise
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<WorkItem>,
    pub transferred: Vec<TransferredItem>,
    pub failed: Vec<FailedItem>,
}

impl Report {
    pub fn new(category: &str, run_id: Uuid, dry_run: bool) -> Self {
        Self {
            category: category.to_string(),
            run_id,
            started_at: now_iso(),
            finished_at: None,
            dry_run,
            attempted: 0,
            succeeded: 0,
            bytes_transferred: 0,
            skipped_by_cutoff: 0,
            planned: Vec::new(),
            transferred: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, item: WorkItem, outcome: TransferOutcome) {
        self.attempted += 1;
        self.succeeded += 1;
        self.bytes_transferred += outcome.bytes;
        self.transferred.push(TransferredItem { item, outcome });
    }

    pub fn record_failure(&mut self, item: WorkItem, failure: Failure) {
        self.attempted += 1;
        self.failed.push(FailedItem { item, failure });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(now_iso());
    }

    /// True when every attempted object made it to the destination
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

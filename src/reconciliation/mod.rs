mod identifier;
mod plan;

pub use identifier::{
    date_token, is_date_token, tail_date_token, validate_tail, CutoffDate, DATE_TOKEN_LEN,
};
pub use plan::{reconcile, Reconciliation, WorkItem};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Malformed identifier '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("Invalid cutoff date '{0}': expected YYYY-MM")]
    InvalidCutoff(String),
}

impl ReconcileError {
    pub fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

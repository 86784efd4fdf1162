pub mod config;
pub mod listing;
pub mod pipeline;
pub mod reconciliation;
pub mod store;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config, write_config, CategoryConfig, ConfigError, StoreConfig, SyncConfig};
pub use listing::list_objects;
pub use pipeline::{
    run_all, run_category, FailedItem, Failure, PipelineContext, PipelineError, Report, StoreSide,
    TransferredItem,
};
pub use reconciliation::{
    date_token, reconcile, CutoffDate, ReconcileError, Reconciliation, WorkItem,
};
pub use store::{LocalStore, MemoryStore, ObjectStore, StoreError};
pub use transfer::{transfer, TransferError, TransferOutcome, TransferStage};

#![allow(dead_code)]

use blobsync::{CategoryConfig, CutoffDate, MemoryStore, ObjectStore, PipelineContext};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a temporary directory for staging or a local store
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn cutoff(s: &str) -> CutoffDate {
    CutoffDate::parse(s).expect("Valid cutoff")
}

pub fn activity_category() -> CategoryConfig {
    CategoryConfig::new("activity", "_activity.csv", "activity/")
}

pub fn customer_category() -> CategoryConfig {
    CategoryConfig::new("customer", "_customer.csv", "customer/")
}

/// Context over two in-memory stores, returning handles to both
pub fn memory_context(
    source: MemoryStore,
    dest: MemoryStore,
    staging_dir: &Path,
    cutoff_date: &str,
) -> (PipelineContext, Arc<MemoryStore>, Arc<MemoryStore>) {
    let source = Arc::new(source);
    let dest = Arc::new(dest);
    let source_store: Arc<dyn ObjectStore> = source.clone();
    let dest_store: Arc<dyn ObjectStore> = dest.clone();

    let ctx = PipelineContext::new(source_store, dest_store, staging_dir, cutoff(cutoff_date));
    (ctx, source, dest)
}

/// Count regular files left anywhere under a directory
pub fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

mod hash;

pub use hash::compute_hash;

use std::path::{Path, PathBuf};

/// Directory created under the system temp dir when no staging dir is configured
pub const STAGING_FOLDER: &str = "blobsync";

/// Path separator used inside object identifiers
pub const ID_SEPARATOR: char = '/';

/// Default staging root (`<tmp>/blobsync`)
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join(STAGING_FOLDER)
}

/// Staging directory for a single category. Categories never share one.
pub fn category_staging_dir(staging_root: &Path, category: &str) -> PathBuf {
    staging_root.join(category)
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

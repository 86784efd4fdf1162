use crate::reconciliation::CutoffDate;
use crate::utils::{default_staging_dir, ID_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No categories configured")]
    NoCategories,

    #[error("Category '{0}' is configured more than once")]
    DuplicateCategory(String),

    #[error("Invalid category name '{0}'")]
    InvalidCategory(String),
}

/// A directory-backed store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub root: PathBuf,
}

/// One category to reconcile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    /// Category tag, e.g. "activity"
    pub category: String,
    /// Source listing prefix. Defaults to `<category>/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prefix: Option<String>,
    /// Exact, case-sensitive trailing match applied to source names
    #[serde(default)]
    pub source_filter_suffix: String,
    /// Destination listing prefix, prepended to every transferred name
    pub dest_prefix: String,
    /// Overrides the global cutoff for this category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_date: Option<CutoffDate>,
}

impl CategoryConfig {
    pub fn new(
        category: impl Into<String>,
        source_filter_suffix: impl Into<String>,
        dest_prefix: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            source_prefix: None,
            source_filter_suffix: source_filter_suffix.into(),
            dest_prefix: dest_prefix.into(),
            cutoff_date: None,
        }
    }

    pub fn with_source_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix = Some(prefix.into());
        self
    }

    pub fn with_cutoff(mut self, cutoff: CutoffDate) -> Self {
        self.cutoff_date = Some(cutoff);
        self
    }

    pub fn source_prefix(&self) -> Cow<'_, str> {
        match &self.source_prefix {
            Some(prefix) => Cow::Borrowed(prefix.as_str()),
            None => Cow::Owned(format!("{}{}", self.category, ID_SEPARATOR)),
        }
    }

    /// The category's own cutoff, or `default` when it has none
    pub fn effective_cutoff<'a>(&'a self, default: &'a CutoffDate) -> &'a CutoffDate {
        self.cutoff_date.as_ref().unwrap_or(default)
    }
}

/// Blobsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub source: StoreConfig,
    pub destination: StoreConfig,
    /// Root of the per-category staging directories
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Objects dated at or before this month are never transferred
    pub cutoff_date: CutoffDate,
    /// Reconcile and log, but transfer nothing
    #[serde(default)]
    pub dry_run: bool,
    pub categories: Vec<CategoryConfig>,
}

impl SyncConfig {
    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            let name = category.category.as_str();
            // The name doubles as the staging subdirectory
            let is_plain = !name.is_empty()
                && name != "."
                && name != ".."
                && !name.contains(['/', '\\']);
            if !is_plain {
                return Err(ConfigError::InvalidCategory(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateCategory(name.to_string()));
            }
        }

        Ok(())
    }

    /// Keep only the named categories. An empty list keeps all of them.
    pub fn select_categories(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.categories
            .retain(|c| names.iter().any(|n| n == &c.category));
    }
}

/// Read and validate the configuration file
pub async fn read_config(config_path: &Path) -> Result<SyncConfig, ConfigError> {
    let content = fs::read_to_string(config_path).await?;
    let config: SyncConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "source": { "root": "/data/source" },
        "destination": { "root": "/data/dest" },
        "cutoffDate": "2022-11",
        "categories": [
            { "category": "activity", "sourceFilterSuffix": "_activity.csv", "destPrefix": "activity/" },
            { "category": "customer", "sourcePrefix": "exports/customer/", "sourceFilterSuffix": "_customer.csv",
              "destPrefix": "customer/", "cutoffDate": "2023-01" }
        ]
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.cutoff_date.as_str(), "2022-11");
        assert!(!config.dry_run);
        assert_eq!(config.staging_dir, default_staging_dir());
        assert_eq!(config.categories.len(), 2);

        let activity = &config.categories[0];
        assert_eq!(activity.source_prefix(), "activity/");
        assert_eq!(activity.effective_cutoff(&config.cutoff_date).as_str(), "2022-11");

        let customer = &config.categories[1];
        assert_eq!(customer.source_prefix(), "exports/customer/");
        assert_eq!(customer.effective_cutoff(&config.cutoff_date).as_str(), "2023-01");
    }

    #[test]
    fn test_invalid_cutoff_is_rejected_at_parse_time() {
        let bad = SAMPLE.replace("\"2022-11\"", "\"November\"");
        assert!(serde_json::from_str::<SyncConfig>(&bad).is_err());
    }

    #[test]
    fn test_duplicate_category_is_rejected() {
        let mut config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.categories[1].category = "activity".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCategory(name)) if name == "activity"
        ));
    }

    #[test]
    fn test_category_name_must_be_a_plain_segment() {
        let mut config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.categories[0].category = "../activity".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_empty_categories_rejected() {
        let mut config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.categories.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoCategories)));
    }

    #[test]
    fn test_select_categories() {
        let mut config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.select_categories(&["customer".to_string()]);
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].category, "customer");

        let mut all: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        all.select_categories(&[]);
        assert_eq!(all.categories.len(), 2);
    }

    #[tokio::test]
    async fn test_write_then_read_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobsync.json");
        let config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();

        write_config(&path, &config).await.unwrap();
        let loaded = read_config(&path).await.unwrap();

        assert_eq!(loaded.categories.len(), 2);
        assert_eq!(loaded.categories[1].source_prefix(), "exports/customer/");
    }
}

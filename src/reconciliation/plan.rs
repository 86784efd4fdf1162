use super::identifier::{tail_date_token, validate_tail, CutoffDate};
use super::ReconcileError;
use crate::config::CategoryConfig;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source object that must be copied to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Name on the source store
    pub source_id: String,
    /// Name the object gets on the destination store
    pub dest_id: String,
    /// Source name with the source prefix removed
    pub tail: String,
    /// `YYYY-MM` token read from the tail; set once the item is validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_token: Option<String>,
}

impl WorkItem {
    /// Re-prefix a source identifier into its destination form.
    ///
    /// A name that does not carry `source_prefix` keeps its full text as the
    /// tail; [`reconcile`] reports such names as malformed.
    pub fn from_source(source_id: &str, source_prefix: &str, dest_prefix: &str) -> Self {
        let tail = source_id.strip_prefix(source_prefix).unwrap_or(source_id);
        Self {
            source_id: source_id.to_string(),
            dest_id: format!("{}{}", dest_prefix, tail),
            tail: tail.to_string(),
            date_token: None,
        }
    }

    /// Local file the object is staged in between download and upload
    pub fn staging_path(&self, category_staging_dir: &Path) -> PathBuf {
        category_staging_dir.join(&self.tail)
    }
}

/// The reconciliation result for one category
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Objects to transfer, sorted by destination identifier
    pub work_items: Vec<WorkItem>,

    /// Missing objects whose names could not be interpreted
    pub malformed: Vec<(WorkItem, ReconcileError)>,

    /// Missing objects dropped because their date is not after the cutoff
    pub skipped_by_cutoff: usize,
}

impl Reconciliation {
    /// Nothing to transfer and nothing to report
    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty() && self.malformed.is_empty()
    }
}

/// Work out which source objects the destination is missing.
///
/// Source names are normalized to their destination form before the set
/// difference. Missing objects whose date token is not strictly after
/// `cutoff` are dropped. The result is sorted by destination identifier.
pub fn reconcile(
    category: &CategoryConfig,
    source_ids: &HashSet<String>,
    dest_ids: &HashSet<String>,
    cutoff: &CutoffDate,
) -> Reconciliation {
    let source_prefix = category.source_prefix();

    let mut sorted_ids: Vec<&String> = source_ids.iter().collect();
    sorted_ids.sort();

    // Grouped by destination id so no destination object is scheduled twice
    let mut groups: BTreeMap<String, Vec<WorkItem>> = BTreeMap::new();
    for source_id in sorted_ids {
        let item = WorkItem::from_source(source_id, &source_prefix, &category.dest_prefix);
        groups.entry(item.dest_id.clone()).or_default().push(item);
    }

    let mut result = Reconciliation::default();

    for (dest_id, mut items) in groups {
        if dest_ids.contains(&dest_id) {
            continue;
        }

        // First valid name in sorted order wins; the rest are reported
        let keep = items
            .iter()
            .position(|item| validate_item(item, &source_prefix).is_ok())
            .unwrap_or(0);
        let chosen = items.remove(keep);

        for duplicate in items {
            warn!(
                "'{}' also maps to '{}', keeping '{}'",
                duplicate.source_id, dest_id, chosen.source_id
            );
            let err = ReconcileError::malformed(
                &duplicate.source_id,
                format!(
                    "maps to '{}', already claimed by '{}'",
                    dest_id, chosen.source_id
                ),
            );
            result.malformed.push((duplicate, err));
        }

        classify(chosen, &source_prefix, cutoff, &mut result);
    }

    result
}

/// Validate one missing item and place it in the work list, the malformed
/// list, or the cutoff count.
fn classify(
    mut item: WorkItem,
    source_prefix: &str,
    cutoff: &CutoffDate,
    result: &mut Reconciliation,
) {
    if let Err(e) = validate_item(&item, source_prefix) {
        result.malformed.push((item, e));
        return;
    }

    let token = match tail_date_token(&item.dest_id, &item.tail) {
        Ok(token) => token.to_string(),
        Err(e) => {
            result.malformed.push((item, e));
            return;
        }
    };

    if cutoff.admits(&token) {
        item.date_token = Some(token);
        result.work_items.push(item);
    } else {
        debug!(
            "Skipping {}: {} is not after cutoff {}",
            item.source_id, token, cutoff
        );
        result.skipped_by_cutoff += 1;
    }
}

fn validate_item(item: &WorkItem, source_prefix: &str) -> Result<(), ReconcileError> {
    if !item.source_id.starts_with(source_prefix) {
        return Err(ReconcileError::malformed(
            &item.source_id,
            format!("does not start with source prefix '{}'", source_prefix),
        ));
    }
    validate_tail(&item.source_id, &item.tail)?;
    Ok(())
}

use crate::store::{ObjectStore, StoreError};
use std::collections::HashSet;
use tracing::debug;

/// List the identifiers under `prefix` whose name ends with `suffix`.
///
/// The suffix match is exact and case-sensitive; an empty suffix keeps every
/// name. Store failures are returned as-is so an incomplete listing is never
/// mistaken for missing objects.
pub async fn list_objects(
    store: &dyn ObjectStore,
    prefix: &str,
    suffix: &str,
) -> Result<HashSet<String>, StoreError> {
    let names = store.list(prefix).await?;
    let total = names.len();

    let matching: HashSet<String> = names
        .into_iter()
        .filter(|name| name.ends_with(suffix))
        .collect();

    debug!(
        "Listed {} objects under '{}' on {} ({} matching '{}')",
        total,
        prefix,
        store.name(),
        matching.len(),
        suffix
    );

    Ok(matching)
}

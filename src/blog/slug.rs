use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use super::repo::BLOG_POSTS;
use crate::store::{RecordStore, StoreError};

/// Lowercase ASCII words joined by single hyphens. Input with no usable
/// characters falls back to `post-<epoch millis>`.
pub fn slugify(source: &str) -> String {
    let base = slug::slugify(source);
    if base.is_empty() {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        return format!("post-{}", millis);
    }
    base
}

/// First free slug among `base`, `base-1`, `base-2`, ... where the row
/// `exclude_id` does not count as taken.
///
/// Check then write is not atomic; the unique index on `slug` rejects a
/// stale probe and callers retry.
pub async fn generate_unique_slug(
    store: &dyn RecordStore,
    source: &str,
    exclude_id: Option<i64>,
) -> Result<String, StoreError> {
    let base = slugify(source);
    let mut suffix = 0u32;
    loop {
        let candidate = if suffix == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, suffix)
        };
        let taken = store
            .find_by_column(&BLOG_POSTS, "slug", candidate.as_str().into())
            .await?
            .iter()
            .any(|row| row.get("id").and_then(Value::as_i64) != exclude_id);
        if !taken {
            return Ok(candidate);
        }
        debug!(candidate = %candidate, "slug taken");
        suffix += 1;
    }
}

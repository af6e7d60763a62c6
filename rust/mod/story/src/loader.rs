//! Catalog loading from the collaborator.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backend::StoryBackend;
use crate::catalog::StoryCatalog;
use crate::error::BackendError;
use crate::model::Cursor;

/// Fetch active stories plus one batched profile lookup and build the
/// catalog. Errors are returned as-is.
pub async fn fetch_catalog<B: StoryBackend + ?Sized>(
    backend: &B,
    now: DateTime<Utc>,
) -> Result<StoryCatalog, BackendError> {
    let stories = backend.list_active_stories(now).await?;

    let mut author_ids: Vec<String> = stories.iter().map(|s| s.author_id.clone()).collect();
    author_ids.sort();
    author_ids.dedup();

    let profiles = if author_ids.is_empty() {
        Default::default()
    } else {
        match backend.profiles(&author_ids).await {
            Ok(profiles) => profiles,
            Err(e) => {
                // Groups fall back to placeholder profiles.
                warn!(error = %e, "loader: profile lookup failed");
                Default::default()
            }
        }
    };

    Ok(StoryCatalog::build(stories, &profiles, now))
}

/// Load the catalog and resolve the initial cursor for `focus_author`.
///
/// A failed load is logged and yields an empty catalog (the viewer must
/// not open); it is not retried.
pub async fn load_catalog<B: StoryBackend + ?Sized>(
    backend: &B,
    now: DateTime<Utc>,
    focus_author: Option<&str>,
) -> (StoryCatalog, Option<Cursor>) {
    let catalog = match fetch_catalog(backend, now).await {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(error = %e, "loader: story list failed");
            StoryCatalog::default()
        }
    };
    let cursor = catalog.initial_cursor(focus_author);
    info!(
        authors = catalog.len(),
        stories = catalog.story_count(),
        focus = focus_author.unwrap_or("-"),
        "loader: catalog ready"
    );
    (catalog, cursor)
}

//! Manifest list projections.
//!
//! Both functions return a new manifest and leave the input untouched. The
//! result keeps the media type the input was served with. A manifest that
//! is not a list comes back unchanged.

use tracing::debug;

use pullcache_core::{Manifest, Result};
use pullcache_registry::BlobExistence;

/// Keeps only the list entries for one platform.
///
/// Matching is exact and case-sensitive; an absent variant compares as `""`.
///
/// # Errors
///
/// Returns an error if the filtered list cannot be serialized.
pub fn select_platform(
    manifest: &Manifest,
    os: &str,
    architecture: &str,
    variant: &str,
) -> Result<Manifest> {
    match manifest.as_list() {
        Some(list) => Manifest::from_list_with_media_type(
            list.select_platform(os, architecture, variant),
            manifest.media_type().clone(),
        ),
        None => Ok(manifest.clone()),
    }
}

/// Keeps only the list entries whose manifests are stored locally.
///
/// Entries whose existence check fails are dropped.
///
/// # Errors
///
/// Returns an error if the filtered list cannot be serialized.
pub async fn retain_present(manifest: &Manifest, existence: &dyn BlobExistence) -> Result<Manifest> {
    let Some(list) = manifest.as_list() else {
        return Ok(manifest.clone());
    };

    let mut keep = Vec::with_capacity(list.manifests.len());
    for entry in &list.manifests {
        keep.push(matches!(existence.exists(&entry.digest).await, Ok(true)));
    }

    let kept = keep.iter().filter(|k| **k).count();
    debug!(
        kept,
        dropped = keep.len() - kept,
        "Filtered manifest list by local presence"
    );

    let mut flags = keep.into_iter();
    let filtered = list.retain_entries(|_| flags.next().unwrap_or(false));
    Manifest::from_list_with_media_type(filtered, manifest.media_type().clone())
}

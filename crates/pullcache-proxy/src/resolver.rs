//! Dependency checks against the local store.

use std::sync::Arc;

use tracing::{debug, warn};

use pullcache_core::{Descriptor, Manifest};
use pullcache_registry::BlobExistence;

/// Finds the references of a manifest that are not yet stored locally.
#[derive(Clone)]
pub struct DependencyResolver {
    existence: Arc<dyn BlobExistence>,
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver").finish_non_exhaustive()
    }
}

impl DependencyResolver {
    /// Creates a resolver over a local existence predicate.
    #[must_use]
    pub fn new(existence: Arc<dyn BlobExistence>) -> Self {
        Self { existence }
    }

    /// Returns the missing references of `manifest`, in reference order.
    ///
    /// A failed existence check counts as missing.
    pub async fn check_dependencies(&self, manifest: &Manifest) -> Vec<Descriptor> {
        let mut missing = Vec::new();
        for descriptor in manifest.references() {
            match self.existence.exists(&descriptor.digest).await {
                Ok(true) => {}
                Ok(false) => missing.push(descriptor.clone()),
                Err(e) => {
                    warn!(digest = %descriptor.digest, error = %e, "Existence check failed");
                    missing.push(descriptor.clone());
                }
            }
        }

        debug!(missing = missing.len(), "Checked manifest dependencies");
        missing
    }
}

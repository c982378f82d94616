//! Background task that copies a fetched artifact into the local registry.
//!
//! A manifest must not become resolvable locally before the blobs it
//! references. The writer polls the local store until the dependencies land
//! (they are cached by the concurrent blob pulls of the same client), copies
//! whatever is still missing near the end of its budget, and then pushes the
//! manifest whether or not everything converged.
//!
//! Manifest lists take a different path: one fixed delay, then only the
//! entries already present locally are pushed.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use pullcache_core::{ArtifactInfo, ContentDigest, Descriptor, Manifest, MediaType, Project};
use pullcache_registry::{AdapterFactory, BlobExistence, RegistryAdapter};

use crate::error::Result;
use crate::filter;
use crate::inflight::{InflightGuard, InflightRegistry};
use crate::policy::WaitPolicy;
use crate::resolver::DependencyResolver;

/// Everything the writer needs to cache one artifact.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// Media type the manifest was served with.
    pub media_type: MediaType,

    /// Manifest fetched from the origin.
    pub manifest: Manifest,

    /// Identity of the artifact; its key deduplicates tasks.
    pub artifact: ArtifactInfo,

    /// Proxy project the artifact is cached into.
    pub project: Project,

    /// Repository name at the origin, without the project prefix.
    pub repository: String,
}

impl CacheRequest {
    /// Creates a request. The media type is taken from the manifest.
    #[must_use]
    pub fn new(
        manifest: Manifest,
        artifact: ArtifactInfo,
        project: Project,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            media_type: manifest.media_type().clone(),
            manifest,
            artifact,
            project,
            repository: repository.into(),
        }
    }

    /// Repository the artifact is pushed to in the local registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::{ArtifactInfo, Manifest, ManifestList, MediaType, Project};
    /// use pullcache_proxy::CacheRequest;
    ///
    /// let manifest = Manifest::from_list(ManifestList::new(MediaType::oci_index(), vec![])).unwrap();
    /// let artifact = ArtifactInfo::new("hub", "hub/library/alpine").with_tag("3.20");
    /// let request = CacheRequest::new(manifest, artifact, Project::new(1, "hub"), "library/alpine");
    /// assert_eq!(request.local_repository(), "hub/library/alpine");
    /// ```
    #[must_use]
    pub fn local_repository(&self) -> String {
        format!("{}/{}", self.artifact.project_name, self.repository)
    }
}

/// How a caching task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Another task already owned the artifact key.
    Skipped,

    /// A single manifest was pushed.
    Pushed {
        /// Digest the local registry stored the manifest under.
        digest: ContentDigest,
        /// Dependency checks that found blobs missing.
        attempts: u32,
        /// Whether every dependency was present before the push.
        converged: bool,
    },

    /// A filtered manifest list was pushed.
    ListPushed {
        /// Digest the local registry stored the list under.
        digest: ContentDigest,
        /// Entries that survived the presence filter.
        entries: usize,
    },

    /// The task gave up; the reason has been logged.
    Failed {
        /// Error description.
        reason: String,
    },
}

impl CacheOutcome {
    /// Returns true if a manifest reached the local registry.
    #[must_use]
    pub const fn is_pushed(&self) -> bool {
        matches!(self, Self::Pushed { .. } | Self::ListPushed { .. })
    }
}

/// Waits for dependencies and pushes manifests into the local registry.
pub struct CacheWriter {
    adapters: Arc<dyn AdapterFactory>,
    existence: Arc<dyn BlobExistence>,
    resolver: DependencyResolver,
    inflight: Arc<InflightRegistry>,
    policy: WaitPolicy,
}

impl std::fmt::Debug for CacheWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriter")
            .field("inflight", &self.inflight.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CacheWriter {
    /// Creates a writer sharing `inflight` with every other writer of the process.
    #[must_use]
    pub fn new(
        adapters: Arc<dyn AdapterFactory>,
        existence: Arc<dyn BlobExistence>,
        inflight: Arc<InflightRegistry>,
        policy: WaitPolicy,
    ) -> Self {
        Self {
            adapters,
            resolver: DependencyResolver::new(Arc::clone(&existence)),
            existence,
            inflight,
            policy,
        }
    }

    /// The dedup guard this writer acquires keys from.
    #[must_use]
    pub const fn inflight(&self) -> &Arc<InflightRegistry> {
        &self.inflight
    }

    /// The timing policy.
    #[must_use]
    pub const fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Claims the artifact key of `request`, or `None` if a task owns it.
    #[must_use]
    pub fn try_begin(&self, request: &CacheRequest) -> Option<InflightGuard> {
        InflightRegistry::lock(&self.inflight, request.artifact.key())
    }

    /// Caches an artifact. Returns [`CacheOutcome::Skipped`] without any
    /// registry call if another task is already caching the same key.
    pub async fn cache_artifact(&self, request: CacheRequest) -> CacheOutcome {
        match self.try_begin(&request) {
            Some(guard) => self.run(guard, request).await,
            None => {
                debug!(key = %request.artifact.key(), "Artifact already being cached, skipping");
                CacheOutcome::Skipped
            }
        }
    }

    /// Runs a task whose key was claimed with [`Self::try_begin`].
    ///
    /// The key is released when this returns.
    pub async fn run(&self, guard: InflightGuard, request: CacheRequest) -> CacheOutcome {
        let task_id = uuid::Uuid::now_v7();
        let span = info_span!(
            "cache_artifact",
            task_id = %task_id,
            key = %guard.key(),
            media_type = %request.media_type,
        );

        async move {
            let outcome = if request.media_type.is_manifest_list() {
                self.cache_list(&request).await
            } else {
                self.cache_single(&request).await
            };
            drop(guard);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn cache_list(&self, request: &CacheRequest) -> CacheOutcome {
        let delay = self.policy.manifest_list_delay();
        debug!(delay_secs = delay.as_secs(), "Delaying manifest list push");
        tokio::time::sleep(delay).await;

        let filtered =
            match filter::retain_present(&request.manifest, self.existence.as_ref()).await {
                Ok(filtered) => filtered,
                Err(e) => {
                    error!(error = %e, "Failed to filter manifest list");
                    return CacheOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            };
        let entries = filtered.as_list().map_or(0, |list| list.manifests.len());

        match self.push_manifest(request, &filtered).await {
            Ok(digest) => {
                info!(digest = %digest, entries, "Cached manifest list");
                CacheOutcome::ListPushed { digest, entries }
            }
            Err(e) => {
                error!(error = %e, "Failed to push manifest list");
                CacheOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn cache_single(&self, request: &CacheRequest) -> CacheOutcome {
        let mut attempts = 0;
        let mut converged = false;

        while attempts < self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval()).await;

            let missing = self.resolver.check_dependencies(&request.manifest).await;
            if missing.is_empty() {
                converged = true;
                break;
            }
            attempts += 1;
            debug!(attempts, missing = missing.len(), "Dependencies not yet cached");

            if self.policy.force_copy_attempt() == Some(attempts) {
                info!(
                    missing = missing.len(),
                    "Dependencies still missing, copying them from the origin"
                );
                self.force_copy(request, &missing).await;
                tokio::time::sleep(self.policy.force_copy_settle()).await;
            }
        }

        if !converged {
            warn!(attempts, "Pushing manifest before all dependencies were cached");
        }

        match self.push_manifest(request, &request.manifest).await {
            Ok(digest) => {
                info!(digest = %digest, attempts, converged, "Cached manifest");
                CacheOutcome::Pushed {
                    digest,
                    attempts,
                    converged,
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to push manifest");
                CacheOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Copies missing blobs from the origin, one at a time.
    async fn force_copy(&self, request: &CacheRequest, missing: &[Descriptor]) {
        let Some(registry_id) = request.project.proxy_registry_id() else {
            warn!(project = %request.project.name, "Project has no upstream registry, cannot copy blobs");
            return;
        };

        let origin = match self.adapters.origin_adapter(registry_id).await {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(registry_id, error = %e, "Failed to create upstream adapter");
                return;
            }
        };
        let local = match self.adapters.local_adapter().await {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(error = %e, "Failed to create local adapter");
                return;
            }
        };

        let target = request.local_repository();
        for descriptor in missing {
            match copy_blob(
                origin.as_ref(),
                local.as_ref(),
                &request.repository,
                &target,
                descriptor,
            )
            .await
            {
                Ok(()) => debug!(digest = %descriptor.digest, "Copied blob from origin"),
                Err(e) => warn!(digest = %descriptor.digest, error = %e, "Failed to copy blob"),
            }
        }
    }

    /// Pushes `manifest` to the local registry by digest.
    async fn push_manifest(&self, request: &CacheRequest, manifest: &Manifest) -> Result<ContentDigest> {
        let local = self.adapters.local_adapter().await?;
        let digest = manifest.digest();
        let repository = request.local_repository();

        debug!(repository = %repository, digest = %digest, "Pushing manifest to local registry");
        let stored = local
            .push_manifest(
                &repository,
                digest.as_str(),
                manifest.media_type(),
                manifest.payload().clone(),
            )
            .await?;
        Ok(stored)
    }
}

async fn copy_blob(
    origin: &dyn RegistryAdapter,
    local: &dyn RegistryAdapter,
    source: &str,
    target: &str,
    descriptor: &Descriptor,
) -> Result<()> {
    let (_, blob) = origin.pull_blob(source, &descriptor.digest).await?;
    local
        .push_blob(target, &descriptor.digest, descriptor.size, blob)
        .await?;
    Ok(())
}

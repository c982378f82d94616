//! Pullcache Proxy
//!
//! The caching core of the pull-through cache. A client is answered
//! straight from the origin registry, and a background task then copies the
//! artifact into the local registry.
//!
//! # Overview
//!
//! - **Origin passthroughs**: manifest and blob fetches served from upstream
//! - **Cache writer**: waits for a manifest's blobs to land locally, copies
//!   stragglers from the origin, and pushes the manifest
//! - **Dedup guard**: at most one caching task per artifact key
//! - **List filter**: platform selection and presence filtering of
//!   multi-platform manifest lists
//!
//! # Architecture
//!
//! ```text
//!   client pull ──▶ OriginFetcher ──▶ upstream registry
//!        │
//!        └──▶ PullThroughCache::cache_artifact
//!                  │  (InflightRegistry, task limiter)
//!                  ▼
//!             CacheWriter ──▶ DependencyResolver ──▶ local storage
//!                  │
//!                  └──▶ local registry (push by digest)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pullcache_proxy::{CacheRequest, OriginManifest, ProxyConfig, PullThroughCache};
//!
//! let cache = PullThroughCache::from_config(&ProxyConfig::from_file("pullcache.yaml")?)?;
//! if let OriginManifest::Found { manifest, .. } =
//!     cache.fetch_manifest_from_origin("library/alpine", "3.20", 1).await?
//! {
//!     let request = CacheRequest::new(manifest, artifact, project, "library/alpine");
//!     let _ = cache.cache_artifact(request);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod inflight;
pub mod policy;
pub mod resolver;
pub mod writer;


use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use pullcache_core::{ContentDigest, Descriptor, Manifest};
use pullcache_registry::{
    AdapterFactory, BlobExistence, HttpAdapterFactory, StaticRegistryStore, StorageBlobIndex,
};

pub use config::{ProxyConfig, ProxyConfigBuilder};
pub use error::{ProxyError, Result};
pub use fetch::{content_headers, OriginFetcher, OriginManifest};
pub use filter::{retain_present, select_platform};
pub use inflight::{InflightGuard, InflightRegistry};
pub use policy::{WaitPolicy, WaitPolicyBuilder};
pub use resolver::DependencyResolver;
pub use writer::{CacheOutcome, CacheRequest, CacheWriter};

/// Process-wide coordinator of the pull-through cache.
///
/// Owns the dedup guard and the task limiter; created once at startup.
#[derive(Debug)]
pub struct PullThroughCache {
    writer: Arc<CacheWriter>,
    fetcher: OriginFetcher,
    resolver: DependencyResolver,
    limiter: Option<Arc<Semaphore>>,
}

impl PullThroughCache {
    /// Creates a coordinator.
    ///
    /// `max_concurrent_tasks` bounds how many caching tasks run at once;
    /// `0` leaves them unbounded.
    pub fn new(
        adapters: Arc<dyn AdapterFactory>,
        existence: Arc<dyn BlobExistence>,
        policy: WaitPolicy,
        max_concurrent_tasks: usize,
    ) -> Self {
        let inflight = Arc::new(InflightRegistry::new());
        let limiter = (max_concurrent_tasks > 0).then(|| Arc::new(Semaphore::new(max_concurrent_tasks)));

        Self {
            writer: Arc::new(CacheWriter::new(
                Arc::clone(&adapters),
                Arc::clone(&existence),
                inflight,
                policy,
            )),
            fetcher: OriginFetcher::new(adapters),
            resolver: DependencyResolver::new(existence),
            limiter,
        }
    }

    /// Creates a coordinator backed by HTTP adapters and filesystem storage.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(StaticRegistryStore::new(config.registries.iter().cloned()));
        let adapters = HttpAdapterFactory::new(&config.core_url, &config.service_secret, store)
            .with_timeout(config.request_timeout());
        let existence = StorageBlobIndex::new(&config.storage_root);

        Ok(Self::new(
            Arc::new(adapters),
            Arc::new(existence),
            config.wait,
            config.max_concurrent_tasks,
        ))
    }

    /// The dedup guard shared by every caching task.
    pub fn inflight(&self) -> &Arc<InflightRegistry> {
        self.writer.inflight()
    }

    /// See [`OriginFetcher::fetch_manifest_from_origin`].
    pub async fn fetch_manifest_from_origin(
        &self,
        repository: &str,
        reference: &str,
        registry_id: i64,
    ) -> Result<OriginManifest> {
        self.fetcher
            .fetch_manifest_from_origin(repository, reference, registry_id)
            .await
    }

    /// See [`OriginFetcher::fetch_blob_from_origin`].
    pub async fn fetch_blob_from_origin<W>(
        &self,
        writer: &mut W,
        repository: &str,
        digest: &ContentDigest,
        registry_id: i64,
    ) -> Result<Descriptor>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.fetcher
            .fetch_blob_from_origin(writer, repository, digest, registry_id)
            .await
    }

    /// References of `manifest` missing from local storage.
    pub async fn check_dependencies(&self, manifest: &Manifest) -> Vec<Descriptor> {
        self.resolver.check_dependencies(manifest).await
    }

    /// Schedules a background caching task.
    ///
    /// The artifact key is claimed before the task waits for a slot, so a
    /// duplicate request returns `None` even while the first one is still
    /// queued. Nothing is spawned in that case. The handle may be dropped.
    pub fn cache_artifact(&self, request: CacheRequest) -> Option<JoinHandle<CacheOutcome>> {
        let Some(guard) = self.writer.try_begin(&request) else {
            debug!(key = %request.artifact.key(), "Artifact already being cached, skipping");
            return None;
        };

        let writer = Arc::clone(&self.writer);
        let limiter = self.limiter.clone();
        Some(tokio::spawn(async move {
            let _permit = match limiter {
                Some(limiter) => match limiter.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        return CacheOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                },
                None => None,
            };
            writer.run(guard, request).await
        }))
    }
}

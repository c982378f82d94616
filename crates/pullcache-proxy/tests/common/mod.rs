//! In-memory registries for proxy integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use parking_lot::Mutex;

use pullcache_core::{
    ArtifactInfo, ContentDigest, Descriptor, ImageManifest, Manifest, ManifestList, MediaType,
    Platform, Project,
};
use pullcache_proxy::CacheRequest;
use pullcache_registry::{
    AdapterFactory, BlobExistence, BlobStream, RegistryAdapter, RegistryError, Result,
};

/// Upstream registry id the test project points at.
pub const ORIGIN_ID: i64 = 1;

/// One observed registry interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LocalAdapter,
    OriginAdapter(i64),
    Exists(ContentDigest),
    PullManifest(String, String),
    PullBlob(String, ContentDigest),
    PushBlob(String, ContentDigest),
    PushManifest(String, String),
}

/// Shared state behind the mock factory, adapters and existence predicate.
#[derive(Default)]
pub struct Registries {
    pub calls: Mutex<Vec<Call>>,
    pub local_blobs: Mutex<HashSet<ContentDigest>>,
    pub origin_blobs: Mutex<HashMap<ContentDigest, Vec<u8>>>,
    pub origin_manifests: Mutex<HashMap<String, Manifest>>,
    pub pushed_manifests: Mutex<Vec<(String, String, Bytes)>>,
    /// Content type of each pushed manifest, in push order.
    pub pushed_media_types: Mutex<Vec<MediaType>>,
    /// Blobs pushed locally become visible to the existence predicate.
    pub persist_pushed_blobs: Mutex<bool>,
    pub fail_local_adapter: Mutex<bool>,
    pub fail_existence: Mutex<bool>,
    /// Size the origin declares for blobs, overriding the real length.
    pub declared_blob_size: Mutex<Option<u64>>,
}

impl Registries {
    pub fn new() -> Arc<Self> {
        let registries = Self::default();
        *registries.persist_pushed_blobs.lock() = true;
        Arc::new(registries)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn exists_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Exists(_)))
    }

    pub fn manifest_pushes(&self) -> usize {
        self.count(|c| matches!(c, Call::PushManifest(..)))
    }

    pub fn blob_pulls(&self) -> usize {
        self.count(|c| matches!(c, Call::PullBlob(..)))
    }

    /// Every call except existence checks.
    pub fn adapter_calls(&self) -> usize {
        self.count(|c| !matches!(c, Call::Exists(_)))
    }

    pub fn store_local(&self, digest: &ContentDigest) {
        self.local_blobs.lock().insert(digest.clone());
    }

    pub fn store_origin_blob(&self, content: &[u8]) -> ContentDigest {
        let digest = ContentDigest::sha256_of(content);
        self.origin_blobs
            .lock()
            .insert(digest.clone(), content.to_vec());
        digest
    }
}

pub struct MockFactory(pub Arc<Registries>);

#[async_trait]
impl AdapterFactory for MockFactory {
    async fn local_adapter(&self) -> Result<Box<dyn RegistryAdapter>> {
        self.0.record(Call::LocalAdapter);
        if *self.0.fail_local_adapter.lock() {
            return Err(RegistryError::AuthenticationFailed {
                message: "bad service secret".to_string(),
            });
        }
        Ok(Box::new(MockAdapter {
            state: Arc::clone(&self.0),
        }))
    }

    async fn origin_adapter(&self, registry_id: i64) -> Result<Box<dyn RegistryAdapter>> {
        self.0.record(Call::OriginAdapter(registry_id));
        if registry_id != ORIGIN_ID {
            return Err(RegistryError::RegistryNotFound { id: registry_id });
        }
        Ok(Box::new(MockAdapter {
            state: Arc::clone(&self.0),
        }))
    }
}

struct MockAdapter {
    state: Arc<Registries>,
}

#[async_trait]
impl RegistryAdapter for MockAdapter {
    async fn pull_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<(Manifest, ContentDigest)> {
        self.state
            .record(Call::PullManifest(repository.to_string(), reference.to_string()));
        let manifest = self
            .state
            .origin_manifests
            .lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| RegistryError::ManifestNotFound {
                repository: repository.to_string(),
                reference: reference.to_string(),
            })?;
        let digest = manifest.digest();
        Ok((manifest, digest))
    }

    async fn pull_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
    ) -> Result<(Descriptor, BlobStream)> {
        self.state
            .record(Call::PullBlob(repository.to_string(), digest.clone()));
        let content = self
            .state
            .origin_blobs
            .lock()
            .get(digest)
            .cloned()
            .ok_or_else(|| RegistryError::BlobNotFound {
                repository: repository.to_string(),
                digest: digest.to_string(),
            })?;
        let declared = *self.state.declared_blob_size.lock();
        let size = declared.unwrap_or(content.len() as u64);

        let chunks: Vec<Result<Bytes>> = content
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok((
            Descriptor::new(MediaType::new(MediaType::OCTET_STREAM), digest.clone(), size),
            stream::iter(chunks).boxed(),
        ))
    }

    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        media_type: &MediaType,
        payload: Bytes,
    ) -> Result<ContentDigest> {
        self.state
            .record(Call::PushManifest(repository.to_string(), reference.to_string()));
        self.state.pushed_media_types.lock().push(media_type.clone());
        let digest = ContentDigest::sha256_of(&payload);
        self.state.pushed_manifests.lock().push((
            repository.to_string(),
            reference.to_string(),
            payload,
        ));
        Ok(digest)
    }

    async fn push_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
        _size: u64,
        blob: BlobStream,
    ) -> Result<()> {
        self.state
            .record(Call::PushBlob(repository.to_string(), digest.clone()));
        let _: Vec<Bytes> = blob.try_collect().await?;
        if *self.state.persist_pushed_blobs.lock() {
            self.state.store_local(digest);
        }
        Ok(())
    }

    async fn blob_exists(&self, _repository: &str, digest: &ContentDigest) -> Result<bool> {
        Ok(self.state.local_blobs.lock().contains(digest))
    }
}

pub struct MockExistence(pub Arc<Registries>);

#[async_trait]
impl BlobExistence for MockExistence {
    async fn exists(&self, digest: &ContentDigest) -> Result<bool> {
        self.0.record(Call::Exists(digest.clone()));
        if *self.0.fail_existence.lock() {
            return Err(RegistryError::InvalidResponse {
                message: "storage unavailable".to_string(),
            });
        }
        Ok(self.0.local_blobs.lock().contains(digest))
    }
}

/// Image manifest whose only reference is its config blob.
pub fn single_manifest(config: &ContentDigest) -> Manifest {
    Manifest::from_image(ImageManifest {
        schema_version: 2,
        media_type: Some(MediaType::docker_manifest()),
        artifact_type: None,
        config: Descriptor::new(MediaType::new(MediaType::DOCKER_CONFIG), config.clone(), 6),
        layers: vec![],
        subject: None,
        annotations: None,
    })
    .unwrap()
}

/// Manifest list over the given per-platform manifests.
pub fn list_manifest(entries: &[(&ContentDigest, &str)]) -> Manifest {
    let manifests = entries
        .iter()
        .map(|(digest, platform)| {
            Descriptor::new(MediaType::docker_manifest(), (*digest).clone(), 500)
                .with_platform(platform.parse::<Platform>().unwrap())
        })
        .collect();
    Manifest::from_list(ManifestList::new(MediaType::docker_manifest_list(), manifests)).unwrap()
}

/// OCI index whose body omits `mediaType`; entries carry an `artifactType`.
pub fn bare_oci_index(entries: &[&ContentDigest]) -> Manifest {
    let manifests = entries
        .iter()
        .map(|digest| {
            format!(
                r#"{{"mediaType":"{}","digest":"{digest}","size":500,"artifactType":"application/vnd.example.sbom","platform":{{"os":"linux","architecture":"amd64"}}}}"#,
                MediaType::OCI_MANIFEST,
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    let raw = format!(r#"{{"schemaVersion":2,"manifests":[{manifests}]}}"#);
    Manifest::parse(MediaType::oci_index(), raw.into_bytes()).unwrap()
}

/// Request to cache `library/alpine:<tag>` into the `hub` project.
pub fn request(manifest: Manifest, tag: &str) -> CacheRequest {
    CacheRequest::new(
        manifest,
        ArtifactInfo::new("hub", "hub/library/alpine").with_tag(tag),
        Project::new(2, "hub").with_registry(ORIGIN_ID),
        "library/alpine",
    )
}

//! Registry adapter contracts.
//!
//! The cache never talks HTTP directly; it drives registries through these
//! traits so tests can substitute in-memory implementations.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use pullcache_core::{ContentDigest, Descriptor, Manifest, MediaType};

use crate::error::Result;

/// Stream of blob content chunks.
pub type BlobStream = BoxStream<'static, Result<Bytes>>;

/// Handle to one registry endpoint bound to one credential.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Pulls a manifest by tag or digest, returning it with its digest.
    async fn pull_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<(Manifest, ContentDigest)>;

    /// Pulls a blob, returning its descriptor and a content stream.
    async fn pull_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
    ) -> Result<(Descriptor, BlobStream)>;

    /// Pushes a manifest payload under a tag or digest reference.
    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        media_type: &MediaType,
        payload: Bytes,
    ) -> Result<ContentDigest>;

    /// Pushes a blob of known size from a stream.
    async fn push_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
        size: u64,
        blob: BlobStream,
    ) -> Result<()>;

    /// Returns true if the registry already has the blob in the repository.
    async fn blob_exists(&self, repository: &str, digest: &ContentDigest) -> Result<bool>;
}

/// Existence predicate over the local content-addressable store.
#[async_trait]
pub trait BlobExistence: Send + Sync {
    /// Returns true if content with the digest is stored locally.
    async fn exists(&self, digest: &ContentDigest) -> Result<bool>;
}

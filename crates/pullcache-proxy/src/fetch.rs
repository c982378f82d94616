//! Synchronous passthroughs that answer a client straight from the origin.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use pullcache_core::{ContentDigest, Descriptor, Manifest, MediaType};
use pullcache_registry::{AdapterFactory, DOCKER_CONTENT_DIGEST};

use crate::error::{ProxyError, Result};

/// Result of looking a manifest up at the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginManifest {
    /// The origin served the manifest.
    Found {
        /// The manifest as served.
        manifest: Manifest,
        /// Media type, digest and size of the payload.
        descriptor: Descriptor,
    },

    /// The origin has no such manifest.
    NotFound,

    /// No adapter could be built for the origin; worth retrying later.
    Unavailable {
        /// Why the origin could not be reached.
        reason: String,
    },
}

impl OriginManifest {
    /// Returns the manifest and its descriptor if found.
    #[must_use]
    pub fn found(self) -> Option<(Manifest, Descriptor)> {
        match self {
            Self::Found {
                manifest,
                descriptor,
            } => Some((manifest, descriptor)),
            Self::NotFound | Self::Unavailable { .. } => None,
        }
    }
}

/// Fetches manifests and blobs from upstream registries.
#[derive(Clone)]
pub struct OriginFetcher {
    adapters: Arc<dyn AdapterFactory>,
}

impl std::fmt::Debug for OriginFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginFetcher").finish_non_exhaustive()
    }
}

impl OriginFetcher {
    /// Creates a fetcher drawing adapters from `adapters`.
    #[must_use]
    pub fn new(adapters: Arc<dyn AdapterFactory>) -> Self {
        Self { adapters }
    }

    /// Pulls a manifest by tag or digest from the origin registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull fails for a reason other than absence.
    pub async fn fetch_manifest_from_origin(
        &self,
        repository: &str,
        reference: &str,
        registry_id: i64,
    ) -> Result<OriginManifest> {
        let adapter = match self.adapters.origin_adapter(registry_id).await {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(registry_id, error = %e, "Failed to create upstream adapter");
                return Ok(OriginManifest::Unavailable {
                    reason: e.to_string(),
                });
            }
        };

        match adapter.pull_manifest(repository, reference).await {
            Ok((manifest, digest)) => {
                let descriptor = Descriptor::new(
                    manifest.media_type().clone(),
                    digest,
                    manifest.payload().len() as u64,
                );
                debug!(repository, reference, digest = %descriptor.digest, "Fetched manifest from origin");
                Ok(OriginManifest::Found {
                    manifest,
                    descriptor,
                })
            }
            Err(e) if e.is_not_found() => Ok(OriginManifest::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Streams a blob from the origin into `writer`.
    ///
    /// Exactly the size the origin declares is copied. A short copy or a
    /// digest mismatch is logged; the returned descriptor always carries the
    /// requested digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin cannot be reached, the blob cannot be
    /// pulled, or writing to `writer` fails.
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
        let adapter = self.adapters.origin_adapter(registry_id).await?;
        let (declared, mut blob) = adapter.pull_blob(repository, digest).await?;

        let mut hasher = digest.hasher();
        let mut remaining = declared.size;
        let mut written = 0u64;
        let mut failure = None;

        while remaining > 0 {
            let chunk = match blob.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    error!(digest = %digest, error = %e, "Blob stream from origin failed");
                    failure = Some(ProxyError::from(e));
                    break;
                }
                None => break,
            };
            let take = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
            let part = &chunk[..take];

            if let Err(e) = writer.write_all(part).await {
                error!(digest = %digest, error = %e, "Failed to write blob");
                failure = Some(ProxyError::Write {
                    digest: digest.to_string(),
                    source: e,
                });
                break;
            }
            if let Some(h) = hasher.as_mut() {
                h.update(part);
            }
            written += take as u64;
            remaining -= take as u64;
        }

        if failure.is_none() {
            if let Err(e) = writer.flush().await {
                failure = Some(ProxyError::Write {
                    digest: digest.to_string(),
                    source: e,
                });
            }
        }

        if written != declared.size {
            error!(
                actual = written,
                expected = declared.size,
                "Blob size mismatch"
            );
        }
        if &declared.digest != digest {
            error!(requested = %digest, served = %declared.digest, "Origin served a different digest");
        }
        if written == declared.size {
            if let Some(computed) = hasher.map(|h| h.finalize()) {
                if &computed != digest {
                    error!(requested = %digest, computed = %computed, "Blob content does not match digest");
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        debug!(repository, digest = %digest, size = written, "Fetched blob from origin");
        Ok(Descriptor::new(
            declared.media_type,
            digest.clone(),
            declared.size,
        ))
    }
}

/// Response headers for content served by digest.
///
/// # Errors
///
/// Returns an error if the media type is not a valid header value.
///
/// # Examples
///
/// ```
/// use pullcache_core::{ContentDigest, MediaType};
/// use pullcache_proxy::content_headers;
///
/// let digest = ContentDigest::sha256_of(b"{}");
/// let headers = content_headers(2, &MediaType::oci_manifest(), &digest).unwrap();
/// assert_eq!(headers["content-length"], "2");
/// assert_eq!(headers["docker-content-digest"], digest.as_str());
/// ```
pub fn content_headers(
    size: u64,
    media_type: &MediaType,
    digest: &ContentDigest,
) -> Result<HeaderMap> {
    let value = |s: &str| {
        HeaderValue::from_str(s).map_err(|_| ProxyError::InvalidHeader {
            value: s.to_string(),
        })
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(CONTENT_TYPE, value(media_type.as_str())?);
    headers.insert(
        HeaderName::from_static(DOCKER_CONTENT_DIGEST),
        value(digest.as_str())?,
    );
    headers.insert(ETAG, value(digest.as_str())?);
    Ok(headers)
}

//! OCI Distribution API client.
//!
//! [`RegistryClient`] is the HTTP implementation of [`RegistryAdapter`]. It
//! speaks the plain distribution protocol: manifests and blobs by digest,
//! monolithic blob uploads and `HEAD` existence probes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION,
};
use reqwest::{Response, StatusCode};

use pullcache_core::{ContentDigest, Descriptor, Manifest, MediaType};

use crate::adapter::{BlobStream, RegistryAdapter};
use crate::config::{RegistryAuth, RegistryConfig, SECRET_AUTH_SCHEME};
use crate::error::{RegistryError, Result};

/// Header carrying the canonical digest of served or stored content.
pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Client for one OCI-compatible registry.
#[derive(Debug)]
pub struct RegistryClient {
    config: RegistryConfig,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS material cannot be loaded or the HTTP
    /// client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pullcache_registry::{RegistryClient, RegistryConfig};
    ///
    /// let config = RegistryConfig::new("https://registry-1.docker.io");
    /// let client = RegistryClient::new(config)?;
    /// # Ok::<(), pullcache_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http = Self::build_http_client(&config)?;
        Ok(Self { config, http })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(ref tls) = config.tls {
            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(ref ca_cert) = tls.ca_cert {
                let cert_pem = std::fs::read(ca_cert).map_err(|e| RegistryError::IoError {
                    path: ca_cert.clone(),
                    source: e,
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                    RegistryError::InvalidTls {
                        message: format!("Invalid CA certificate: {e}"),
                    }
                })?;
                builder = builder.add_root_certificate(cert);
            }

            if let (Some(ref cert_path), Some(ref key_path)) = (&tls.client_cert, &tls.client_key)
            {
                let mut cert_pem = std::fs::read(cert_path).map_err(|e| RegistryError::IoError {
                    path: cert_path.clone(),
                    source: e,
                })?;
                let key_pem = std::fs::read(key_path).map_err(|e| RegistryError::IoError {
                    path: key_path.clone(),
                    source: e,
                })?;
                cert_pem.extend_from_slice(&key_pem);

                let identity = reqwest::Identity::from_pem(&cert_pem).map_err(|e| {
                    RegistryError::InvalidTls {
                        message: format!("Invalid client certificate: {e}"),
                    }
                })?;
                builder = builder.identity(identity);
            }
        }

        builder.build().map_err(|e| RegistryError::ConnectionFailed {
            url: config.url.clone(),
            source: e,
        })
    }

    /// Creates authentication headers based on configuration.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let value = match &self.config.auth {
            RegistryAuth::None => return Ok(headers),
            RegistryAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                format!("Basic {credentials}")
            }
            RegistryAuth::Bearer { token } => format!("Bearer {token}"),
            RegistryAuth::Secret { secret } => format!("{SECRET_AUTH_SCHEME} {secret}"),
        };

        let mut value =
            HeaderValue::from_str(&value).map_err(|_| RegistryError::AuthenticationFailed {
                message: "Invalid credentials".to_string(),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        Ok(headers)
    }

    /// Maps a non-success response to an error.
    async fn status_error(response: Response) -> RegistryError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            RegistryError::AuthenticationFailed {
                message: format!("{status}: {message}"),
            }
        } else {
            RegistryError::HttpError {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// Reads the `Docker-Content-Digest` header, if present and valid.
    fn header_digest(headers: &HeaderMap) -> Option<ContentDigest> {
        headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| ContentDigest::parse(v).ok())
    }

    /// Resolves an upload `Location` header against the registry URL.
    fn upload_url(&self, location: &str, digest: &ContentDigest) -> Result<url::Url> {
        let base = url::Url::parse(&self.config.url).map_err(|_| RegistryError::InvalidUrl {
            url: self.config.url.clone(),
        })?;
        let mut upload = base.join(location).map_err(|_| RegistryError::InvalidUrl {
            url: location.to_string(),
        })?;
        upload
            .query_pairs_mut()
            .append_pair("digest", digest.as_str());
        Ok(upload)
    }
}

#[async_trait]
impl RegistryAdapter for RegistryClient {
    async fn pull_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<(Manifest, ContentDigest)> {
        let url = self
            .config
            .api_url(&format!("{repository}/manifests/{reference}"));

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .header(ACCEPT, MediaType::MANIFEST_ACCEPT.join(", "))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::ManifestNotFound {
                repository: repository.to_string(),
                reference: reference.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| MediaType::new("application/json"), MediaType::new);
        let served_digest = Self::header_digest(response.headers());
        let payload = response.bytes().await?;

        let manifest = Manifest::parse(media_type, payload)?;
        let digest = served_digest
            .or_else(|| ContentDigest::parse(reference).ok())
            .unwrap_or_else(|| manifest.digest());

        tracing::debug!(repository, reference, digest = %digest, "Pulled manifest");
        Ok((manifest, digest))
    }

    async fn pull_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
    ) -> Result<(Descriptor, BlobStream)> {
        let url = self.config.api_url(&format!("{repository}/blobs/{digest}"));

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::BlobNotFound {
                repository: repository.to_string(),
                digest: digest.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let size = response
            .content_length()
            .ok_or_else(|| RegistryError::InvalidResponse {
                message: format!("blob {digest} served without Content-Length"),
            })?;
        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| MediaType::new(MediaType::OCTET_STREAM), MediaType::new);
        let served_digest = Self::header_digest(response.headers()).unwrap_or_else(|| digest.clone());

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RegistryError::from))
            .boxed();

        Ok((Descriptor::new(media_type, served_digest, size), stream))
    }

    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        media_type: &MediaType,
        payload: Bytes,
    ) -> Result<ContentDigest> {
        let url = self
            .config
            .api_url(&format!("{repository}/manifests/{reference}"));
        let computed = ContentDigest::sha256_of(&payload);

        let response = self
            .http
            .put(&url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, media_type.as_str())
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(RegistryError::ManifestPushFailed {
                repository: repository.to_string(),
                reference: reference.to_string(),
                message: format!("{status}: {}", response.text().await.unwrap_or_default()),
            });
        }

        Ok(Self::header_digest(response.headers()).unwrap_or(computed))
    }

    async fn push_blob(
        &self,
        repository: &str,
        digest: &ContentDigest,
        size: u64,
        blob: BlobStream,
    ) -> Result<()> {
        let start_url = self.config.api_url(&format!("{repository}/blobs/uploads/"));

        let response = self
            .http
            .post(&start_url)
            .headers(self.auth_headers()?)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: format!("Failed to start upload: {}", response.status()),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: "No upload location returned".to_string(),
            })?;
        let upload_url = self.upload_url(location, digest)?;

        let response = self
            .http
            .put(upload_url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, MediaType::OCTET_STREAM)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(blob))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: format!("Failed to upload blob: {}", response.status()),
            });
        }

        tracing::debug!(repository, digest = %digest, size, "Pushed blob");
        Ok(())
    }

    async fn blob_exists(&self, repository: &str, digest: &ContentDigest) -> Result<bool> {
        let url = self.config.api_url(&format!("{repository}/blobs/{digest}"));

        let response = self
            .http
            .head(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::status_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = RegistryConfig::new("https://registry.example.com");
        let client = RegistryClient::new(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_auth_headers_none() {
        let config = RegistryConfig::new("https://example.com");
        let client = RegistryClient::new(config).unwrap();
        let headers = client.auth_headers().unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_auth_headers_basic() {
        let config =
            RegistryConfig::new("https://example.com").with_auth(RegistryAuth::basic("user", "pass"));
        let client = RegistryClient::new(config).unwrap();
        let headers = client.auth_headers().unwrap();

        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(auth, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_auth_headers_bearer() {
        let config =
            RegistryConfig::new("https://example.com").with_auth(RegistryAuth::bearer("my-token"));
        let client = RegistryClient::new(config).unwrap();
        let headers = client.auth_headers().unwrap();

        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(auth, "Bearer my-token");
    }

    #[test]
    fn test_auth_headers_secret() {
        let config =
            RegistryConfig::new("https://example.com").with_auth(RegistryAuth::secret("abc"));
        let client = RegistryClient::new(config).unwrap();
        let headers = client.auth_headers().unwrap();

        let auth = headers.get(AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Harbor-Secret abc");
    }

    #[test]
    fn test_upload_url_relative_location() {
        let client = RegistryClient::new(RegistryConfig::new("http://localhost:5000")).unwrap();
        let digest = ContentDigest::sha256_of(b"blob");
        let url = client
            .upload_url("/v2/lib/x/blobs/uploads/uuid-1?_state=abc", &digest)
            .unwrap();
        assert_eq!(url.path(), "/v2/lib/x/blobs/uploads/uuid-1");
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].1, digest.as_str());
    }

    #[test]
    fn test_upload_url_absolute_location() {
        let client = RegistryClient::new(RegistryConfig::new("http://localhost:5000")).unwrap();
        let digest = ContentDigest::sha256_of(b"blob");
        let url = client
            .upload_url("https://storage.example.com/upload/1", &digest)
            .unwrap();
        assert_eq!(url.host_str(), Some("storage.example.com"));
    }
}

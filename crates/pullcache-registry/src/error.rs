//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// Manifest not found in registry.
    #[error("Manifest not found: {repository}:{reference}")]
    ManifestNotFound {
        /// Repository name.
        repository: String,
        /// Tag or digest.
        reference: String,
    },

    /// Blob not found in registry.
    #[error("Blob not found: {repository}@{digest}")]
    BlobNotFound {
        /// Repository name.
        repository: String,
        /// Blob digest.
        digest: String,
    },

    /// No registry record exists for the id.
    #[error("Registry {id} is not configured")]
    RegistryNotFound {
        /// Registry id.
        id: i64,
    },

    /// Registry returned content the adapter could not interpret.
    #[error("Invalid response from registry: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// Invalid client TLS material.
    #[error("Invalid TLS configuration: {message}")]
    InvalidTls {
        /// Error message.
        message: String,
    },

    /// Blob upload failed.
    #[error("Failed to upload blob {digest}: {message}")]
    UploadFailed {
        /// Blob digest.
        digest: String,
        /// Error message.
        message: String,
    },

    /// Manifest push failed.
    #[error("Failed to push manifest for {repository}:{reference}: {message}")]
    ManifestPushFailed {
        /// Repository name.
        repository: String,
        /// Tag or digest.
        reference: String,
        /// Error message.
        message: String,
    },

    /// Model error (bad digest, undecodable manifest).
    #[error(transparent)]
    Core(#[from] pullcache_core::CoreError),
}

impl RegistryError {
    /// Returns true if the error means the content does not exist upstream.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound { .. } | Self::BlobNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}

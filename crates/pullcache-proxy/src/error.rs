//! Error types for the proxy crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur while fetching from an origin or caching locally.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Registry adapter or transport failure.
    #[error(transparent)]
    Registry(#[from] pullcache_registry::RegistryError),

    /// Model error.
    #[error(transparent)]
    Core(#[from] pullcache_core::CoreError),

    /// The project is not a proxy cache project.
    #[error("project '{project}' has no upstream registry")]
    NotProxyProject {
        /// Project name.
        project: String,
    },

    /// Writing fetched content to the destination failed.
    #[error("failed to write blob {digest}: {source}")]
    Write {
        /// Blob digest.
        digest: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A value cannot be sent as an HTTP header.
    #[error("invalid header value: {value:?}")]
    InvalidHeader {
        /// Offending value.
        value: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalidity.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigRead {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration {path}: {source}")]
    ConfigParse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },
}

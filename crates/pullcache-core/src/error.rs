//! Error types for the pullcache data model.
//!
//! This module defines the error types used throughout the `pullcache-core` crate.

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while parsing or building model values.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A content digest string was malformed.
    #[error("Invalid digest '{digest}': {reason}")]
    InvalidDigest {
        /// The rejected digest string.
        digest: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A manifest payload could not be decoded.
    #[error("Invalid manifest ({media_type}): {reason}")]
    InvalidManifest {
        /// Declared media type of the payload.
        media_type: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A platform string such as `linux/arm64/v8` could not be parsed.
    #[error("Invalid platform '{platform}': expected os/architecture[/variant]")]
    InvalidPlatform {
        /// The rejected platform string.
        platform: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json { source: err }
    }
}

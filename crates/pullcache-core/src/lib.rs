//! # pullcache core
//!
//! Data model shared by the pullcache registry proxy.
//!
//! This crate provides the content-addressed value types the rest of the
//! workspace passes around:
//!
//! - [`ContentDigest`] - validated `algorithm:encoded` digest
//! - [`Descriptor`] / [`Platform`] - references to blobs and sub-manifests
//! - [`Manifest`] - single-platform manifest or multi-platform list, with its
//!   original payload
//! - [`ArtifactInfo`] / [`ArtifactKey`] - what is being cached and how
//!   concurrent caching is deduplicated
//! - [`Project`] - project records binding repositories to an upstream
//!
//! ## Example
//!
//! ```rust
//! use pullcache_core::{ArtifactInfo, ContentDigest};
//!
//! let artifact = ArtifactInfo::new("dockerhub", "dockerhub/library/alpine")
//!     .with_tag("3.20")
//!     .with_digest(ContentDigest::sha256_of(b"manifest"));
//!
//! assert_eq!(artifact.key().as_str(), "dockerhub/library/alpine:3.20");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod media_type;
pub mod project;
pub mod reference;

#[cfg(test)]
mod proptest_tests;

// Re-export main types at crate root
pub use artifact::{ArtifactInfo, ArtifactKey, DEFAULT_TAG};
pub use descriptor::{Descriptor, Platform};
pub use digest::{ContentDigest, DigestHasher};
pub use error::{CoreError, Result};
pub use manifest::{ImageManifest, Manifest, ManifestKind, ManifestList};
pub use media_type::MediaType;
pub use project::Project;
pub use reference::{parse_blob_digest, parse_repository, trim_proxy_prefix};

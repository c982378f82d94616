//! Media types understood by the proxy.

use serde::{Deserialize, Serialize};

/// A manifest or blob media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// Docker image manifest, schema 2.
    pub const DOCKER_MANIFEST: &'static str =
        "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker manifest list (multi-architecture).
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Docker container image config.
    pub const DOCKER_CONFIG: &'static str = "application/vnd.docker.container.image.v1+json";

    /// Docker gzip layer.
    pub const DOCKER_LAYER: &'static str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

    /// OCI image manifest.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// OCI image config.
    pub const OCI_CONFIG: &'static str = "application/vnd.oci.image.config.v1+json";

    /// OCI gzip layer.
    pub const OCI_LAYER: &'static str = "application/vnd.oci.image.layer.v1.tar+gzip";

    /// Generic binary content.
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Manifest types sent in the `Accept` header when pulling.
    pub const MANIFEST_ACCEPT: [&'static str; 4] = [
        Self::OCI_INDEX,
        Self::DOCKER_MANIFEST_LIST,
        Self::OCI_MANIFEST,
        Self::DOCKER_MANIFEST,
    ];

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for multi-platform manifest types (Docker list or OCI index).
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::MediaType;
    ///
    /// assert!(MediaType::docker_manifest_list().is_manifest_list());
    /// assert!(!MediaType::oci_manifest().is_manifest_list());
    /// ```
    #[must_use]
    pub fn is_manifest_list(&self) -> bool {
        matches!(
            self.essence(),
            Self::DOCKER_MANIFEST_LIST | Self::OCI_INDEX
        )
    }

    /// Returns true for single-platform image manifest types.
    #[must_use]
    pub fn is_image_manifest(&self) -> bool {
        matches!(self.essence(), Self::DOCKER_MANIFEST | Self::OCI_MANIFEST)
    }

    /// The media type without parameters such as `; charset=utf-8`.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.0.split(';').next().unwrap_or_default().trim()
    }

    /// Creates the Docker manifest list media type.
    #[must_use]
    pub fn docker_manifest_list() -> Self {
        Self::new(Self::DOCKER_MANIFEST_LIST)
    }

    /// Creates the Docker image manifest media type.
    #[must_use]
    pub fn docker_manifest() -> Self {
        Self::new(Self::DOCKER_MANIFEST)
    }

    /// Creates the OCI image manifest media type.
    #[must_use]
    pub fn oci_manifest() -> Self {
        Self::new(Self::OCI_MANIFEST)
    }

    /// Creates the OCI image index media type.
    #[must_use]
    pub fn oci_index() -> Self {
        Self::new(Self::OCI_INDEX)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

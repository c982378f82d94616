//! Content descriptors and platforms.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::CoreError;
use crate::media_type::MediaType;

/// OCI content descriptor.
///
/// A descriptor describes the disposition of targeted content. It includes
/// the type of the content, a content identifier (digest), and the byte-size
/// of the raw content. Entries of a manifest list additionally carry the
/// platform they were built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content.
    pub digest: ContentDigest,

    /// Size in bytes of the content.
    pub size: u64,

    /// Optional URLs for alternative locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,

    /// Optional annotations (key-value metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,

    /// Platform of a manifest-list entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Artifact type of the referenced manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Embedded content, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Descriptor {
    /// Creates a new descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::{ContentDigest, Descriptor, MediaType};
    ///
    /// let desc = Descriptor::new(
    ///     MediaType::new(MediaType::OCI_LAYER),
    ///     ContentDigest::sha256_of(b"layer"),
    ///     5,
    /// );
    /// assert_eq!(desc.size, 5);
    /// ```
    #[must_use]
    pub const fn new(media_type: MediaType, digest: ContentDigest, size: u64) -> Self {
        Self {
            media_type,
            digest,
            size,
            urls: None,
            annotations: None,
            platform: None,
            artifact_type: None,
            data: None,
        }
    }

    /// Attaches a platform to the descriptor.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns true if this entry was built for exactly the given platform.
    ///
    /// Comparison is case-sensitive. A missing variant compares as `""`
    /// and descriptors without a platform never match.
    #[must_use]
    pub fn matches_platform(&self, os: &str, architecture: &str, variant: &str) -> bool {
        self.platform.as_ref().is_some_and(|p| {
            p.os == os && p.architecture == architecture && p.variant_str() == variant
        })
    }
}

/// The platform a manifest-list entry targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// CPU architecture (e.g. `amd64`, `arm64`).
    pub architecture: String,

    /// Operating system (e.g. `linux`, `windows`).
    pub os: String,

    /// Architecture variant (e.g. `v8`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Operating system version.
    #[serde(rename = "os.version", default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,

    /// Required operating system features.
    #[serde(rename = "os.features", default, skip_serializing_if = "Option::is_none")]
    pub os_features: Option<Vec<String>>,
}

impl Platform {
    /// Creates a platform with an optional variant.
    #[must_use]
    pub fn new(os: impl Into<String>, architecture: impl Into<String>, variant: &str) -> Self {
        Self {
            architecture: architecture.into(),
            os: os.into(),
            variant: (!variant.is_empty()).then(|| variant.to_string()),
            os_version: None,
            os_features: None,
        }
    }

    /// The variant, or `""` when absent.
    #[must_use]
    pub fn variant_str(&self) -> &str {
        self.variant.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    /// Parses `os/architecture[/variant]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self::new(*os, *arch, "")),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Ok(Self::new(*os, *arch, variant))
            }
            _ => Err(CoreError::InvalidPlatform {
                platform: s.to_string(),
            }),
        }
    }
}

//! Image manifests and manifest lists.
//!
//! A [`Manifest`] keeps the exact bytes it was decoded from so pushing it to
//! another registry reproduces the same content digest. Manifests built
//! locally (for example a filtered list) are serialized once on construction.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::digest::ContentDigest;
use crate::error::{CoreError, Result};
use crate::media_type::MediaType;

/// Single-platform image manifest (Docker schema 2 or OCI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Artifact type, for non-image artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Image configuration blob.
    pub config: Descriptor,

    /// Layers that make up the image.
    #[serde(default)]
    pub layers: Vec<Descriptor>,

    /// Optional subject descriptor for the referrers API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

/// Multi-platform manifest list (Docker manifest list or OCI index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestList {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Artifact type of the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Per-platform entries.
    #[serde(default)]
    pub manifests: Vec<Descriptor>,

    /// Optional subject descriptor for the referrers API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

impl ManifestList {
    /// Creates a list of the given media type from entries.
    #[must_use]
    pub fn new(media_type: MediaType, manifests: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(media_type),
            artifact_type: None,
            manifests,
            subject: None,
            annotations: None,
        }
    }

    /// Returns a new list keeping only entries whose platform matches
    /// `os`, `architecture` and `variant` exactly. Entry order is preserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::{ContentDigest, Descriptor, ManifestList, MediaType, Platform};
    ///
    /// let entry = |data: &[u8], platform: &str| {
    ///     Descriptor::new(MediaType::docker_manifest(), ContentDigest::sha256_of(data), 1)
    ///         .with_platform(platform.parse().unwrap())
    /// };
    /// let list = ManifestList::new(
    ///     MediaType::docker_manifest_list(),
    ///     vec![entry(b"a", "linux/amd64"), entry(b"b", "linux/arm64/v8")],
    /// );
    ///
    /// let arm = list.select_platform("linux", "arm64", "v8");
    /// assert_eq!(arm.manifests.len(), 1);
    /// assert_eq!(arm.manifests[0].digest, ContentDigest::sha256_of(b"b"));
    /// ```
    #[must_use]
    pub fn select_platform(&self, os: &str, architecture: &str, variant: &str) -> Self {
        self.retain_entries(|d| d.matches_platform(os, architecture, variant))
    }

    /// Returns a new list with only the entries accepted by `keep`.
    #[must_use]
    pub fn retain_entries(&self, mut keep: impl FnMut(&Descriptor) -> bool) -> Self {
        Self {
            schema_version: self.schema_version,
            media_type: self.media_type.clone(),
            artifact_type: self.artifact_type.clone(),
            manifests: self.manifests.iter().filter(|d| keep(*d)).cloned().collect(),
            subject: self.subject.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

/// Decoded manifest body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    /// Single-platform image manifest.
    Single(ImageManifest),
    /// Multi-platform manifest list.
    List(ManifestList),
}

/// A manifest together with its media type and original payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    media_type: MediaType,
    payload: Bytes,
    kind: ManifestKind,
}

impl Manifest {
    /// Decodes a manifest payload.
    ///
    /// The declared media type selects the decoder. When it is neither a
    /// list nor an image manifest type the payload's own `mediaType` field,
    /// then the presence of a `manifests` array, decides.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidManifest`] if the payload does not decode.
    pub fn parse(media_type: MediaType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let invalid = |reason: String| CoreError::InvalidManifest {
            media_type: media_type.to_string(),
            reason,
        };

        let is_list = if media_type.is_manifest_list() {
            true
        } else if media_type.is_image_manifest() {
            false
        } else {
            let probe: serde_json::Value =
                serde_json::from_slice(&payload).map_err(|e| invalid(e.to_string()))?;
            let embedded = probe
                .get("mediaType")
                .and_then(serde_json::Value::as_str)
                .map(MediaType::new);
            match embedded {
                Some(mt) if mt.is_manifest_list() => true,
                Some(mt) if mt.is_image_manifest() => false,
                _ => probe.get("manifests").is_some_and(serde_json::Value::is_array),
            }
        };

        let kind = if is_list {
            ManifestKind::List(serde_json::from_slice(&payload).map_err(|e| invalid(e.to_string()))?)
        } else {
            ManifestKind::Single(
                serde_json::from_slice(&payload).map_err(|e| invalid(e.to_string()))?,
            )
        };

        Ok(Self {
            media_type,
            payload,
            kind,
        })
    }

    /// Builds a manifest from a list, serializing it as the payload.
    ///
    /// The media type is the list's own `mediaType`, or the Docker manifest
    /// list type when the body has none.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn from_list(list: ManifestList) -> Result<Self> {
        let media_type = list
            .media_type
            .clone()
            .unwrap_or_else(MediaType::docker_manifest_list);
        Self::from_list_with_media_type(list, media_type)
    }

    /// Builds a manifest from a list served under `media_type`.
    ///
    /// OCI indexes may omit `mediaType` from the body, so a list derived from
    /// a fetched manifest should carry that manifest's media type.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn from_list_with_media_type(list: ManifestList, media_type: MediaType) -> Result<Self> {
        let payload = Bytes::from(serde_json::to_vec(&list)?);
        Ok(Self {
            media_type,
            payload,
            kind: ManifestKind::List(list),
        })
    }

    /// Builds a manifest from an image manifest, serializing it as the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn from_image(image: ImageManifest) -> Result<Self> {
        let media_type = image
            .media_type
            .clone()
            .unwrap_or_else(MediaType::oci_manifest);
        let payload = Bytes::from(serde_json::to_vec(&image)?);
        Ok(Self {
            media_type,
            payload,
            kind: ManifestKind::Single(image),
        })
    }

    /// The descriptors a registry client needs to resolve this manifest.
    ///
    /// For an image manifest this is the config followed by the layers;
    /// for a list it is every entry.
    #[must_use]
    pub fn references(&self) -> Vec<&Descriptor> {
        match &self.kind {
            ManifestKind::Single(image) => std::iter::once(&image.config)
                .chain(image.layers.iter())
                .collect(),
            ManifestKind::List(list) => list.manifests.iter().collect(),
        }
    }

    /// Media type the manifest was served or built with.
    #[must_use]
    pub const fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Raw payload bytes.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decoded body.
    #[must_use]
    pub const fn kind(&self) -> &ManifestKind {
        &self.kind
    }

    /// Returns the list body, if this is a manifest list.
    #[must_use]
    pub const fn as_list(&self) -> Option<&ManifestList> {
        match &self.kind {
            ManifestKind::List(list) => Some(list),
            ManifestKind::Single(_) => None,
        }
    }

    /// Returns true if this is a manifest list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self.kind, ManifestKind::List(_))
    }

    /// SHA-256 digest of the payload.
    #[must_use]
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::sha256_of(&self.payload)
    }

    /// Descriptor of this manifest as it would appear in a list.
    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::new(
            self.media_type.clone(),
            self.digest(),
            self.payload.len() as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Platform;

    fn digest(seed: &str) -> ContentDigest {
        ContentDigest::sha256_of(seed.as_bytes())
    }

    fn image_payload() -> String {
        format!(
            r#"{{
                "schemaVersion": 2,
                "mediaType": "{mt}",
                "config": {{"mediaType": "{cfg}", "digest": "{c}", "size": 7023}},
                "layers": [
                    {{"mediaType": "{layer}", "digest": "{l1}", "size": 32654}},
                    {{"mediaType": "{layer}", "digest": "{l2}", "size": 16724}}
                ]
            }}"#,
            mt = MediaType::DOCKER_MANIFEST,
            cfg = MediaType::DOCKER_CONFIG,
            layer = MediaType::DOCKER_LAYER,
            c = digest("config"),
            l1 = digest("layer1"),
            l2 = digest("layer2"),
        )
    }

    fn list_payload() -> String {
        format!(
            r#"{{
                "schemaVersion": 2,
                "mediaType": "{mt}",
                "manifests": [
                    {{"mediaType": "{m}", "digest": "{d1}", "size": 7143,
                      "platform": {{"architecture": "amd64", "os": "linux"}}}},
                    {{"mediaType": "{m}", "digest": "{d2}", "size": 7682,
                      "platform": {{"architecture": "arm64", "os": "linux", "variant": "v8"}}}}
                ]
            }}"#,
            mt = MediaType::DOCKER_MANIFEST_LIST,
            m = MediaType::DOCKER_MANIFEST,
            d1 = digest("amd64"),
            d2 = digest("arm64"),
        )
    }

    #[test]
    fn test_parse_image_manifest_references_config_first() {
        let manifest =
            Manifest::parse(MediaType::docker_manifest(), image_payload().into_bytes()).unwrap();
        let refs: Vec<_> = manifest.references().iter().map(|d| d.digest.clone()).collect();
        assert_eq!(refs, vec![digest("config"), digest("layer1"), digest("layer2")]);
        assert!(!manifest.is_list());
    }

    #[test]
    fn test_parse_list_references_entries() {
        let manifest =
            Manifest::parse(MediaType::docker_manifest_list(), list_payload().into_bytes())
                .unwrap();
        assert!(manifest.is_list());
        let refs: Vec<_> = manifest.references().iter().map(|d| d.digest.clone()).collect();
        assert_eq!(refs, vec![digest("amd64"), digest("arm64")]);
    }

    #[test]
    fn test_parse_keeps_original_payload() {
        let raw = list_payload().into_bytes();
        let manifest = Manifest::parse(MediaType::docker_manifest_list(), raw.clone()).unwrap();
        assert_eq!(manifest.payload().as_ref(), raw.as_slice());
        assert_eq!(manifest.digest(), ContentDigest::sha256_of(&raw));
    }

    #[test]
    fn test_parse_sniffs_unknown_media_type() {
        let manifest =
            Manifest::parse(MediaType::new("application/json"), list_payload().into_bytes())
                .unwrap();
        assert!(manifest.is_list());

        let manifest =
            Manifest::parse(MediaType::new("application/json"), image_payload().into_bytes())
                .unwrap();
        assert!(!manifest.is_list());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Manifest::parse(MediaType::oci_manifest(), b"not json".to_vec()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidManifest { .. }));
    }

    #[test]
    fn test_empty_image_has_config_reference_only() {
        let config = Descriptor::new(MediaType::new(MediaType::OCI_CONFIG), digest("cfg"), 2);
        let image = ImageManifest {
            schema_version: 2,
            media_type: Some(MediaType::oci_manifest()),
            artifact_type: None,
            config,
            layers: vec![],
            subject: None,
            annotations: None,
        };
        let manifest = Manifest::from_image(image).unwrap();
        assert_eq!(manifest.references().len(), 1);
    }

    #[test]
    fn test_from_list_round_trips_through_parse() {
        let list = ManifestList::new(
            MediaType::oci_index(),
            vec![Descriptor::new(MediaType::oci_manifest(), digest("a"), 1)
                .with_platform(Platform::new("linux", "amd64", ""))],
        );
        let built = Manifest::from_list(list.clone()).unwrap();
        let parsed = Manifest::parse(MediaType::oci_index(), built.payload().clone()).unwrap();
        assert_eq!(parsed.as_list(), Some(&list));
        assert_eq!(parsed.digest(), built.digest());
    }

    #[test]
    fn test_select_platform_preserves_order_and_metadata() {
        let manifest =
            Manifest::parse(MediaType::docker_manifest_list(), list_payload().into_bytes())
                .unwrap();
        let list = manifest.as_list().unwrap();
        let selected = list.select_platform("linux", "amd64", "");
        assert_eq!(selected.manifests.len(), 1);
        assert_eq!(selected.manifests[0].digest, digest("amd64"));
        assert_eq!(selected.media_type, list.media_type);
        assert!(list.select_platform("linux", "s390x", "").manifests.is_empty());
    }

    #[test]
    fn test_oci_index_without_body_media_type_keeps_served_type() {
        let raw = format!(
            r#"{{
                "schemaVersion": 2,
                "artifactType": "application/vnd.example.bundle",
                "manifests": [
                    {{"mediaType": "{m}", "digest": "{d1}", "size": 10,
                      "artifactType": "application/vnd.example.sbom",
                      "data": "e30=",
                      "platform": {{"architecture": "amd64", "os": "linux"}}}}
                ],
                "subject": {{"mediaType": "{m}", "digest": "{s}", "size": 3}}
            }}"#,
            m = MediaType::OCI_MANIFEST,
            d1 = digest("amd64"),
            s = digest("subject"),
        );
        let manifest = Manifest::parse(MediaType::oci_index(), raw.into_bytes()).unwrap();
        let list = manifest.as_list().unwrap();
        assert!(list.media_type.is_none());

        let rebuilt = Manifest::from_list_with_media_type(
            list.retain_entries(|_| true),
            manifest.media_type().clone(),
        )
        .unwrap();
        assert_eq!(rebuilt.media_type(), &MediaType::oci_index());

        let reparsed = Manifest::parse(MediaType::oci_index(), rebuilt.payload().clone()).unwrap();
        let reparsed = reparsed.as_list().unwrap();
        assert_eq!(reparsed.artifact_type.as_deref(), Some("application/vnd.example.bundle"));
        assert_eq!(reparsed.subject.as_ref().map(|d| &d.digest), Some(&digest("subject")));
        let entry = &reparsed.manifests[0];
        assert_eq!(entry.artifact_type.as_deref(), Some("application/vnd.example.sbom"));
        assert_eq!(entry.data.as_deref(), Some("e30="));
    }

    #[test]
    fn test_descriptor_of_manifest() {
        let manifest =
            Manifest::parse(MediaType::docker_manifest(), image_payload().into_bytes()).unwrap();
        let desc = manifest.descriptor();
        assert_eq!(desc.size, manifest.payload().len() as u64);
        assert_eq!(desc.digest, manifest.digest());
    }
}

//! Artifact identity used while caching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;

/// Tag used when a request names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// Key that deduplicates concurrent caching of the same artifact.
///
/// Formed as `repository:tag`. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Builds a key from a repository and a tag (or digest string).
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::ArtifactKey;
    ///
    /// assert_eq!(ArtifactKey::new("lib/x", "1.0").as_str(), "lib/x:1.0");
    /// ```
    #[must_use]
    pub fn new(repository: &str, tag: &str) -> Self {
        Self(format!("{repository}:{tag}"))
    }

    /// Returns the key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the artifact being cached.
///
/// Supplied by the request path; the cache only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    /// Name of the proxy cache project.
    pub project_name: String,

    /// Full local repository name, including the project prefix.
    pub repository: String,

    /// Digest of the artifact, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,

    /// Tag the client asked for, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ArtifactInfo {
    /// Creates artifact info for a repository inside a project.
    #[must_use]
    pub fn new(project_name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            repository: repository.into(),
            digest: None,
            tag: None,
        }
    }

    /// Sets the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: ContentDigest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// The tag, falling back to the digest, then to [`DEFAULT_TAG`].
    #[must_use]
    pub fn reference(&self) -> &str {
        self.tag
            .as_deref()
            .or_else(|| self.digest.as_ref().map(ContentDigest::as_str))
            .unwrap_or(DEFAULT_TAG)
    }

    /// Deduplication key for this artifact.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::ArtifactInfo;
    ///
    /// let art = ArtifactInfo::new("proxy", "lib/x").with_tag("1.0");
    /// assert_eq!(art.key().as_str(), "lib/x:1.0");
    /// ```
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.repository, self.reference())
    }
}

//! Project records.
//!
//! A project groups repositories. Projects bound to an upstream registry act
//! as pull-through caches for it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key marking a project as publicly readable.
pub const METADATA_PUBLIC: &str = "public";

/// A project record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub project_id: i64,

    /// Project name, also the first path segment of its repositories.
    pub name: String,

    /// Upstream registry this project proxies (`0` for none).
    #[serde(default)]
    pub registry_id: i64,

    /// Free-form project metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Project {
    /// Creates a project with no upstream registry.
    #[must_use]
    pub fn new(project_id: i64, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Binds the project to an upstream registry.
    #[must_use]
    pub const fn with_registry(mut self, registry_id: i64) -> Self {
        self.registry_id = registry_id;
        self
    }

    /// Returns true if the project is a pull-through cache.
    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        self.registry_id > 0
    }

    /// Returns the upstream registry id, if any.
    #[must_use]
    pub const fn proxy_registry_id(&self) -> Option<i64> {
        if self.is_proxy() {
            Some(self.registry_id)
        } else {
            None
        }
    }

    /// Looks up a metadata value.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Sets a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Returns true if the `public` metadata is `true` or `1`.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.get_metadata(METADATA_PUBLIC).is_some_and(is_true)
    }

    /// Full local name of a repository inside this project.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::Project;
    ///
    /// let project = Project::new(3, "dockerhub");
    /// assert_eq!(project.repository_name("library/alpine"), "dockerhub/library/alpine");
    /// ```
    #[must_use]
    pub fn repository_name(&self, repository: &str) -> String {
        format!("{}/{repository}", self.name)
    }
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

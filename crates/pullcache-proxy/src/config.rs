//! Configuration for the pull-through cache.
//!
//! The configuration is usually read from a YAML file:
//!
//! ```yaml
//! core_url: http://core:8080
//! storage_root: /storage
//! max_concurrent_tasks: 64
//! wait:
//!   max_attempts: 10
//!   interval_secs: 10
//! registries:
//!   - id: 1
//!     name: docker-hub
//!     url: https://registry-1.docker.io
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pullcache_registry::RegistryRecord;

use crate::error::{ProxyError, Result};
use crate::policy::WaitPolicy;

/// Configuration for the pull-through cache.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// URL of the local registry core.
    pub core_url: String,

    /// Secret the local registry accepts from this service.
    #[serde(skip_serializing)]
    pub service_secret: String,

    /// Filesystem root of the local registry storage.
    pub storage_root: PathBuf,

    /// Maximum caching tasks running at once (0 = unbounded).
    pub max_concurrent_tasks: usize,

    /// Timeout for each registry request, in seconds.
    pub request_timeout_secs: u64,

    /// Dependency wait policy.
    pub wait: WaitPolicy,

    /// Upstream registries proxy projects may point at.
    pub registries: Vec<RegistryRecord>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("core_url", &self.core_url)
            .field("storage_root", &self.storage_root)
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("wait", &self.wait)
            .field("registries", &self.registries)
            .finish_non_exhaustive()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            core_url: "http://localhost:8080".to_string(),
            service_secret: String::new(),
            storage_root: PathBuf::from("/storage"),
            max_concurrent_tasks: 0,
            request_timeout_secs: 30,
            wait: WaitPolicy::default(),
            registries: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Loads and validates a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ProxyError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| ProxyError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.core_url.trim().is_empty() {
            return Err(ProxyError::InvalidConfig {
                reason: "core_url must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ProxyError::InvalidConfig {
                reason: "request_timeout_secs must be positive".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for registry in &self.registries {
            if !seen.insert(registry.id) {
                return Err(ProxyError::InvalidConfig {
                    reason: format!("registry id {} is listed twice", registry.id),
                });
            }
        }
        Ok(())
    }

    /// Timeout for each registry request.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for `ProxyConfig`.
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    core_url: Option<String>,
    service_secret: Option<String>,
    storage_root: Option<PathBuf>,
    max_concurrent_tasks: Option<usize>,
    request_timeout_secs: Option<u64>,
    wait: Option<WaitPolicy>,
    registries: Vec<RegistryRecord>,
}

impl ProxyConfigBuilder {
    /// Sets the local registry URL.
    pub fn core_url(mut self, url: impl Into<String>) -> Self {
        self.core_url = Some(url.into());
        self
    }

    /// Sets the service secret.
    pub fn service_secret(mut self, secret: impl Into<String>) -> Self {
        self.service_secret = Some(secret.into());
        self
    }

    /// Sets the storage root.
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Sets the task limit.
    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = Some(max);
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Sets the wait policy.
    pub fn wait(mut self, policy: WaitPolicy) -> Self {
        self.wait = Some(policy);
        self
    }

    /// Adds an upstream registry.
    pub fn registry(mut self, record: RegistryRecord) -> Self {
        self.registries.push(record);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ProxyConfig {
        let defaults = ProxyConfig::default();
        ProxyConfig {
            core_url: self.core_url.unwrap_or(defaults.core_url),
            service_secret: self.service_secret.unwrap_or(defaults.service_secret),
            storage_root: self.storage_root.unwrap_or(defaults.storage_root),
            max_concurrent_tasks: self
                .max_concurrent_tasks
                .unwrap_or(defaults.max_concurrent_tasks),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            wait: self.wait.unwrap_or(defaults.wait),
            registries: self.registries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn record(id: i64) -> RegistryRecord {
        RegistryRecord {
            id,
            name: String::new(),
            url: "https://ghcr.io".to_string(),
            credential: None,
            insecure: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.max_concurrent_tasks, 0);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ProxyConfig::builder()
            .core_url("http://core")
            .service_secret("s")
            .max_concurrent_tasks(4)
            .registry(record(1))
            .build();
        assert_eq!(config.core_url, "http://core");
        assert_eq!(config.max_concurrent_tasks, 4);
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.wait, WaitPolicy::default());
    }

    #[test]
    fn test_duplicate_registry_rejected() {
        let config = ProxyConfig::builder()
            .registry(record(1))
            .registry(record(1))
            .build();
        assert!(matches!(
            config.validate(),
            Err(ProxyError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "core_url: http://core:8080\nservice_secret: abc\nwait:\n  max_attempts: 3\nregistries:\n  - id: 2\n    url: https://quay.io"
        )
        .unwrap();

        let config = ProxyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service_secret, "abc");
        assert_eq!(config.wait.max_attempts, 3);
        assert_eq!(config.wait.interval_secs, 10);
        assert_eq!(config.registries[0].id, 2);
    }

    #[test]
    fn test_from_file_missing() {
        let result = ProxyConfig::from_file("/nonexistent/pullcache.yaml");
        assert!(matches!(result, Err(ProxyError::ConfigRead { .. })));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = ProxyConfig::builder().service_secret("hunter2").build();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

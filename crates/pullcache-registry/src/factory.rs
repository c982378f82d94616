//! Construction of adapters for the local registry and for upstreams.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::adapter::RegistryAdapter;
use crate::client::RegistryClient;
use crate::config::{RegistryAuth, RegistryConfig};
use crate::error::{RegistryError, Result};
use crate::metadata::RegistryMetadataLookup;

/// Produces registry adapters on demand.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Adapter for the local registry, authenticated with the service secret.
    async fn local_adapter(&self) -> Result<Box<dyn RegistryAdapter>>;

    /// Adapter for the upstream registry with the given id.
    async fn origin_adapter(&self, registry_id: i64) -> Result<Box<dyn RegistryAdapter>>;
}

/// Factory building HTTP [`RegistryClient`]s.
pub struct HttpAdapterFactory {
    core_url: String,
    service_secret: String,
    lookup: Arc<dyn RegistryMetadataLookup>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpAdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapterFactory")
            .field("core_url", &self.core_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpAdapterFactory {
    /// Creates a factory for the local registry at `core_url`.
    #[must_use]
    pub fn new(
        core_url: impl Into<String>,
        service_secret: impl Into<String>,
        lookup: Arc<dyn RegistryMetadataLookup>,
    ) -> Self {
        Self {
            core_url: core_url.into(),
            service_secret: service_secret.into(),
            lookup,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout applied to every adapter.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Local registry URL.
    #[must_use]
    pub fn core_url(&self) -> &str {
        &self.core_url
    }
}

const fn auth_kind(auth: &RegistryAuth) -> &'static str {
    match auth {
        RegistryAuth::None => "anonymous",
        RegistryAuth::Basic { .. } => "basic",
        RegistryAuth::Bearer { .. } => "bearer",
        RegistryAuth::Secret { .. } => "secret",
    }
}

#[async_trait]
impl AdapterFactory for HttpAdapterFactory {
    async fn local_adapter(&self) -> Result<Box<dyn RegistryAdapter>> {
        if self.core_url.is_empty() {
            return Err(RegistryError::InvalidUrl {
                url: self.core_url.clone(),
            });
        }

        let config = RegistryConfig::new(&self.core_url)
            .with_auth(RegistryAuth::secret(self.service_secret.clone()))
            .with_timeout(self.timeout);
        debug!(url = %config.url, "Creating local registry adapter");

        Ok(Box::new(RegistryClient::new(config)?))
    }

    async fn origin_adapter(&self, registry_id: i64) -> Result<Box<dyn RegistryAdapter>> {
        let record = self.lookup.get_registry(registry_id).await?;
        let config = record.to_config().with_timeout(self.timeout);
        debug!(
            registry_id,
            url = %config.url,
            auth = auth_kind(&config.auth),
            "Creating upstream registry adapter"
        );

        Ok(Box::new(RegistryClient::new(config)?))
    }
}

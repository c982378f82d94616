//! Upstream registry records and their lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{RegistryAuth, RegistryConfig, TlsConfig};
use crate::error::{RegistryError, Result};

/// Kind of credential stored for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Username and password.
    Basic,
    /// Static bearer token in `access_secret`.
    OAuth,
    /// Shared service secret in `access_secret`.
    Secret,
}

/// Credential for an upstream registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential kind.
    #[serde(rename = "type")]
    pub kind: CredentialType,

    /// Username or key id (unused for tokens and secrets).
    #[serde(default)]
    pub access_key: String,

    /// Password, token or secret.
    pub access_secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    /// Converts the credential into adapter authentication.
    #[must_use]
    pub fn to_auth(&self) -> RegistryAuth {
        match self.kind {
            CredentialType::Basic => {
                RegistryAuth::basic(self.access_key.clone(), self.access_secret.clone())
            }
            CredentialType::OAuth => RegistryAuth::bearer(self.access_secret.clone()),
            CredentialType::Secret => RegistryAuth::secret(self.access_secret.clone()),
        }
    }
}

/// Connection metadata for an upstream registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Registry identifier referenced by proxy projects.
    pub id: i64,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Endpoint URL.
    pub url: String,

    /// Credential, if the registry requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
}

impl RegistryRecord {
    /// Builds the adapter configuration for this registry.
    #[must_use]
    pub fn to_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::new(&self.url);
        if let Some(credential) = &self.credential {
            config = config.with_auth(credential.to_auth());
        }
        if self.insecure {
            config = config.with_tls(TlsConfig::new().insecure());
        }
        config
    }
}

/// Source of registry connection metadata.
#[async_trait]
pub trait RegistryMetadataLookup: Send + Sync {
    /// Returns the record for a registry id.
    async fn get_registry(&self, id: i64) -> Result<RegistryRecord>;
}

/// In-memory registry store, usually filled from configuration.
#[derive(Debug, Default)]
pub struct StaticRegistryStore {
    records: RwLock<HashMap<i64, RegistryRecord>>,
}

impl StaticRegistryStore {
    /// Creates a store holding the given records.
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = RegistryRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    /// Adds or replaces a record.
    pub fn upsert(&self, record: RegistryRecord) {
        self.records.write().insert(record.id, record);
    }

    /// Removes a record, returning it if present.
    pub fn remove(&self, id: i64) -> Option<RegistryRecord> {
        self.records.write().remove(&id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RegistryMetadataLookup for StaticRegistryStore {
    async fn get_registry(&self, id: i64) -> Result<RegistryRecord> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::RegistryNotFound { id })
    }
}

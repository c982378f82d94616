//! # Pullcache Registry
//!
//! Registry access for the pull-through cache.
//!
//! This crate provides the adapter contract the cache drives, an HTTP
//! implementation of it for OCI distribution endpoints, and the factory that
//! hands out adapters for the local registry and for configured upstreams.
//!
//! ## Features
//!
//! - **OCI Distribution API**: manifest and blob pull, monolithic blob push,
//!   manifest push and `HEAD` existence probes
//! - **Multiple Auth Methods**: Basic, Bearer token and the service secret
//!   the local registry accepts from trusted components
//! - **Local Blob Index**: existence checks against filesystem blob storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pullcache_registry::{AdapterFactory, HttpAdapterFactory, StaticRegistryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(StaticRegistryStore::default());
//!     let factory = HttpAdapterFactory::new("http://core:8080", "secret", store);
//!
//!     let local = factory.local_adapter().await?;
//!     let (manifest, digest) = local.pull_manifest("library/alpine", "3.20").await?;
//!     println!("{digest}: {}", manifest.media_type());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AdapterFactory                           │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────────┐  │
//! │  │ local core  │  │ metadata lookup │  │ RegistryClient  │  │
//! │  │ (secret)    │  │ (registry id)   │  │ (HTTP)          │  │
//! │  └─────────────┘  └─────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Local registry / upstream registries           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]

mod adapter;
mod client;
mod config;
mod error;
mod factory;
mod metadata;
mod storage;

pub use adapter::{BlobExistence, BlobStream, RegistryAdapter};
pub use client::{RegistryClient, DOCKER_CONTENT_DIGEST};
pub use config::{RegistryAuth, RegistryConfig, TlsConfig, SECRET_AUTH_SCHEME};
pub use error::{RegistryError, Result};
pub use factory::{AdapterFactory, HttpAdapterFactory};
pub use metadata::{
    Credential, CredentialType, RegistryMetadataLookup, RegistryRecord, StaticRegistryStore,
};
pub use storage::StorageBlobIndex;

//! Persistence traits for the vault.
//!
//! The metadata record is kept apart from the application's key-value
//! storage, which holds the six domain blobs, the biometric escrow entry and
//! any legacy plaintext records awaiting migration.

use async_trait::async_trait;

use crate::{error::Result, meta::MetaRecord};

/// Storage for the single [`MetaRecord`].
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn load_meta(&self) -> Result<Option<MetaRecord>>;
    /// Fails with `AlreadyInitialized` when a record exists.
    async fn insert_meta(&self, meta: &MetaRecord) -> Result<()>;
    /// Fails with `NotInitialized` when no record exists.
    async fn update_meta(&self, meta: &MetaRecord) -> Result<()>;
    async fn delete_meta(&self) -> Result<()>;
}

/// String key-value storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Everything the vault persists.
pub trait VaultStore: MetaStore + BlobStore {}

impl<T: MetaStore + BlobStore + ?Sized> VaultStore for T {}

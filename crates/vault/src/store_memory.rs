//! In-memory store for tests and embedding.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    error::{Result, VaultError},
    meta::MetaRecord,
    store::{BlobStore, MetaStore},
};

/// In-memory store backed by `HashMap`. No persistence.
#[derive(Default)]
pub struct InMemoryStore {
    meta: Mutex<Option<MetaRecord>>,
    kv: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every key currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let kv = self.kv.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = kv.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl MetaStore for InMemoryStore {
    async fn load_meta(&self) -> Result<Option<MetaRecord>> {
        let meta = self.meta.lock().unwrap_or_else(|e| e.into_inner());
        Ok(meta.clone())
    }

    async fn insert_meta(&self, record: &MetaRecord) -> Result<()> {
        let mut meta = self.meta.lock().unwrap_or_else(|e| e.into_inner());
        if meta.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        *meta = Some(record.clone());
        Ok(())
    }

    async fn update_meta(&self, record: &MetaRecord) -> Result<()> {
        let mut meta = self.meta.lock().unwrap_or_else(|e| e.into_inner());
        if meta.is_none() {
            return Err(VaultError::NotInitialized);
        }
        *meta = Some(record.clone());
        Ok(())
    }

    async fn delete_meta(&self) -> Result<()> {
        let mut meta = self.meta.lock().unwrap_or_else(|e| e.into_inner());
        *meta = None;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let kv = self.kv.lock().unwrap_or_else(|e| e.into_inner());
        Ok(kv.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut kv = self.kv.lock().unwrap_or_else(|e| e.into_inner());
        kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut kv = self.kv.lock().unwrap_or_else(|e| e.into_inner());
        Ok(kv.remove(key).is_some())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::meta::tests::sample};

    #[tokio::test]
    async fn meta_insert_once() {
        let store = InMemoryStore::new();
        assert!(store.load_meta().await.unwrap().is_none());

        store.insert_meta(&sample()).await.unwrap();
        assert!(matches!(
            store.insert_meta(&sample()).await,
            Err(VaultError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn update_requires_existing() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.update_meta(&sample()).await,
            Err(VaultError::NotInitialized)
        ));

        store.insert_meta(&sample()).await.unwrap();
        let mut meta = sample();
        meta.attempts = 2;
        store.update_meta(&meta).await.unwrap();
        assert_eq!(store.load_meta().await.unwrap().unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn kv_round_trip() {
        let store = InMemoryStore::new();
        store.put("vault.inventory", "blob").await.unwrap();
        assert_eq!(
            store.get("vault.inventory").await.unwrap().as_deref(),
            Some("blob")
        );
        assert!(store.delete("vault.inventory").await.unwrap());
        assert!(!store.delete("vault.inventory").await.unwrap());
        assert!(store.keys().is_empty());
    }
}

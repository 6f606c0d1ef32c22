//! SQLite-backed vault store using sqlx.

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
};

use crate::{
    error::{Result, VaultError},
    kdf::KdfParams,
    meta::MetaRecord,
    store::{BlobStore, MetaStore},
};

/// SQLite persistence for the metadata record and key-value storage.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Open (creating if needed) a database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::Other(anyhow::anyhow!("create {}: {e}", parent.display())))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn corrupt(field: &str, e: impl std::fmt::Display) -> VaultError {
    VaultError::MetadataCorrupt(format!("{field}: {e}"))
}

#[async_trait]
impl MetaStore for SqliteStore {
    async fn load_meta(&self) -> Result<Option<MetaRecord>> {
        let row = sqlx::query(
            "SELECT version, salt, kdf_params, verifier_hash, wrapped_data_key, attempts,
                    lock_until_ms, biometric_enabled, auto_lock_minutes, created_at_ms, last_unlock_ms
             FROM vault_metadata WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kdf_params: String = row.try_get("kdf_params")?;
        let kdf_params: KdfParams =
            serde_json::from_str(&kdf_params).map_err(|e| corrupt("kdf_params", e))?;
        let version: i64 = row.try_get("version")?;
        let attempts: i64 = row.try_get("attempts")?;
        let lock_until_ms: i64 = row.try_get("lock_until_ms")?;
        let auto_lock_minutes: i64 = row.try_get("auto_lock_minutes")?;
        let created_at_ms: i64 = row.try_get("created_at_ms")?;
        let last_unlock_ms: Option<i64> = row.try_get("last_unlock_ms")?;

        Ok(Some(MetaRecord {
            version: u32::try_from(version).map_err(|e| corrupt("version", e))?,
            salt: row.try_get("salt")?,
            kdf_params,
            verifier_hash: row.try_get("verifier_hash")?,
            wrapped_data_key: row.try_get("wrapped_data_key")?,
            attempts: u32::try_from(attempts).map_err(|e| corrupt("attempts", e))?,
            lock_until_ms: u64::try_from(lock_until_ms).map_err(|e| corrupt("lock_until_ms", e))?,
            biometric_enabled: row.try_get("biometric_enabled")?,
            auto_lock_minutes: u32::try_from(auto_lock_minutes)
                .map_err(|e| corrupt("auto_lock_minutes", e))?,
            created_at_ms: u64::try_from(created_at_ms).map_err(|e| corrupt("created_at_ms", e))?,
            last_unlock_ms: last_unlock_ms
                .map(u64::try_from)
                .transpose()
                .map_err(|e| corrupt("last_unlock_ms", e))?,
        }))
    }

    async fn insert_meta(&self, meta: &MetaRecord) -> Result<()> {
        let params = serde_json::to_string(&meta.kdf_params)?;
        let result = sqlx::query(
            "INSERT INTO vault_metadata (id, version, salt, kdf_params, verifier_hash, wrapped_data_key,
                 attempts, lock_until_ms, biometric_enabled, auto_lock_minutes, created_at_ms, last_unlock_ms)
             VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(meta.version as i64)
        .bind(&meta.salt)
        .bind(&params)
        .bind(&meta.verifier_hash)
        .bind(&meta.wrapped_data_key)
        .bind(meta.attempts as i64)
        .bind(meta.lock_until_ms as i64)
        .bind(meta.biometric_enabled)
        .bind(meta.auto_lock_minutes as i64)
        .bind(meta.created_at_ms as i64)
        .bind(meta.last_unlock_ms.map(|v| v as i64))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(VaultError::AlreadyInitialized);
        }
        Ok(())
    }

    async fn update_meta(&self, meta: &MetaRecord) -> Result<()> {
        let params = serde_json::to_string(&meta.kdf_params)?;
        let result = sqlx::query(
            "UPDATE vault_metadata SET version = ?, salt = ?, kdf_params = ?, verifier_hash = ?,
                 wrapped_data_key = ?, attempts = ?, lock_until_ms = ?, biometric_enabled = ?,
                 auto_lock_minutes = ?, last_unlock_ms = ?
             WHERE id = 1",
        )
        .bind(meta.version as i64)
        .bind(&meta.salt)
        .bind(&params)
        .bind(&meta.verifier_hash)
        .bind(&meta.wrapped_data_key)
        .bind(meta.attempts as i64)
        .bind(meta.lock_until_ms as i64)
        .bind(meta.biometric_enabled)
        .bind(meta.auto_lock_minutes as i64)
        .bind(meta.last_unlock_ms.map(|v| v as i64))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(VaultError::NotInitialized);
        }
        Ok(())
    }

    async fn delete_meta(&self) -> Result<()> {
        sqlx::query("DELETE FROM vault_metadata WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<String, _>("value")).transpose()?)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at_ms) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at_ms = excluded.updated_at_ms",
        )
        .bind(key)
        .bind(value)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

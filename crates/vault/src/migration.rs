//! One-shot import of plaintext records written before the vault existed.
//!
//! Each domain migrates on its own: the encrypted blob is written first and
//! the legacy key is deleted only afterwards. A run that dies between the two
//! steps is finished by the next run, which sees the blob already present and
//! just removes the leftover plaintext.

use std::sync::Arc;

#[cfg(feature = "metrics")]
use ledgerlock_metrics::{counter, labels, migration as migration_metrics};

use crate::{
    domain::Domain,
    error::{Result, VaultError},
    store::BlobStore,
    traits::Cipher,
    vault::Vault,
};

/// What a [`MigrationService::run_once`] call did, per domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MigrationReport {
    /// Plaintext encrypted into the vault and removed.
    pub migrated: Vec<Domain>,
    /// Blob already existed; only the stale plaintext was removed.
    pub already_encrypted: Vec<Domain>,
    /// Plaintext that is not valid JSON. Left in place.
    pub failed: Vec<Domain>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.already_encrypted.is_empty() && self.failed.is_empty()
    }
}

pub struct MigrationService<C: Cipher> {
    vault: Arc<Vault<C>>,
}

impl<C: Cipher> MigrationService<C> {
    pub fn new(vault: Arc<Vault<C>>) -> Self {
        Self { vault }
    }

    /// Migrate every legacy key still present. Safe to call on every unlock.
    ///
    /// Fails with [`VaultError::Locked`] unless the vault is unlocked. A
    /// domain whose legacy payload is unparseable is reported in
    /// [`MigrationReport::failed`] and does not stop the others.
    pub async fn run_once(&self) -> Result<MigrationReport> {
        if self.vault.is_locked().await {
            return Err(VaultError::Locked);
        }

        let store = self.vault.backing_store();
        let mut report = MigrationReport::default();

        for domain in Domain::ALL {
            let Some(legacy) = store.get(domain.legacy_key()).await? else {
                continue;
            };

            if self.vault.has_domain(domain).await? {
                store.delete(domain.legacy_key()).await?;
                report.already_encrypted.push(domain);
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(&legacy) {
                Ok(v) => v,
                #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(migration_metrics::DOMAINS_FAILED_TOTAL, labels::DOMAIN => domain.name())
                        .increment(1);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(domain = domain.name(), error = %e, "legacy record is not valid JSON, leaving it in place");

                    report.failed.push(domain);
                    continue;
                },
            };

            self.vault.encrypt(domain, &value).await?;
            store.delete(domain.legacy_key()).await?;
            report.migrated.push(domain);

            #[cfg(feature = "metrics")]
            counter!(migration_metrics::DOMAINS_MIGRATED_TOTAL, labels::DOMAIN => domain.name())
                .increment(1);
        }

        #[cfg(feature = "tracing")]
        if !report.is_empty() {
            tracing::info!(
                migrated = report.migrated.len(),
                already_encrypted = report.already_encrypted.len(),
                failed = report.failed.len(),
                "legacy plaintext migration finished"
            );
        }

        Ok(report)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            kdf::KdfParams,
            store_memory::InMemoryStore,
            vault::VaultOptions,
        },
        serde_json::json,
    };

    async fn unlocked_vault() -> (Arc<InMemoryStore>, Arc<Vault>) {
        let store = Arc::new(InMemoryStore::new());
        let vault = Vault::new(store.clone()).with_options(VaultOptions {
            kdf_params: KdfParams {
                m_cost: 256,
                t_cost: 1,
                p_cost: 1,
            },
            ..VaultOptions::default()
        });
        vault.setup("1234", false).await.unwrap();
        (store, Arc::new(vault))
    }

    #[tokio::test]
    async fn migrates_and_deletes_plaintext() {
        let (store, vault) = unlocked_vault().await;
        store
            .put("inventory", r#"[{"id":"inv_1","qty":5}]"#)
            .await
            .unwrap();
        store.put("settings", r#"{"currency":"KES"}"#).await.unwrap();

        let report = MigrationService::new(vault.clone()).run_once().await.unwrap();
        assert_eq!(report.migrated, vec![Domain::Inventory, Domain::Settings]);
        assert!(report.failed.is_empty());

        assert!(store.get("inventory").await.unwrap().is_none());
        assert!(store.get("settings").await.unwrap().is_none());
        assert_eq!(
            vault.decrypt(Domain::Inventory).await.unwrap(),
            Some(json!([{"id": "inv_1", "qty": 5}]))
        );
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let (store, vault) = unlocked_vault().await;
        store.put("credits", r#"[{"id":"c1"}]"#).await.unwrap();
        let service = MigrationService::new(vault.clone());

        service.run_once().await.unwrap();
        let blob = store.get("vault.credits").await.unwrap();

        let second = service.run_once().await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.get("vault.credits").await.unwrap(), blob);
    }

    #[tokio::test]
    async fn resumes_after_write_without_delete() {
        let (store, vault) = unlocked_vault().await;
        vault
            .encrypt(Domain::Profits, &json!([{"id": "p1"}]))
            .await
            .unwrap();
        // Crash left the plaintext behind, possibly stale.
        store.put("profits", r#"[{"id":"old"}]"#).await.unwrap();

        let report = MigrationService::new(vault.clone()).run_once().await.unwrap();
        assert_eq!(report.already_encrypted, vec![Domain::Profits]);
        assert!(store.get("profits").await.unwrap().is_none());
        assert_eq!(
            vault.decrypt(Domain::Profits).await.unwrap(),
            Some(json!([{"id": "p1"}]))
        );
    }

    #[tokio::test]
    async fn invalid_json_is_kept() {
        let (store, vault) = unlocked_vault().await;
        store.put("profile", "{not json").await.unwrap();
        store.put("transactions", "[]").await.unwrap();

        let report = MigrationService::new(vault.clone()).run_once().await.unwrap();
        assert_eq!(report.failed, vec![Domain::Profile]);
        assert_eq!(report.migrated, vec![Domain::Transactions]);
        assert_eq!(
            store.get("profile").await.unwrap().as_deref(),
            Some("{not json")
        );
        assert!(!vault.has_domain(Domain::Profile).await.unwrap());
    }

    #[tokio::test]
    async fn requires_unlocked_vault() {
        let (store, vault) = unlocked_vault().await;
        store.put("inventory", "[]").await.unwrap();
        vault.lock().await;

        assert!(matches!(
            MigrationService::new(vault.clone()).run_once().await,
            Err(VaultError::Locked)
        ));
        assert!(store.get("inventory").await.unwrap().is_some());
    }
}

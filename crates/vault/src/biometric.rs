//! Biometric escrow: a second way to recover the data key without the PIN.
//!
//! The escrow entry in the key-value store is the data key wrapped under a
//! key that only the platform biometric API can release (a secure-enclave or
//! keystore-bound secret). Reading the store alone never yields the data key.

use std::sync::Arc;

use {async_trait::async_trait, zeroize::Zeroizing};

use crate::{
    error::{Result, VaultError},
    key_wrap::{self, ESCROW_WRAP_AAD},
    store::BlobStore,
    traits::Cipher,
};

/// Key under which the escrow entry is stored.
pub const ESCROW_KEY: &str = "vault.biometric_escrow";

/// Platform biometric API.
///
/// Implementations wrap Android Keystore / iOS Secure Enclave / an OS
/// keyring. The release key must never be stored by the vault itself.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether biometric hardware is present and enrolled.
    async fn is_available(&self) -> bool;

    /// Create (or replace) the platform-held key and release it once for wrapping.
    async fn enroll(&self) -> Result<Zeroizing<[u8; 32]>>;

    /// Run the biometric challenge and, on success only, release the key.
    ///
    /// Must return [`VaultError::BiometricFailed`] when the user is rejected
    /// or cancels.
    async fn authenticate(&self, reason: &str) -> Result<Zeroizing<[u8; 32]>>;

    /// Destroy the platform-held key.
    async fn revoke(&self) -> Result<()>;
}

/// For platforms without biometric hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricAuthenticator for NoBiometrics {
    async fn is_available(&self) -> bool {
        false
    }

    async fn enroll(&self) -> Result<Zeroizing<[u8; 32]>> {
        Err(VaultError::BiometricUnavailable)
    }

    async fn authenticate(&self, _reason: &str) -> Result<Zeroizing<[u8; 32]>> {
        Err(VaultError::BiometricUnavailable)
    }

    async fn revoke(&self) -> Result<()> {
        Ok(())
    }
}

/// Escrows the data key behind a [`BiometricAuthenticator`].
pub struct BiometricEscrow {
    authenticator: Arc<dyn BiometricAuthenticator>,
}

impl BiometricEscrow {
    pub fn new(authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        Self { authenticator }
    }

    pub async fn is_available(&self) -> bool {
        self.authenticator.is_available().await
    }

    /// Escrow `dek`. The caller guarantees the vault is unlocked.
    pub async fn enroll<C: Cipher, S: BlobStore + ?Sized>(
        &self,
        cipher: &C,
        store: &S,
        dek: &[u8; 32],
    ) -> Result<()> {
        if !self.authenticator.is_available().await {
            return Err(VaultError::BiometricUnavailable);
        }
        let release_key = self.authenticator.enroll().await?;
        let wrapped = key_wrap::wrap_dek(cipher, &release_key, dek, ESCROW_WRAP_AAD)?;
        store.put(ESCROW_KEY, &wrapped).await?;

        #[cfg(feature = "tracing")]
        tracing::info!("biometric escrow enrolled");

        Ok(())
    }

    /// Challenge the user and, on success, recover the escrowed data key.
    pub async fn try_unlock<C: Cipher, S: BlobStore + ?Sized>(
        &self,
        cipher: &C,
        store: &S,
    ) -> Result<Zeroizing<[u8; 32]>> {
        if !self.authenticator.is_available().await {
            return Err(VaultError::BiometricUnavailable);
        }
        let wrapped = store
            .get(ESCROW_KEY)
            .await?
            .ok_or(VaultError::BiometricUnavailable)?;

        let release_key = self
            .authenticator
            .authenticate("Unlock your ledger")
            .await?;

        // A release key that no longer opens the entry means the platform key
        // was rotated behind our back; the escrow is unusable, not corrupt data.
        key_wrap::unwrap_dek(cipher, &release_key, &wrapped, ESCROW_WRAP_AAD)
            .map_err(|_| VaultError::BiometricFailed)
    }

    /// Delete the escrowed material and the platform key.
    pub async fn disable<S: BlobStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.delete(ESCROW_KEY).await?;
        self.authenticator.revoke().await?;

        #[cfg(feature = "tracing")]
        tracing::info!("biometric escrow removed");

        Ok(())
    }
}

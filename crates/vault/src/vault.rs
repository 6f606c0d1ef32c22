//! Vault state machine: setup, lock/unlock, lockout, encrypt/decrypt.

use std::sync::Arc;

use {serde_json::Value, tokio::sync::Mutex, zeroize::Zeroizing};

#[cfg(feature = "metrics")]
use ledgerlock_metrics::{
    counter, domain as domain_metrics, gauge, histogram, labels, vault as vault_metrics,
};

use crate::{
    autolock::AutoLockTimer,
    biometric::{BiometricAuthenticator, BiometricEscrow, NoBiometrics},
    clock::{Clock, SystemClock},
    domain::{Domain, Envelope, open_envelope},
    error::{Result, VaultError},
    kdf::{self, KdfParams},
    key_wrap::{self, PIN_WRAP_AAD},
    lockout::LockoutPolicy,
    meta::{CURRENT_VERSION, MetaRecord},
    records::DomainRecord,
    session::Session,
    store::{BlobStore, MetaStore, VaultStore},
    traits::Cipher,
    xchacha20::XChaCha20Poly1305Cipher,
};

/// Default inactivity timeout for a new vault.
pub const DEFAULT_AUTO_LOCK_MINUTES: u32 = 5;

/// Vault status exposed to the CLI / UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    /// No PIN has been set, the vault doesn't exist yet.
    Uninitialized,
    /// Vault exists but the data key is not in memory.
    Locked,
    /// Data key is held in memory.
    Unlocked,
}

/// Snapshot for a settings screen.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub pin_set: bool,
    pub biometric_enabled: bool,
    pub biometric_available: bool,
    pub locked: bool,
    pub auto_lock_minutes: u32,
    pub failed_attempts: u32,
    /// Set while a lockout is running.
    pub locked_out_minutes: Option<u64>,
}

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct VaultOptions {
    /// KDF cost for new vaults. Existing vaults keep the parameters they were
    /// created with.
    pub kdf_params: KdfParams,
    pub lockout: LockoutPolicy,
    /// Auto-lock duration written into a new vault's metadata.
    pub default_auto_lock_minutes: u32,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            kdf_params: KdfParams::default(),
            lockout: LockoutPolicy::default(),
            default_auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
        }
    }
}

impl From<&ledgerlock_config::LedgerlockConfig> for VaultOptions {
    fn from(cfg: &ledgerlock_config::LedgerlockConfig) -> Self {
        Self {
            kdf_params: KdfParams::from(&cfg.kdf),
            lockout: LockoutPolicy::from(&cfg.lockout),
            default_auto_lock_minutes: cfg.vault.auto_lock_minutes,
        }
    }
}

/// PIN-gated encryption-at-rest vault.
///
/// Generic over [`Cipher`] but defaults to [`XChaCha20Poly1305Cipher`].
/// Every metadata read-modify-write runs under `meta_lock`, so concurrent
/// unlock attempts cannot lose a failed-attempt increment.
pub struct Vault<C: Cipher = XChaCha20Poly1305Cipher> {
    store: Arc<dyn VaultStore>,
    cipher: C,
    session: Arc<Session>,
    auto_lock: AutoLockTimer,
    escrow: BiometricEscrow,
    lockout: LockoutPolicy,
    kdf_params: KdfParams,
    clock: Arc<dyn Clock>,
    default_auto_lock_minutes: u32,
    meta_lock: Mutex<()>,
}

impl Vault<XChaCha20Poly1305Cipher> {
    /// Create a vault with the default cipher, options and no biometrics.
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self::with_cipher(store, XChaCha20Poly1305Cipher)
    }
}

impl<C: Cipher> Vault<C> {
    /// Create a vault with a custom cipher.
    pub fn with_cipher(store: Arc<dyn VaultStore>, cipher: C) -> Self {
        let options = VaultOptions::default();
        Self {
            store,
            cipher,
            session: Arc::new(Session::new()),
            auto_lock: AutoLockTimer::new(options.default_auto_lock_minutes),
            escrow: BiometricEscrow::new(Arc::new(NoBiometrics)),
            lockout: options.lockout,
            kdf_params: options.kdf_params,
            clock: Arc::new(SystemClock),
            default_auto_lock_minutes: options.default_auto_lock_minutes,
            meta_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: VaultOptions) -> Self {
        self.auto_lock.set_minutes(options.default_auto_lock_minutes);
        self.default_auto_lock_minutes = options.default_auto_lock_minutes;
        self.lockout = options.lockout;
        self.kdf_params = options.kdf_params;
        self
    }

    #[must_use]
    pub fn with_biometrics(mut self, authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        self.escrow = BiometricEscrow::new(authenticator);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn backing_store(&self) -> &dyn VaultStore {
        self.store.as_ref()
    }

    /// Query the current vault status.
    pub async fn status(&self) -> Result<VaultStatus> {
        if self.store.load_meta().await?.is_none() {
            return Ok(VaultStatus::Uninitialized);
        }
        if self.session.is_open().await {
            Ok(VaultStatus::Unlocked)
        } else {
            Ok(VaultStatus::Locked)
        }
    }

    /// Create the vault under `pin` and leave it unlocked.
    ///
    /// With `enable_biometric`, the data key is also escrowed behind the
    /// platform authenticator; unavailable hardware fails before anything is
    /// written.
    pub async fn setup(&self, pin: &str, enable_biometric: bool) -> Result<()> {
        kdf::validate_pin(pin)?;
        let _guard = self.meta_lock.lock().await;

        if self.store.load_meta().await?.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        if enable_biometric && !self.escrow.is_available().await {
            return Err(VaultError::BiometricUnavailable);
        }

        let salt_b64 = kdf::generate_salt();
        let salt = kdf::decode_salt(&salt_b64)?;
        let unlock_key = self.derive(pin, salt, &self.kdf_params).await?;

        let dek = key_wrap::generate_dek();
        let wrapped_data_key = key_wrap::wrap_dek(&self.cipher, &unlock_key, &dek, PIN_WRAP_AAD)?;

        // Enroll before the metadata exists, so a cancelled or failed
        // enrollment leaves no vault behind.
        if enable_biometric {
            self.escrow.enroll(&self.cipher, &*self.store, &dek).await?;
        }

        let now = self.clock.now_ms();
        let meta = MetaRecord {
            version: CURRENT_VERSION,
            salt: salt_b64,
            kdf_params: self.kdf_params.clone(),
            verifier_hash: kdf::verifier_hash(&unlock_key),
            wrapped_data_key,
            attempts: 0,
            lock_until_ms: 0,
            biometric_enabled: enable_biometric,
            auto_lock_minutes: self.auto_lock.minutes(),
            created_at_ms: now,
            last_unlock_ms: Some(now),
        };
        if let Err(e) = self.store.insert_meta(&meta).await {
            if enable_biometric {
                self.escrow.disable(&*self.store).await?;
            }
            return Err(e);
        }

        self.open_session(dek).await;

        #[cfg(feature = "tracing")]
        tracing::info!(biometric = enable_biometric, "vault initialized");

        Ok(())
    }

    /// Unlock with the PIN.
    ///
    /// A wrong PIN increments the persisted failure counter and may start a
    /// lockout; only a correct PIN resets it.
    pub async fn unlock(&self, pin: &str) -> Result<()> {
        kdf::validate_pin(pin)?;
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;

        if let Err(e) = LockoutPolicy::check(meta.lock_until_ms, self.clock.now_ms()) {
            #[cfg(feature = "metrics")]
            record_unlock("pin", "locked_out");
            return Err(e);
        }

        let unlock_key = self.derive_for(&meta, pin).await?;
        if !kdf::verify(&unlock_key, &meta.verifier_hash) {
            return Err(self.record_failure(&mut meta, "pin").await?);
        }

        // The verifier matched, so a wrapped key that won't open is damage,
        // not a wrong PIN.
        let dek = key_wrap::unwrap_dek(&self.cipher, &unlock_key, &meta.wrapped_data_key, PIN_WRAP_AAD)
            .map_err(|_| {
                VaultError::MetadataCorrupt("wrapped data key does not open under the verified PIN".into())
            })?;

        meta.attempts = 0;
        meta.lock_until_ms = 0;
        meta.last_unlock_ms = Some(self.clock.now_ms());
        self.store.update_meta(&meta).await?;

        self.auto_lock.set_minutes(meta.auto_lock_minutes);
        self.open_session(dek).await;

        #[cfg(feature = "metrics")]
        record_unlock("pin", "success");

        #[cfg(feature = "tracing")]
        tracing::info!("vault unlocked");

        Ok(())
    }

    /// Unlock through the biometric escrow.
    ///
    /// Refused while a PIN lockout is running. Does not reset the PIN
    /// failure counter.
    pub async fn unlock_with_biometric(&self) -> Result<()> {
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;

        if !meta.biometric_enabled {
            return Err(VaultError::BiometricUnavailable);
        }
        LockoutPolicy::check(meta.lock_until_ms, self.clock.now_ms())?;

        let dek = match self.escrow.try_unlock(&self.cipher, &*self.store).await {
            Ok(dek) => dek,
            Err(e) => {
                #[cfg(feature = "metrics")]
                record_unlock("biometric", "failed");

                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "biometric unlock failed");

                return Err(e);
            },
        };

        meta.last_unlock_ms = Some(self.clock.now_ms());
        self.store.update_meta(&meta).await?;

        self.auto_lock.set_minutes(meta.auto_lock_minutes);
        self.open_session(dek).await;

        #[cfg(feature = "metrics")]
        record_unlock("biometric", "success");

        #[cfg(feature = "tracing")]
        tracing::info!("vault unlocked via biometrics");

        Ok(())
    }

    /// Change the PIN. Re-wraps the same data key, so no domain blob changes.
    ///
    /// The vault must be unlocked. A wrong `old` PIN counts as a failed attempt.
    pub async fn change_pin(&self, old: &str, new: &str) -> Result<()> {
        kdf::validate_pin(old)?;
        kdf::validate_pin(new)?;
        if !self.session.is_open().await {
            return Err(VaultError::Locked);
        }

        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;
        LockoutPolicy::check(meta.lock_until_ms, self.clock.now_ms())?;

        let old_key = self.derive_for(&meta, old).await?;
        if !kdf::verify(&old_key, &meta.verifier_hash) {
            return Err(self.record_failure(&mut meta, "change_pin").await?);
        }
        let dek = key_wrap::unwrap_dek(&self.cipher, &old_key, &meta.wrapped_data_key, PIN_WRAP_AAD)
            .map_err(|_| {
                VaultError::MetadataCorrupt("wrapped data key does not open under the verified PIN".into())
            })?;

        let new_key = self.derive_for(&meta, new).await?;
        meta.wrapped_data_key = key_wrap::wrap_dek(&self.cipher, &new_key, &dek, PIN_WRAP_AAD)?;
        meta.verifier_hash = kdf::verifier_hash(&new_key);
        meta.attempts = 0;
        meta.lock_until_ms = 0;
        self.store.update_meta(&meta).await?;

        self.auto_lock.arm(&self.session);

        #[cfg(feature = "metrics")]
        counter!(vault_metrics::PIN_CHANGES_TOTAL).increment(1);

        #[cfg(feature = "tracing")]
        tracing::info!("vault PIN changed (data key re-wrapped)");

        Ok(())
    }

    /// Drop the data key from memory. Operations already holding the key
    /// finish first.
    pub async fn lock(&self) {
        self.auto_lock.cancel();
        let was_open = self.session.clear().await;

        if was_open {
            #[cfg(feature = "metrics")]
            {
                gauge!(vault_metrics::UNLOCKED).set(0.0);
                counter!(vault_metrics::LOCKS_TOTAL).increment(1);
            }

            #[cfg(feature = "tracing")]
            tracing::info!("vault locked");
        }
    }

    pub async fn is_locked(&self) -> bool {
        !self.session.is_open().await
    }

    /// Serialize `value` into `domain`'s envelope, encrypt, and persist.
    pub async fn encrypt(&self, domain: Domain, value: &Value) -> Result<()> {
        let key = self.session.key().await?;

        let envelope = Envelope {
            schema: domain.schema_version(),
            data: value,
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(&envelope)?);
        let blob = self
            .cipher
            .seal_b64(&key, &plaintext, domain.aad().as_bytes())?;
        self.store.put(domain.storage_key(), &blob).await?;
        drop(key);

        self.auto_lock.arm(&self.session);

        #[cfg(feature = "metrics")]
        counter!(domain_metrics::ENCRYPTS_TOTAL, labels::DOMAIN => domain.name()).increment(1);

        Ok(())
    }

    /// Load and decrypt `domain`. `None` when nothing was ever stored.
    pub async fn decrypt(&self, domain: Domain) -> Result<Option<Value>> {
        let key = self.session.key().await?;

        let Some(blob) = self.store.get(domain.storage_key()).await? else {
            drop(key);
            self.auto_lock.arm(&self.session);
            return Ok(None);
        };

        let plaintext = match self.cipher.open_b64(&key, &blob, domain.aad().as_bytes()) {
            Ok(p) => Zeroizing::new(p),
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(domain_metrics::DECRYPT_FAILURES_TOTAL, labels::DOMAIN => domain.name())
                    .increment(1);

                #[cfg(feature = "tracing")]
                tracing::warn!(domain = domain.name(), "domain blob failed authentication");

                return Err(e);
            },
        };
        drop(key);

        let value = open_envelope(domain, &plaintext)?;
        self.auto_lock.arm(&self.session);

        #[cfg(feature = "metrics")]
        counter!(domain_metrics::DECRYPTS_TOTAL, labels::DOMAIN => domain.name()).increment(1);

        Ok(Some(value))
    }

    /// Typed [`encrypt`](Self::encrypt).
    pub async fn store<T: DomainRecord>(&self, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.encrypt(T::DOMAIN, &value).await
    }

    /// Typed [`decrypt`](Self::decrypt).
    pub async fn load<T: DomainRecord>(&self) -> Result<Option<T>> {
        match self.decrypt(T::DOMAIN).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| VaultError::RecordMismatch {
                    domain: T::DOMAIN.name(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Delete `domain`'s blob. Requires the vault to be unlocked.
    pub async fn remove(&self, domain: Domain) -> Result<bool> {
        let key = self.session.key().await?;
        let existed = self.store.delete(domain.storage_key()).await?;
        drop(key);
        self.auto_lock.arm(&self.session);
        Ok(existed)
    }

    /// Whether an encrypted blob exists for `domain`. Works while locked.
    pub async fn has_domain(&self, domain: Domain) -> Result<bool> {
        Ok(self.store.get(domain.storage_key()).await?.is_some())
    }

    /// Persist a new inactivity timeout (0 = never) and restart the timer.
    pub async fn set_auto_lock_minutes(&self, minutes: u32) -> Result<()> {
        if !self.session.is_open().await {
            return Err(VaultError::Locked);
        }
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;
        meta.auto_lock_minutes = minutes;
        self.store.update_meta(&meta).await?;

        self.auto_lock.set_minutes(minutes);
        self.auto_lock.arm(&self.session);

        #[cfg(feature = "tracing")]
        tracing::info!(minutes, "auto-lock timeout changed (0 = never)");

        Ok(())
    }

    /// Record user activity: restart the inactivity timer.
    pub async fn touch(&self) -> Result<()> {
        if !self.session.is_open().await {
            return Err(VaultError::Locked);
        }
        self.auto_lock.arm(&self.session);
        Ok(())
    }

    pub async fn security_status(&self) -> Result<SecurityStatus> {
        let meta = self.store.load_meta().await?;
        let locked = !self.session.is_open().await;
        let biometric_available = self.escrow.is_available().await;

        Ok(match meta {
            None => SecurityStatus {
                pin_set: false,
                biometric_enabled: false,
                biometric_available,
                locked,
                auto_lock_minutes: self.auto_lock.minutes(),
                failed_attempts: 0,
                locked_out_minutes: None,
            },
            Some(meta) => SecurityStatus {
                pin_set: true,
                biometric_enabled: meta.biometric_enabled,
                biometric_available,
                locked,
                auto_lock_minutes: meta.auto_lock_minutes,
                failed_attempts: meta.attempts,
                locked_out_minutes: match LockoutPolicy::check(
                    meta.lock_until_ms,
                    self.clock.now_ms(),
                ) {
                    Err(VaultError::LockedOut { remaining_minutes }) => Some(remaining_minutes),
                    _ => None,
                },
            },
        })
    }

    /// Escrow the in-memory data key behind biometrics.
    pub async fn enable_biometric(&self) -> Result<()> {
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;
        {
            let key = self.session.key().await?;
            self.escrow.enroll(&self.cipher, &*self.store, &key).await?;
        }
        meta.biometric_enabled = true;
        self.store.update_meta(&meta).await?;
        self.auto_lock.arm(&self.session);
        Ok(())
    }

    /// Delete the escrow entry and the platform key. Requires the vault to be
    /// unlocked.
    pub async fn disable_biometric(&self) -> Result<()> {
        if !self.session.is_open().await {
            return Err(VaultError::Locked);
        }
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta().await?;
        self.escrow.disable(&*self.store).await?;
        meta.biometric_enabled = false;
        self.store.update_meta(&meta).await?;
        self.auto_lock.arm(&self.session);
        Ok(())
    }

    /// Forget everything: lock, delete every domain blob, the escrow and the
    /// metadata. Needs no PIN; this is the only way out of `MetadataCorrupt`.
    ///
    /// Legacy plaintext keys are not touched.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.meta_lock.lock().await;
        self.auto_lock.cancel();
        self.auto_lock.set_minutes(self.default_auto_lock_minutes);
        self.session.clear().await;

        for domain in Domain::ALL {
            self.store.delete(domain.storage_key()).await?;
        }
        self.escrow.disable(&*self.store).await?;
        // Last, so an interrupted reset still leaves a vault that opens.
        self.store.delete_meta().await?;

        #[cfg(feature = "metrics")]
        {
            counter!(vault_metrics::RESETS_TOTAL).increment(1);
            gauge!(vault_metrics::UNLOCKED).set(0.0);
        }

        #[cfg(feature = "tracing")]
        tracing::warn!("vault reset, all encrypted data deleted");

        Ok(())
    }

    async fn load_meta(&self) -> Result<MetaRecord> {
        let meta = self
            .store
            .load_meta()
            .await?
            .ok_or(VaultError::NotInitialized)?;
        meta.validate()?;
        Ok(meta)
    }

    async fn derive_for(&self, meta: &MetaRecord, pin: &str) -> Result<Zeroizing<[u8; 32]>> {
        let salt = kdf::decode_salt(&meta.salt)?;
        self.derive(pin, salt, &meta.kdf_params).await
    }

    async fn derive(
        &self,
        pin: &str,
        salt: Vec<u8>,
        params: &KdfParams,
    ) -> Result<Zeroizing<[u8; 32]>> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let key = kdf::derive_unlock_key_blocking(pin, salt, params.clone()).await?;

        #[cfg(feature = "metrics")]
        histogram!(vault_metrics::KDF_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        Ok(key)
    }

    /// Count a wrong PIN and persist the counter (and any new lock) before
    /// reporting it.
    #[cfg_attr(
        not(any(feature = "tracing", feature = "metrics")),
        allow(unused_variables)
    )]
    async fn record_failure(&self, meta: &mut MetaRecord, method: &'static str) -> Result<VaultError> {
        meta.attempts = meta.attempts.saturating_add(1);
        meta.lock_until_ms = self.lockout.lock_until(meta.attempts, self.clock.now_ms());
        self.store.update_meta(meta).await?;

        #[cfg(feature = "metrics")]
        {
            record_unlock(method, "wrong_pin");
            if meta.lock_until_ms > 0 {
                counter!(vault_metrics::LOCKOUTS_TOTAL).increment(1);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            method,
            attempts = meta.attempts,
            locked = meta.lock_until_ms > 0,
            "wrong PIN"
        );

        Ok(VaultError::WrongPin {
            attempts: meta.attempts,
        })
    }

    async fn open_session(&self, dek: Zeroizing<[u8; 32]>) {
        self.session.open(dek).await;
        self.auto_lock.arm(&self.session);

        #[cfg(feature = "metrics")]
        gauge!(vault_metrics::UNLOCKED).set(1.0);
    }
}

#[cfg(feature = "metrics")]
fn record_unlock(method: &'static str, result: &'static str) {
    counter!(
        vault_metrics::UNLOCK_ATTEMPTS_TOTAL,
        labels::METHOD => method,
        labels::RESULT => result
    )
    .increment(1);
}

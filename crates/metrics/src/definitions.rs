//! Metric name and label definitions.
//!
//! Centralizing these keeps names consistent between the code that records
//! them and any dashboard that reads them.

/// Vault lifecycle and access metrics
pub mod vault {
    /// Unlock attempts, labelled by `method` (`pin`, `biometric`) and `result`
    pub const UNLOCK_ATTEMPTS_TOTAL: &str = "ledgerlock_vault_unlock_attempts_total";
    /// Lockouts triggered by failed attempts
    pub const LOCKOUTS_TOTAL: &str = "ledgerlock_vault_lockouts_total";
    /// Sessions cleared by the inactivity timer
    pub const AUTO_LOCKS_TOTAL: &str = "ledgerlock_vault_auto_locks_total";
    /// Explicit lock calls
    pub const LOCKS_TOTAL: &str = "ledgerlock_vault_locks_total";
    /// PIN changes
    pub const PIN_CHANGES_TOTAL: &str = "ledgerlock_vault_pin_changes_total";
    /// Full resets ("forget everything")
    pub const RESETS_TOTAL: &str = "ledgerlock_vault_resets_total";
    /// Time spent in PIN key derivation, in seconds
    pub const KDF_DURATION_SECONDS: &str = "ledgerlock_vault_kdf_duration_seconds";
    /// 1 while unlocked, 0 while locked
    pub const UNLOCKED: &str = "ledgerlock_vault_unlocked";
}

/// Domain blob metrics
pub mod domain {
    /// Domain payloads encrypted, labelled by `domain`
    pub const ENCRYPTS_TOTAL: &str = "ledgerlock_domain_encrypts_total";
    /// Domain payloads decrypted, labelled by `domain`
    pub const DECRYPTS_TOTAL: &str = "ledgerlock_domain_decrypts_total";
    /// Decryption failures (corruption or tampering), labelled by `domain`
    pub const DECRYPT_FAILURES_TOTAL: &str = "ledgerlock_domain_decrypt_failures_total";
}

/// Legacy plaintext migration metrics
pub mod migration {
    /// Domains moved from plaintext into the vault
    pub const DOMAINS_MIGRATED_TOTAL: &str = "ledgerlock_migration_domains_migrated_total";
    /// Domains whose legacy payload could not be migrated
    pub const DOMAINS_FAILED_TOTAL: &str = "ledgerlock_migration_domains_failed_total";
}

/// Common label keys
pub mod labels {
    pub const DOMAIN: &str = "domain";
    pub const METHOD: &str = "method";
    pub const RESULT: &str = "result";
}

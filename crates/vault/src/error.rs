//! Vault error types.

/// Errors produced by vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The PIN did not match. `attempts` is the failed-attempt count after this one.
    #[error("incorrect PIN ({attempts} failed attempts)")]
    WrongPin { attempts: u32 },

    /// Too many failed attempts; unlocking is refused until the lock expires.
    #[error("too many failed attempts, try again in {remaining_minutes} minute(s)")]
    LockedOut { remaining_minutes: u64 },

    /// The operation needs the data key but the vault is locked.
    #[error("vault is locked")]
    Locked,

    /// A ciphertext did not authenticate under the current key.
    #[error("decryption failed: data is corrupt or was tampered with")]
    DecryptionFailed,

    /// No biometric hardware, or biometrics were never enrolled.
    #[error("biometric unlock is unavailable")]
    BiometricUnavailable,

    /// The platform biometric challenge was rejected or cancelled.
    #[error("biometric authentication failed")]
    BiometricFailed,

    /// The metadata record cannot be trusted. Only a full reset recovers.
    #[error("vault metadata is corrupt: {0}")]
    MetadataCorrupt(String),

    /// `setup` was called but a metadata record already exists.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// No metadata record exists yet.
    #[error("vault is not initialized")]
    NotInitialized,

    /// The PIN does not satisfy the PIN policy.
    #[error("invalid PIN: {0}")]
    InvalidPin(String),

    /// A decrypted domain payload carries an unexpected schema version.
    #[error("schema mismatch for {domain}: expected v{expected}, found v{found}")]
    SchemaMismatch {
        domain: &'static str,
        expected: u32,
        found: u32,
    },

    /// A payload with the right schema version does not fit the typed record.
    #[error("stored {domain} record does not match its schema: {message}")]
    RecordMismatch {
        domain: &'static str,
        message: String,
    },

    /// Encryption failed (not a credential problem).
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Base64 decoding failed.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl VaultError {
    /// Whether the user can retry without destroying vault contents.
    ///
    /// `MetadataCorrupt` and `DecryptionFailed` are not: they need the
    /// confirmed reset path.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WrongPin { .. }
                | Self::LockedOut { .. }
                | Self::Locked
                | Self::BiometricUnavailable
                | Self::BiometricFailed
                | Self::InvalidPin(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;

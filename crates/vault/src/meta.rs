//! The persisted vault metadata record.

use serde::{Deserialize, Serialize};

use crate::{error::VaultError, kdf::KdfParams};

/// Highest metadata schema version this build understands.
pub const CURRENT_VERSION: u32 = 1;

/// One per installation. Holds everything needed to verify a PIN and
/// unwrap the data key, plus the lockout counters.
///
/// Never contains the PIN, the unlock key, or the data key in recoverable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub version: u32,
    /// Base64 of a 16-byte random salt. Fixed for the life of the vault.
    pub salt: String,
    pub kdf_params: KdfParams,
    /// Hex SHA-256 verifier of the current unlock key.
    pub verifier_hash: String,
    /// Data key wrapped under the current unlock key.
    pub wrapped_data_key: String,
    /// Failed unlocks since the last correct PIN.
    pub attempts: u32,
    /// Unix ms; unlocks are refused while `now < lock_until_ms`. 0 = not locked.
    pub lock_until_ms: u64,
    pub biometric_enabled: bool,
    /// 0 disables auto-lock.
    pub auto_lock_minutes: u32,
    pub created_at_ms: u64,
    pub last_unlock_ms: Option<u64>,
}

impl MetaRecord {
    /// Reject records written by a newer schema or missing required material.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.version == 0 || self.version > CURRENT_VERSION {
            return Err(VaultError::MetadataCorrupt(format!(
                "unsupported metadata version {}",
                self.version
            )));
        }
        if self.verifier_hash.len() != 64 {
            return Err(VaultError::MetadataCorrupt(
                "verifier hash has wrong length".into(),
            ));
        }
        if self.wrapped_data_key.is_empty() {
            return Err(VaultError::MetadataCorrupt("wrapped data key is empty".into()));
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> MetaRecord {
        MetaRecord {
            version: CURRENT_VERSION,
            salt: crate::kdf::generate_salt(),
            kdf_params: KdfParams::default(),
            verifier_hash: "ab".repeat(32),
            wrapped_data_key: "AQID".into(),
            attempts: 0,
            lock_until_ms: 0,
            biometric_enabled: false,
            auto_lock_minutes: 5,
            created_at_ms: 1_700_000_000_000,
            last_unlock_ms: None,
        }
    }

    #[test]
    fn sample_is_valid() {
        sample().validate().unwrap();
    }

    #[test]
    fn future_version_rejected() {
        let mut meta = sample();
        meta.version = CURRENT_VERSION + 1;
        assert!(matches!(
            meta.validate(),
            Err(VaultError::MetadataCorrupt(_))
        ));
    }

    #[test]
    fn truncated_verifier_rejected() {
        let mut meta = sample();
        meta.verifier_hash.truncate(10);
        assert!(meta.validate().is_err());
    }
}

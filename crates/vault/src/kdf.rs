//! PIN → unlock key derivation (Argon2id) and the PIN verifier.

use {
    argon2::Argon2,
    sha2::{Digest, Sha256},
    subtle::ConstantTimeEq,
    zeroize::Zeroizing,
};

use crate::error::VaultError;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Domain-separation prefix for the verifier hash.
const VERIFIER_TAG: &[u8] = b"ledgerlock-pin-verifier-v1";

/// Shortest accepted PIN.
pub const MIN_PIN_LEN: usize = 4;

/// Longest accepted PIN.
pub const MAX_PIN_LEN: usize = 6;

/// Argon2id parameters stored alongside the wrapped data key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 64 MiB = 65536).
    pub m_cost: u32,
    /// Number of iterations (default: 3).
    pub t_cost: u32,
    /// Degree of parallelism (default: 1).
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MiB
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl From<&ledgerlock_config::KdfConfig> for KdfParams {
    fn from(cfg: &ledgerlock_config::KdfConfig) -> Self {
        Self {
            m_cost: cfg.m_cost,
            t_cost: cfg.t_cost,
            p_cost: cfg.p_cost,
        }
    }
}

/// Check a PIN against the PIN policy: 4 to 6 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), VaultError> {
    if pin.is_empty() {
        return Err(VaultError::InvalidPin("PIN is empty".into()));
    }
    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::InvalidPin("PIN must contain only digits".into()));
    }
    if !(MIN_PIN_LEN..=MAX_PIN_LEN).contains(&pin.len()) {
        return Err(VaultError::InvalidPin(format!(
            "PIN must be {MIN_PIN_LEN} to {MAX_PIN_LEN} digits"
        )));
    }
    Ok(())
}

/// Derive the 256-bit unlock key from a PIN and salt.
///
/// Deterministic and side-effect free. Slow on purpose.
pub fn derive_unlock_key(
    pin: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let argon2_params = argon2::Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| VaultError::Cipher(format!("invalid KDF params: {e}")))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(pin, salt, output.as_mut())
        .map_err(|e| VaultError::Cipher(format!("KDF failed: {e}")))?;

    Ok(output)
}

/// [`derive_unlock_key`] on the blocking pool, off the async executor.
pub async fn derive_unlock_key_blocking(
    pin: &str,
    salt: Vec<u8>,
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let pin = Zeroizing::new(pin.as_bytes().to_vec());
    tokio::task::spawn_blocking(move || derive_unlock_key(&pin, &salt, &params))
        .await
        .map_err(|e| VaultError::Other(anyhow::anyhow!("KDF task failed: {e}")))?
}

/// Generate a random salt and return it as base64.
pub fn generate_salt() -> String {
    use {base64::Engine, rand::RngCore};

    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    base64::engine::general_purpose::STANDARD.encode(salt)
}

/// Decode a base64-encoded salt, rejecting anything not exactly [`SALT_LEN`] bytes.
pub fn decode_salt(b64: &str) -> Result<Vec<u8>, VaultError> {
    use base64::Engine;
    let salt = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| VaultError::MetadataCorrupt(format!("salt is not base64: {e}")))?;
    if salt.len() != SALT_LEN {
        return Err(VaultError::MetadataCorrupt(format!(
            "salt has {} bytes, expected {SALT_LEN}",
            salt.len()
        )));
    }
    Ok(salt)
}

/// One-way verifier for an unlock key, hex-encoded.
pub fn verifier_hash(unlock_key: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(VERIFIER_TAG);
    hasher.update(unlock_key);
    format!("{:x}", hasher.finalize())
}

/// Constant-time comparison of a candidate unlock key against a stored verifier.
pub fn verify(unlock_key: &[u8; 32], stored: &str) -> bool {
    let candidate = verifier_hash(unlock_key);
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn cheap() -> KdfParams {
        KdfParams {
            m_cost: 256, // Low cost for tests
            t_cost: 1,
            p_cost: 1,
        }
    }

    #[test]
    fn derive_is_deterministic() {
        let salt = b"test-salt-16byte";
        let key1 = derive_unlock_key(b"1234", salt, &cheap()).unwrap();
        let key2 = derive_unlock_key(b"1234", salt, &cheap()).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_pins_different_keys() {
        let salt = b"test-salt-16byte";
        let key1 = derive_unlock_key(b"1234", salt, &cheap()).unwrap();
        let key2 = derive_unlock_key(b"1235", salt, &cheap()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn different_salts_different_keys() {
        let key1 = derive_unlock_key(b"1234", b"salt-aaaaaaaaaaa", &cheap()).unwrap();
        let key2 = derive_unlock_key(b"1234", b"salt-bbbbbbbbbbb", &cheap()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[tokio::test]
    async fn blocking_variant_matches() {
        let salt = b"test-salt-16byte".to_vec();
        let direct = derive_unlock_key(b"908172", &salt, &cheap()).unwrap();
        let offloaded = derive_unlock_key_blocking("908172", salt, cheap())
            .await
            .unwrap();
        assert_eq!(*direct, *offloaded);
    }

    #[test]
    fn generate_and_decode_salt() {
        let decoded = decode_salt(&generate_salt()).unwrap();
        assert_eq!(decoded.len(), SALT_LEN);
    }

    #[test]
    fn short_salt_is_corrupt() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode([1u8; 8]);
        assert!(matches!(
            decode_salt(&b64),
            Err(VaultError::MetadataCorrupt(_))
        ));
    }

    #[test]
    fn verifier_accepts_same_key_only() {
        let key = [0x11u8; 32];
        let stored = verifier_hash(&key);
        assert!(verify(&key, &stored));
        assert!(!verify(&[0x12u8; 32], &stored));
        assert!(!verify(&key, "deadbeef"));
    }

    #[test]
    fn verifier_is_not_the_key() {
        let key = [0x11u8; 32];
        let stored = verifier_hash(&key);
        assert_ne!(stored, format!("{:x}", Sha256::digest(key)));
        assert_eq!(stored.len(), 64);
    }

    #[rstest]
    #[case("1234")]
    #[case("00000")]
    #[case("987654")]
    fn valid_pins(#[case] pin: &str) {
        assert!(validate_pin(pin).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("123")]
    #[case("1234567")]
    #[case("12a4")]
    #[case("12 34")]
    #[case("١٢٣٤")]
    fn invalid_pins(#[case] pin: &str) {
        assert!(matches!(validate_pin(pin), Err(VaultError::InvalidPin(_))));
    }

    #[test]
    fn kdf_params_serialization() {
        let params = KdfParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let parsed: KdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }
}

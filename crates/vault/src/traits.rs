//! Cipher trait for swappable authenticated encryption backends.

use crate::error::VaultError;

/// Authenticated encryption with associated data (AEAD).
///
/// Each implementation has a unique version tag that prefixes every stored
/// blob, so a future cipher can be introduced without guessing formats.
pub trait Cipher: Send + Sync + 'static {
    /// Unique identifier for this cipher (stored as the first byte of the blob).
    fn version_tag(&self) -> u8;

    /// Encrypt `plaintext` with `key`, binding `aad`.
    ///
    /// Returns `[nonce || ciphertext || tag]`; the exact layout is
    /// cipher-specific but must be parseable by [`decrypt`](Self::decrypt).
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Any authentication failure is reported as [`VaultError::DecryptionFailed`].
    fn decrypt(&self, key: &[u8; 32], ciphertext: &[u8], aad: &[u8])
    -> Result<Vec<u8>, VaultError>;

    /// Encrypt and frame as base64(`version_tag || encrypt(..)`).
    fn seal_b64(&self, key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<String, VaultError> {
        use base64::Engine;

        let encrypted = self.encrypt(key, plaintext, aad)?;
        let mut blob = Vec::with_capacity(1 + encrypted.len());
        blob.push(self.version_tag());
        blob.extend_from_slice(&encrypted);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    /// Reverse of [`seal_b64`](Self::seal_b64).
    ///
    /// Bad framing (invalid base64, empty, foreign version tag) is treated the
    /// same as a failed tag check: the blob cannot be trusted.
    fn open_b64(&self, key: &[u8; 32], b64: &str, aad: &[u8]) -> Result<Vec<u8>, VaultError> {
        use base64::Engine;

        let blob = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|_| VaultError::DecryptionFailed)?;
        match blob.split_first() {
            Some((&tag, rest)) if tag == self.version_tag() => self.decrypt(key, rest, aad),
            _ => Err(VaultError::DecryptionFailed),
        }
    }
}

//! XChaCha20-Poly1305 implementation of the [`Cipher`] trait.

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;

use crate::{error::VaultError, traits::Cipher};

/// Version tag for the XChaCha20-Poly1305 cipher.
pub const VERSION_TAG: u8 = 0x01;

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
const NONCE_LEN: usize = 24;

/// Poly1305 tag size.
const TAG_LEN: usize = 16;

/// XChaCha20-Poly1305 AEAD cipher.
///
/// Encrypted layout: `[nonce: 24 bytes][ciphertext + Poly1305 tag: N + 16 bytes]`.
/// The 192-bit nonce is random per call, so one data key can encrypt every
/// domain blob for the device's lifetime without nonce bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaCha20Poly1305Cipher;

impl Cipher for XChaCha20Poly1305Cipher {
    fn version_tag(&self) -> u8 {
        VERSION_TAG
    }

    #[allow(deprecated)]
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, VaultError> {
        let cipher = XChaCha20Poly1305::new(key.into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, Payload {
                msg: plaintext,
                aad,
            })
            .map_err(|e| VaultError::Cipher(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    #[allow(deprecated)]
    fn decrypt(
        &self,
        key: &[u8; 32],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::DecryptionFailed);
        }

        let (nonce_bytes, ct) = ciphertext.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = XChaCha20Poly1305::new(key.into());

        cipher
            .decrypt(nonce, Payload { msg: ct, aad })
            .map_err(|_| VaultError::DecryptionFailed)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_aad() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x42u8; 32];

        let encrypted = cipher
            .encrypt(&key, b"[{\"id\":\"inv_1\"}]", b"domain:inventory")
            .unwrap();
        let decrypted = cipher
            .decrypt(&key, &encrypted, b"domain:inventory")
            .unwrap();
        assert_eq!(decrypted, b"[{\"id\":\"inv_1\"}]");
    }

    #[test]
    fn wrong_key_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let encrypted = cipher.encrypt(&[0x42u8; 32], b"secret", b"").unwrap();
        let result = cipher.decrypt(&[0x43u8; 32], &encrypted, b"");
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn wrong_aad_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x42u8; 32];

        let encrypted = cipher.encrypt(&key, b"secret", b"domain:credits").unwrap();
        let result = cipher.decrypt(&key, &encrypted, b"domain:profits");
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x42u8; 32];

        let mut encrypted = cipher.encrypt(&key, b"secret", b"").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(cipher.decrypt(&key, &encrypted, b"").is_err());
    }

    #[test]
    fn too_short_ciphertext_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let result = cipher.decrypt(&[0x42u8; 32], &[0u8; 30], b"");
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn fresh_nonce_per_call() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x42u8; 32];

        let enc1 = cipher.encrypt(&key, b"same input", b"").unwrap();
        let enc2 = cipher.encrypt(&key, b"same input", b"").unwrap();
        assert_ne!(enc1, enc2);
    }

    #[test]
    fn b64_framing_round_trip() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x07u8; 32];

        let sealed = cipher.seal_b64(&key, b"{}", b"domain:settings").unwrap();
        let opened = cipher.open_b64(&key, &sealed, b"domain:settings").unwrap();
        assert_eq!(opened, b"{}");
    }

    #[test]
    fn b64_framing_rejects_garbage() {
        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x07u8; 32];

        assert!(matches!(
            cipher.open_b64(&key, "not base64!!", b""),
            Err(VaultError::DecryptionFailed)
        ));
        assert!(matches!(
            cipher.open_b64(&key, "", b""),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn b64_framing_rejects_foreign_version() {
        use base64::Engine;

        let cipher = XChaCha20Poly1305Cipher;
        let key = [0x07u8; 32];
        let sealed = cipher.seal_b64(&key, b"x", b"").unwrap();
        let mut blob = base64::engine::general_purpose::STANDARD
            .decode(&sealed)
            .unwrap();
        blob[0] = 0x7F;
        let relabeled = base64::engine::general_purpose::STANDARD.encode(blob);

        assert!(matches!(
            cipher.open_b64(&key, &relabeled, b""),
            Err(VaultError::DecryptionFailed)
        ));
    }
}

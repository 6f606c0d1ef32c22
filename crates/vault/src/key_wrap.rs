//! Data-key wrapping / unwrapping using the [`Cipher`] trait.
//!
//! The data key is encrypted with a key-encryption key (the PIN-derived unlock
//! key, or a biometric-released key) using the same AEAD cipher as domain
//! data. A distinct AAD per wrapping purpose keeps wrapped keys from being
//! mistaken for domain blobs or for each other.

use zeroize::Zeroizing;

use crate::{error::VaultError, traits::Cipher};

/// AAD for wrapping under the PIN-derived unlock key.
pub const PIN_WRAP_AAD: &[u8] = b"dek-wrap";

/// AAD for wrapping under the biometric-released key.
pub const ESCROW_WRAP_AAD: &[u8] = b"biometric-escrow";

/// Wrap `dek` under `kek`, returning a version-tagged base64 blob.
pub fn wrap_dek<C: Cipher>(
    cipher: &C,
    kek: &[u8; 32],
    dek: &[u8; 32],
    aad: &[u8],
) -> Result<String, VaultError> {
    cipher.seal_b64(kek, dek, aad)
}

/// Unwrap a data key previously wrapped with [`wrap_dek`].
pub fn unwrap_dek<C: Cipher>(
    cipher: &C,
    kek: &[u8; 32],
    wrapped_b64: &str,
    aad: &[u8],
) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let plaintext = Zeroizing::new(cipher.open_b64(kek, wrapped_b64, aad)?);

    if plaintext.len() != 32 {
        return Err(VaultError::DecryptionFailed);
    }

    let mut dek = Zeroizing::new([0u8; 32]);
    dek.copy_from_slice(&plaintext);
    Ok(dek)
}

/// Generate a fresh random data key.
pub fn generate_dek() -> Zeroizing<[u8; 32]> {
    let mut dek = Zeroizing::new([0u8; 32]);
    rand::RngCore::fill_bytes(&mut rand::rng(), dek.as_mut());
    dek
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::xchacha20::XChaCha20Poly1305Cipher, base64::Engine};

    #[test]
    fn round_trip() {
        let cipher = XChaCha20Poly1305Cipher;
        let kek = [0xAA; 32];
        let dek = [0xBB; 32];

        let wrapped = wrap_dek(&cipher, &kek, &dek, PIN_WRAP_AAD).unwrap();
        let unwrapped = unwrap_dek(&cipher, &kek, &wrapped, PIN_WRAP_AAD).unwrap();
        assert_eq!(*unwrapped, dek);
    }

    #[test]
    fn wrong_kek_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let wrapped = wrap_dek(&cipher, &[0xAA; 32], &[0xBB; 32], PIN_WRAP_AAD).unwrap();
        let result = unwrap_dek(&cipher, &[0xCC; 32], &wrapped, PIN_WRAP_AAD);
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn purposes_do_not_cross() {
        let cipher = XChaCha20Poly1305Cipher;
        let kek = [0xAA; 32];
        let wrapped = wrap_dek(&cipher, &kek, &[0xBB; 32], ESCROW_WRAP_AAD).unwrap();
        assert!(unwrap_dek(&cipher, &kek, &wrapped, PIN_WRAP_AAD).is_err());
    }

    #[test]
    fn tampered_wrapped_fails() {
        let cipher = XChaCha20Poly1305Cipher;
        let kek = [0xAA; 32];

        let wrapped = wrap_dek(&cipher, &kek, &[0xBB; 32], PIN_WRAP_AAD).unwrap();
        let mut blob = base64::engine::general_purpose::STANDARD
            .decode(&wrapped)
            .unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = base64::engine::general_purpose::STANDARD.encode(&blob);

        assert!(unwrap_dek(&cipher, &kek, &tampered, PIN_WRAP_AAD).is_err());
    }

    #[test]
    fn wrong_length_payload_rejected() {
        let cipher = XChaCha20Poly1305Cipher;
        let kek = [0xAA; 32];
        let sealed = cipher.seal_b64(&kek, &[0u8; 16], PIN_WRAP_AAD).unwrap();
        assert!(matches!(
            unwrap_dek(&cipher, &kek, &sealed, PIN_WRAP_AAD),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(*generate_dek(), *generate_dek());
    }
}

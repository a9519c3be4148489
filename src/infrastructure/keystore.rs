//! Sealing and unsealing of custodial wallet secrets.
//!
//! Secrets rest as hex-encoded `nonce || AES-256-GCM ciphertext` under a
//! process-wide key. The key must be provisioned externally; regenerating it
//! on restart would silently orphan every sealed wallet, so a missing or
//! malformed key is a hard startup failure, never a generated fallback.

use crate::domain::errors::KeystoreError;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;

/// Process-wide sealer for wallet secrets.
pub struct Keystore {
    cipher: Aes256Gcm,
}

impl Keystore {
    /// Build from externally provisioned key material. A 64-char hex string
    /// is taken as the raw 32-byte key; anything else is hashed down to 32
    /// bytes, with a minimum length so a one-word passphrase cannot slip in.
    pub fn from_key_material(material: &str) -> Result<Self, KeystoreError> {
        let material = material.trim();
        if material.is_empty() {
            return Err(KeystoreError::KeyMissing);
        }

        let key_bytes: Zeroizing<[u8; 32]> = if material.len() == 64 {
            let decoded = hex::decode(material)
                .map_err(|e| KeystoreError::KeyMalformed(e.to_string()))?;
            let mut out = [0u8; 32];
            out.copy_from_slice(&decoded);
            Zeroizing::new(out)
        } else if material.len() >= 16 {
            let mut hasher = Sha256::new();
            hasher.update(material.as_bytes());
            Zeroizing::new(hasher.finalize().into())
        } else {
            return Err(KeystoreError::KeyMalformed(
                "key material shorter than 16 characters".to_string(),
            ));
        };

        let key = Key::<Aes256Gcm>::from_slice(key_bytes.as_ref());
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Seal a secret, returning hex-encoded nonce-prefixed ciphertext.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, KeystoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| KeystoreError::SealFailed)?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Unseal a hex-encoded sealed secret. The plaintext is zeroized on drop.
    pub fn unseal(&self, sealed_hex: &str) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
        let bytes = hex::decode(sealed_hex).map_err(|e| KeystoreError::Encoding(e.to_string()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(KeystoreError::CiphertextTruncated);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| KeystoreError::DecryptFailed)?;
        Ok(Zeroizing::new(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_unseal_roundtrip() {
        let ks = Keystore::from_key_material("a sufficiently long passphrase").unwrap();
        let sealed = ks.seal(b"super secret keypair bytes").unwrap();
        assert_ne!(sealed, hex::encode(b"super secret keypair bytes"));
        let opened = ks.unseal(&sealed).unwrap();
        assert_eq!(opened.as_slice(), b"super secret keypair bytes");
    }

    #[test]
    fn wrong_key_fails_to_unseal() {
        let ks1 = Keystore::from_key_material("first key material here!").unwrap();
        let ks2 = Keystore::from_key_material("second key material here").unwrap();
        let sealed = ks1.seal(b"payload").unwrap();
        assert!(matches!(
            ks2.unseal(&sealed),
            Err(KeystoreError::DecryptFailed)
        ));
    }

    #[test]
    fn hex_key_accepted_raw() {
        let hex_key = "ab".repeat(32);
        assert!(Keystore::from_key_material(&hex_key).is_ok());
    }

    #[test]
    fn short_or_empty_key_rejected() {
        assert!(matches!(
            Keystore::from_key_material(""),
            Err(KeystoreError::KeyMissing)
        ));
        assert!(matches!(
            Keystore::from_key_material("tooshort"),
            Err(KeystoreError::KeyMalformed(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_rejected() {
        let ks = Keystore::from_key_material("a sufficiently long passphrase").unwrap();
        assert!(matches!(
            ks.unseal("0011"),
            Err(KeystoreError::CiphertextTruncated)
        ));
        assert!(matches!(
            ks.unseal("zz"),
            Err(KeystoreError::Encoding(_))
        ));
    }
}

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine as _;
use rand::RngCore;

use crate::error::SyncError;

/// AES-256-GCM encryption for OAuth tokens at rest.
///
/// Access and refresh tokens are never written to the database in plaintext;
/// the stored form is base64(nonce || ciphertext).
pub struct CryptoEngine {
    cipher: Aes256Gcm,
}

impl CryptoEngine {
    /// Create a new CryptoEngine from a base64-encoded 32-byte master key.
    pub fn new(master_key_b64: &str) -> Result<Self, SyncError> {
        let master_key = base64::engine::general_purpose::STANDARD
            .decode(master_key_b64)
            .map_err(|e| SyncError::Encryption(format!("Invalid MASTER_KEY base64: {e}")))?;

        if master_key.len() != 32 {
            return Err(SyncError::Encryption(format!(
                "MASTER_KEY must be 32 bytes, got {}",
                master_key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&master_key)
            .map_err(|e| SyncError::Encryption(format!("Failed to init AES cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Encrypt plaintext. Returns base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SyncError> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SyncError::Encryption(format!("Encryption failed: {e}")))?;

        // Prepend nonce to ciphertext
        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt base64(nonce || ciphertext) back to plaintext.
    pub fn decrypt(&self, encrypted_b64: &str) -> Result<String, SyncError> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(encrypted_b64)
            .map_err(|e| SyncError::Decryption(format!("Invalid base64: {e}")))?;

        if combined.len() < 12 {
            return Err(SyncError::Decryption("Ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SyncError::Decryption(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| SyncError::Decryption(format!("Invalid UTF-8 after decrypt: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> CryptoEngine {
        // 32-byte key for AES-256, base64 encoded
        let key = base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]);
        CryptoEngine::new(&key).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let engine = test_engine();
        let plaintext = "b2c7e1f0a9d8-strava-refresh-token";
        let encrypted = engine.encrypt(plaintext).unwrap();
        assert_ne!(encrypted, plaintext);
        let decrypted = engine.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_produces_different_ciphertexts() {
        let engine = test_engine();
        let plaintext = "same-input";
        let a = engine.encrypt(plaintext).unwrap();
        let b = engine.encrypt(plaintext).unwrap();
        // Fresh nonce per call
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_short_key() {
        let short = base64::engine::general_purpose::STANDARD.encode([0x42u8; 16]);
        assert!(CryptoEngine::new(&short).is_err());
    }

    #[test]
    fn test_rejects_truncated_ciphertext() {
        let engine = test_engine();
        let truncated = base64::engine::general_purpose::STANDARD.encode([0u8; 8]);
        assert!(engine.decrypt(&truncated).is_err());
    }
}

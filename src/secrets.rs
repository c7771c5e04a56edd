//! At-rest encryption for secret settings (AES-256-GCM).
//!
//! Stored form is `<24 hex nonce>:<hex ciphertext+tag>`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

const NONCE_LEN: usize = 12;
// AES-GCM appends a 16 byte tag, so even an empty plaintext yields 32 hex chars.
static ENCRYPTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{24}:(?:[0-9a-f]{2}){16,}$").expect("valid ciphertext regex")
});

/// True when `value` already has the stored ciphertext shape.
pub fn is_encrypted(value: &str) -> bool {
    ENCRYPTED_RE.is_match(value)
}

#[derive(Clone)]
pub struct SettingsCipher {
    key: [u8; 32],
}

impl SettingsCipher {
    /// Derive the 256-bit key from the configured passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.trim().is_empty() {
            return Err(AppError::Config(
                "SETTINGS_ENCRYPTION_KEY must not be empty".to_string(),
            ));
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Ok(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.key).into())
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| AppError::Crypto(e.to_string()))?;

        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let (nonce_hex, body_hex) = stored
            .split_once(':')
            .ok_or_else(|| AppError::Crypto("value is not in nonce:ciphertext form".to_string()))?;

        let nonce = hex::decode(nonce_hex).map_err(|e| AppError::Crypto(e.to_string()))?;
        if nonce.len() != NONCE_LEN {
            return Err(AppError::Crypto(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            )));
        }
        let body = hex::decode(body_hex).map_err(|e| AppError::Crypto(e.to_string()))?;

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(&nonce), body.as_ref())
            .map_err(|e| AppError::Crypto(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| AppError::Crypto(e.to_string()))
    }
}

impl std::fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SettingsCipher(..)")
    }
}

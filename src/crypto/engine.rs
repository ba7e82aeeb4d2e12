use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 32;

fn new_hmac(key: &[u8]) -> Result<HmacSha256, AppError> {
    <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| AppError::Crypto(format!("HMAC init failed: {e}")))
}

fn decode_key(name: &str, key_b64: &str) -> Result<Vec<u8>, AppError> {
    let key = base64::engine::general_purpose::STANDARD
        .decode(key_b64)
        .map_err(|e| AppError::Crypto(format!("Invalid {name} base64: {e}")))?;

    if key.len() != 32 {
        return Err(AppError::Crypto(format!(
            "{name} must be 32 bytes, got {}",
            key.len()
        )));
    }

    Ok(key)
}

/// AES-256-GCM for token blobs at rest, HMAC-SHA256 for session cookies
/// and OAuth state.
#[derive(Clone)]
pub struct CryptoEngine {
    cipher: Aes256Gcm,
    hmac_key: Vec<u8>,
}

impl CryptoEngine {
    /// Create a new CryptoEngine from base64-encoded keys.
    pub fn new(master_key_b64: &str, session_secret_b64: &str) -> Result<Self, AppError> {
        let master_key = decode_key("MASTER_KEY", master_key_b64)?;
        let hmac_key = decode_key("SESSION_SECRET", session_secret_b64)?;

        let cipher = Aes256Gcm::new_from_slice(&master_key)
            .map_err(|e| AppError::Crypto(format!("Failed to init AES cipher: {e}")))?;

        Ok(Self { cipher, hmac_key })
    }

    /// Encrypt plaintext. Returns base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Crypto(format!("Encryption failed: {e}")))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&sealed))
    }

    /// Decrypt base64(nonce || ciphertext) back to plaintext.
    pub fn decrypt(&self, sealed_b64: &str) -> Result<String, AppError> {
        let sealed = base64::engine::general_purpose::STANDARD
            .decode(sealed_b64)
            .map_err(|e| AppError::Crypto(format!("Invalid base64: {e}")))?;

        if sealed.len() < NONCE_LEN {
            return Err(AppError::Crypto("Ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| AppError::Crypto(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Crypto(format!("Invalid UTF-8 after decrypt: {e}")))
    }

    /// Sign a payload. Returns URL-safe base64(hmac || payload).
    pub fn sign(&self, payload: &str) -> Result<String, AppError> {
        let mut mac = new_hmac(&self.hmac_key)?;
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();

        let mut signed = tag.to_vec();
        signed.extend_from_slice(payload.as_bytes());

        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&signed))
    }

    /// Verify a value produced by [`sign`](Self::sign) and return its payload.
    pub fn verify_signed(&self, signed: &str) -> Result<String, AppError> {
        let signed = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signed)
            .map_err(|_| AppError::InvalidState)?;

        if signed.len() < TAG_LEN {
            return Err(AppError::InvalidState);
        }

        let (tag, payload) = signed.split_at(TAG_LEN);

        let mut mac = new_hmac(&self.hmac_key)?;
        mac.update(payload);
        mac.verify_slice(tag).map_err(|_| AppError::InvalidState)?;

        String::from_utf8(payload.to_vec()).map_err(|_| AppError::InvalidState)
    }
}

#[cfg(test)]
pub(crate) fn test_engine() -> CryptoEngine {
    let key = base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]);
    let secret = base64::engine::general_purpose::STANDARD.encode([0x43u8; 32]);
    CryptoEngine::new(&key, &secret).unwrap()
}

//! Per-response symmetric keys
//!
//! A [`SessionKey`] lives for exactly one request/response exchange. It is
//! derived from a P-384 ECDH shared secret with HKDF-SHA256 (no salt, fixed
//! context string) and encrypts with ChaCha20-Poly1305.
//!
//! Ciphertext layout: `nonce (12 bytes) || ciphertext || auth_tag (16 bytes)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the derived key in bytes (256 bits)
pub const SESSION_KEY_SIZE: usize = 32;
/// HKDF context string shared by every node in the federation
pub const HANDSHAKE_INFO: &[u8] = b"handshake data";

#[derive(Debug, thiserror::Error)]
pub enum SessionKeyError {
    #[error("session key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Symmetric key for a single encrypted response
///
/// The key bytes are zeroized on drop.
pub struct SessionKey(Zeroizing<[u8; SESSION_KEY_SIZE]>);

impl SessionKey {
    /// Run HKDF-SHA256 over raw ECDH output
    pub fn derive(shared_secret: &[u8]) -> Result<Self, SessionKeyError> {
        let hk = Hkdf::<Sha256>::new(None, shared_secret);
        let mut okm = Zeroizing::new([0u8; SESSION_KEY_SIZE]);
        hk.expand(HANDSHAKE_INFO, okm.as_mut())
            .map_err(|_| anyhow::anyhow!("hkdf output length rejected"))?;
        Ok(Self(okm))
    }

    /// Encrypt with a fresh random nonce
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SessionKeyError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.0.as_ref()));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt and authenticate. Any tampering fails as a whole.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SessionKeyError> {
        if data.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("data too short for nonce").into());
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.0.as_ref()));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let plaintext = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_same_secret_derives_same_key() {
        let a = SessionKey::derive(b"shared secret bytes").unwrap();
        let b = SessionKey::derive(b"shared secret bytes").unwrap();

        let ciphertext = a.encrypt(b"payload").unwrap();
        assert_eq!(b.decrypt(&ciphertext).unwrap(), b"payload");
    }

    #[test]
    fn test_different_secret_fails() {
        let a = SessionKey::derive(b"one secret").unwrap();
        let b = SessionKey::derive(b"another secret").unwrap();

        let ciphertext = a.encrypt(b"payload").unwrap();
        assert!(b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_tampering_detected() {
        let key = SessionKey::derive(b"secret").unwrap();
        let mut ciphertext = key.encrypt(b"some longer payload").unwrap();

        ciphertext[NONCE_SIZE + 3] ^= 0x01;
        assert!(key.decrypt(&ciphertext).is_err());
        assert!(key.decrypt(&ciphertext[..4]).is_err());
    }

    #[test]
    fn test_empty_payload() {
        let key = SessionKey::derive(b"secret").unwrap();
        let ciphertext = key.encrypt(b"").unwrap();
        assert!(key.decrypt(&ciphertext).unwrap().is_empty());
    }
}

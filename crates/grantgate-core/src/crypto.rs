//! Authenticated encryption for grant tokens.
//!
//! ChaCha20-Poly1305 under a single process-wide key. Every sealed message is
//! self-contained: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;

use crate::error::{CoreError, Result};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A 256-bit grant key.
#[derive(Clone, PartialEq, Eq)]
pub struct GrantKey([u8; KEY_LEN]);

impl GrantKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string (64 hex digits).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GrantKey(<redacted>)")
    }
}

/// Seals and opens opaque payloads under a fixed key.
///
/// A fresh random nonce is drawn for every call to [`encrypt`](Self::encrypt),
/// so two encryptions of the same plaintext never share a nonce.
#[derive(Clone)]
pub struct AuthenticatedEncrypter {
    cipher: ChaCha20Poly1305,
}

impl AuthenticatedEncrypter {
    pub fn new(key: &GrantKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CoreError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a message produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`CoreError::AuthenticationFailure`] on truncation, tampering
    /// or a foreign key. Never returns partially decrypted data.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CoreError::AuthenticationFailure);
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);

        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::AuthenticationFailure)
    }
}

impl fmt::Debug for AuthenticatedEncrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedEncrypter").finish_non_exhaustive()
    }
}

/// Hex-encoded BLAKE3 digest of `data`.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

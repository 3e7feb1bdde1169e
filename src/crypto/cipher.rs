//! AES-256-GCM payload cipher
//!
//! Sealed layout:
//!
//! ```text
//! +-----------+---------------------------+
//! | Nonce(12) | Ciphertext || Tag(16)     |
//! +-----------+---------------------------+
//! ```

use std::fmt;

// aes-gcm relies on generic-array 0.14, so suppress the upstream deprecation locally.
#[allow(deprecated)]
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::rngs::OsRng;
use rand::RngCore;

use super::errors::{CipherError, CipherResult};
use super::kdf::{derive_key, DerivedKey};

/// Nonce length prepended to every sealed payload
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Payload cipher. `Passthrough` when the database has no password.
#[derive(Clone)]
pub enum Cipher {
    /// Identity transform
    Passthrough,
    /// AES-256-GCM with a derived key
    Aead(Box<Aes256Gcm>),
}

#[allow(deprecated)]
impl Cipher {
    /// Cipher for databases without a password
    pub fn passthrough() -> Self {
        Cipher::Passthrough
    }

    /// Cipher bound to an already derived key
    pub fn from_key(key: &DerivedKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Cipher::Aead(Box::new(cipher))
    }

    /// Derive the key from `password` and `salt` and bind a cipher to it
    pub fn from_password(password: &str, salt: &[u8]) -> CipherResult<Self> {
        let key = derive_key(password, salt)?;
        Ok(Self::from_key(&key))
    }

    /// Whether payloads are actually encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Cipher::Aead(_))
    }

    /// Seal `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let cipher = match self {
            Cipher::Passthrough => return Ok(plaintext.to_vec()),
            Cipher::Aead(cipher) => cipher,
        };

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open a payload sealed by [`Cipher::encrypt`].
    ///
    /// A wrong key and a tampered ciphertext are indistinguishable here; both
    /// yield [`CipherError::Authentication`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        let cipher = match self {
            Cipher::Passthrough => return Ok(ciphertext.to_vec()),
            Cipher::Aead(cipher) => cipher,
        };

        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated(ciphertext.len()));
        }

        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);

        cipher
            .decrypt(GenericArray::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Authentication)
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cipher::Passthrough => f.write_str("Cipher::Passthrough"),
            Cipher::Aead(_) => f.write_str("Cipher::Aead(<redacted>)"),
        }
    }
}

//! Cipher errors

use thiserror::Error;

/// Result type for cipher operations
pub type CipherResult<T> = Result<T, CipherError>;

/// Errors raised by key derivation and AEAD operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("salt must be at least {min} bytes, got {actual}")]
    SaltTooShort { min: usize, actual: usize },

    #[error("encryption failed")]
    Encrypt,

    #[error("ciphertext too short: {0} bytes")]
    Truncated(usize),

    #[error("authentication failed: wrong password or corrupted ciphertext")]
    Authentication,
}

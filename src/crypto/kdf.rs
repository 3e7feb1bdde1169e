//! Password-based key derivation
//!
//! argon2id with fixed parameters. The parameters are part of the on-disk
//! format: changing them makes every existing encrypted database unreadable.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use super::errors::{CipherError, CipherResult};

/// Derived key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Salt length generated for new databases
pub const SALT_LEN: usize = 16;

/// Minimum salt length accepted by argon2
const MIN_SALT_LEN: usize = 8;

/// Memory cost in KiB
const M_COST: u32 = 19 * 1024;
/// Iterations
const T_COST: u32 = 2;
/// Lanes
const P_COST: u32 = 1;

/// Symmetric key derived from a password and salt.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derive a key from `password` and `salt`.
///
/// Deterministic: the same password and salt always produce the same key.
pub fn derive_key(password: &str, salt: &[u8]) -> CipherResult<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CipherError::SaltTooShort {
            min: MIN_SALT_LEN,
            actual: salt.len(),
        });
    }

    let params = Params::new(M_COST, T_COST, P_COST, Some(KEY_LEN))
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(key))
}

/// Generate a fresh random salt for a new database
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

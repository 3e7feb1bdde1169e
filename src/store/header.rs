//! Database header entry
//!
//! The first entry of every archive is `__arcdb__.json`. It records who
//! created the database and, for encrypted databases, the key derivation
//! salt plus a sealed verifier used to reject a wrong password on open.
//! Losing this entry makes encrypted payloads unrecoverable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{generate_salt, Cipher, CipherError};
use crate::errors::{DbError, DbResult};
use crate::record::FORMAT_VERSION;

/// Reserved header entry name
pub const HEADER_ENTRY: &str = "__arcdb__.json";

/// Plaintext sealed into the verifier
const VERIFIER_PLAINTEXT: &[u8] = b"arcdb-key-verifier-v1";

/// Header persisted in the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHeader {
    /// Database name at creation
    pub name: String,
    /// Configured schema/format tag at creation
    pub version: String,
    /// Record frame format version
    pub format_version: u8,
    /// Creation timestamp (RFC 3339, UTC)
    pub created_at: String,
    /// Whether payloads are encrypted
    pub encrypted: bool,
    /// Base64 key derivation salt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Base64 sealed verifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
}

impl DatabaseHeader {
    /// Build the header for a new database.
    ///
    /// With a password, a fresh salt is generated and the returned cipher is
    /// bound to the key derived from it.
    pub fn create(name: &str, version: &str, password: Option<&str>) -> DbResult<(Self, Cipher)> {
        let mut header = Self {
            name: name.to_string(),
            version: version.to_string(),
            format_version: FORMAT_VERSION,
            created_at: crate::store::now_rfc3339(),
            encrypted: false,
            salt: None,
            verifier: None,
        };

        let Some(password) = password else {
            return Ok((header, Cipher::passthrough()));
        };

        let salt = generate_salt();
        let cipher = Cipher::from_password(password, &salt)
            .map_err(|e| DbError::decryption("key derivation failed", e))?;
        let verifier = cipher
            .encrypt(VERIFIER_PLAINTEXT)
            .map_err(|e| DbError::decryption("failed to seal key verifier", e))?;

        header.encrypted = true;
        header.salt = Some(STANDARD.encode(salt));
        header.verifier = Some(STANDARD.encode(verifier));
        Ok((header, cipher))
    }

    /// Serialize to the entry body
    pub fn to_bytes(&self) -> DbResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| DbError::corrupt_entry(HEADER_ENTRY, format!("serialize failed: {}", e)))
    }

    /// Parse an entry body
    pub fn from_bytes(data: &[u8]) -> DbResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| DbError::corrupt_entry(HEADER_ENTRY, format!("invalid header: {}", e)))
    }

    /// Build the cipher for an existing database from the caller's password.
    ///
    /// Fails with `InvalidConfig` when the password presence does not match
    /// the database, and with `Decryption` when the password is wrong.
    pub fn unlock(&self, password: Option<&str>) -> DbResult<Cipher> {
        match (self.encrypted, password) {
            (false, None) => Ok(Cipher::passthrough()),
            (false, Some(_)) => Err(DbError::invalid_config(
                "database is not encrypted but a password was configured",
            )),
            (true, None) => Err(DbError::invalid_config(
                "database is encrypted and no password was configured",
            )),
            (true, Some(password)) => {
                let salt = self.decode_field(&self.salt, "salt")?;
                let verifier = self.decode_field(&self.verifier, "verifier")?;

                let cipher = Cipher::from_password(password, &salt)
                    .map_err(|e| DbError::decryption("key derivation failed", e))?;
                let opened = cipher
                    .decrypt(&verifier)
                    .map_err(|e| DbError::decryption("wrong password", e))?;
                if opened != VERIFIER_PLAINTEXT {
                    return Err(DbError::decryption(
                        "wrong password",
                        CipherError::Authentication,
                    ));
                }
                Ok(cipher)
            }
        }
    }

    fn decode_field(&self, field: &Option<String>, name: &str) -> DbResult<Vec<u8>> {
        let encoded = field
            .as_deref()
            .ok_or_else(|| DbError::corrupt_entry(HEADER_ENTRY, format!("missing {}", name)))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| DbError::corrupt_entry(HEADER_ENTRY, format!("bad {}: {}", name, e)))
    }
}

//! SHA-256 payload checksums
//!
//! Computed over the plaintext payload at write time and re-verified on
//! every read, after decryption.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Checksum length in bytes
pub const CHECKSUM_LEN: usize = 32;

/// Computes the SHA-256 digest of `data`.
pub fn compute_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Verifies that `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: &[u8; CHECKSUM_LEN]) -> bool {
    compute_checksum(data).ct_eq(expected).into()
}

/// Formats a checksum as lowercase hex, as stored in record metadata.
pub fn checksum_hex(checksum: &[u8; CHECKSUM_LEN]) -> String {
    checksum.iter().map(|b| format!("{:02x}", b)).collect()
}

//! Payload encryption for arcdb
//!
//! A password is stretched with argon2id over a per-database salt into a
//! 256-bit key. Payloads are sealed with AES-256-GCM using a fresh nonce per
//! call, so encrypting the same payload twice never yields the same bytes.
//!
//! Without a password the cipher is a passthrough and the record checksum is
//! the only integrity signal.

mod cipher;
mod errors;
mod kdf;

pub use cipher::{Cipher, NONCE_LEN, TAG_LEN};
pub use errors::{CipherError, CipherResult};
pub use kdf::{derive_key, generate_salt, DerivedKey, KEY_LEN, SALT_LEN};

//! arcdb - A record store inside a single archive file
//!
//! Records are named byte strings with metadata, kept as entries of one tar
//! archive. Payloads can be encrypted with a password, every record carries
//! a SHA-256 checksum, and updates or deletes that must remove bytes rewrite
//! the archive through a temp file and an atomic rename.
//!
//! Layers, leaves first:
//! - `archive`: tar container with per-entry deflate
//! - `crypto`: argon2 key derivation and AES-256-GCM
//! - `record`: record type, frame codec and entry naming
//! - `store`: record operations and the rebuild protocol
//! - `database`: configuration, lazy open, auto-compact, backup

pub mod archive;
pub mod cli;
pub mod crash_point;
pub mod crypto;
pub mod database;
pub mod errors;
pub mod observability;
pub mod record;
pub mod store;

pub use database::{Database, DatabaseConfig};
pub use errors::{DbError, DbErrorCode, DbResult, Severity};
pub use record::{Metadata, Record};
pub use store::{RecordStore, StoreOptions, StoreStats};

//! Record store
//!
//! Owns one archive and implements the record operations on top of it.
//! Inserts and fast-path updates append a new entry. Every change that has
//! to remove bytes (replacing update, delete, compact) rebuilds the whole
//! archive into a temp file and renames it over the original.
//!
//! # Liveness
//!
//! No index is persisted. Each operation re-reads the entry names and
//! resolves every key to its highest-sequence entry.

mod engine;
mod header;
mod rebuild;
mod resolve;

pub use engine::{RecordStore, StoreOptions, StoreStats};
pub use header::{DatabaseHeader, HEADER_ENTRY};
pub use resolve::{LiveEntry, Resolution};

use chrono::{SecondsFormat, Utc};

/// Current time as RFC 3339 UTC with microseconds
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

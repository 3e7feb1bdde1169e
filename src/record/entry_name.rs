//! Physical entry names
//!
//! Keys are base64url encoded so any key, including ones with `/`, `..` or
//! non-ASCII characters, maps to a safe archive path. The sequence number is
//! zero-padded so lexical and numeric order agree.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Directory prefix shared by every record entry
pub const RECORD_PREFIX: &str = "records/";

/// A parsed record entry name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName {
    /// Record key
    pub key: String,
    /// Per-key revision counter, starting at 1
    pub seq: u64,
}

/// Builds the entry name for revision `seq` of `key`.
pub fn entry_name(key: &str, seq: u64) -> String {
    format!(
        "{}{}.{:020}",
        RECORD_PREFIX,
        URL_SAFE_NO_PAD.encode(key.as_bytes()),
        seq
    )
}

/// Whether `name` lives in the record namespace
pub fn is_record_entry(name: &str) -> bool {
    name.starts_with(RECORD_PREFIX)
}

/// Parses a record entry name. Returns `None` for anything malformed.
pub fn parse_entry_name(name: &str) -> Option<EntryName> {
    let rest = name.strip_prefix(RECORD_PREFIX)?;
    let (encoded, seq) = rest.rsplit_once('.')?;
    let seq = seq.parse::<u64>().ok()?;
    let key_bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let key = String::from_utf8(key_bytes).ok()?;
    Some(EntryName { key, seq })
}

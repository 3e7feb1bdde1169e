//! Record model and codec
//!
//! A record is one named payload plus free-form string metadata and the
//! SHA-256 checksum of its plaintext. Each record revision is stored as one
//! archive entry whose bytes are the codec frame from [`encode`].
//!
//! # Entry Naming
//!
//! ```text
//! records/<base64url(key)>.<seq>
//! ```
//!
//! `seq` is an explicit per-key counter; the highest sequence for a key is
//! the live revision.

mod checksum;
mod codec;
mod entry_name;
mod record;

pub use checksum::{checksum_hex, compute_checksum, verify_checksum, CHECKSUM_LEN};
pub use codec::{decode, encode, CodecError, CodecResult, FORMAT_VERSION, MAGIC};
pub use entry_name::{entry_name, is_record_entry, parse_entry_name, EntryName, RECORD_PREFIX};
pub use record::{
    Metadata, Record, META_CHECKSUM, META_CREATED_AT, META_PREVIOUS_CHECKSUM, META_SIZE,
    META_UPDATED_AT,
};

//! Logical record type

use std::collections::BTreeMap;
use std::str::Utf8Error;

use serde::de::DeserializeOwned;

use super::checksum::{compute_checksum, verify_checksum, CHECKSUM_LEN};

/// Record metadata. Ordered so encoding is deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Creation timestamp (RFC 3339, UTC)
pub const META_CREATED_AT: &str = "created_at";
/// Last write timestamp (RFC 3339, UTC)
pub const META_UPDATED_AT: &str = "updated_at";
/// Plaintext payload length in bytes
pub const META_SIZE: &str = "size";
/// Hex SHA-256 of the plaintext payload
pub const META_CHECKSUM: &str = "checksum";
/// Checksum of the revision an update replaced
pub const META_PREVIOUS_CHECKSUM: &str = "previous_checksum";

/// A named unit of stored data.
///
/// `payload` is whatever the codec carries: plaintext once the store has
/// decrypted it, or sealed bytes while it sits in an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record key, unique among live records
    pub key: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Free-form metadata
    pub metadata: Metadata,
    /// SHA-256 of the plaintext payload
    pub checksum: [u8; CHECKSUM_LEN],
}

impl Record {
    /// Create a record over a plaintext payload, computing its checksum.
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>, metadata: Metadata) -> Self {
        let payload = payload.into();
        let checksum = compute_checksum(&payload);
        Self {
            key: key.into(),
            payload,
            metadata,
            checksum,
        }
    }

    /// Raw payload bytes
    pub fn raw(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as UTF-8 text
    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Payload parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }

    /// Re-verifies the payload against the stored checksum.
    ///
    /// Only meaningful on a plaintext payload.
    pub fn validate(&self) -> bool {
        verify_checksum(&self.payload, &self.checksum)
    }

    /// Metadata value for `name`
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_checksum() {
        let record = Record::new("k", b"data".to_vec(), Metadata::new());
        assert_eq!(record.checksum, compute_checksum(b"data"));
        assert!(record.validate());
    }

    #[test]
    fn test_validate_detects_modified_payload() {
        let mut record = Record::new("validate", b"test data".to_vec(), Metadata::new());
        record.payload = b"corrupted".to_vec();
        assert!(!record.validate());
    }

    #[test]
    fn test_text_and_json_accessors() {
        let record = Record::new("j", br#"{"key":"value","number":42}"#.to_vec(), Metadata::new());
        let value: serde_json::Value = record.json().unwrap();
        assert_eq!(value["number"], 42);
        assert!(record.text().unwrap().contains("value"));

        let binary = Record::new("b", vec![0xff, 0xfe], Metadata::new());
        assert!(binary.text().is_err());
    }

    #[test]
    fn test_meta_lookup() {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), "test".to_string());
        let record = Record::new("m", Vec::new(), metadata);
        assert_eq!(record.meta("type"), Some("test"));
        assert_eq!(record.meta("missing"), None);
    }
}

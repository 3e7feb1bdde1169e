//! Record codec
//!
//! Frame layout (all integers little-endian):
//!
//! ```text
//! +------------------+
//! | Magic "ARCR"     | (4 bytes)
//! +------------------+
//! | Format Version   | (u8)
//! +------------------+
//! | Key              | (u32 length + UTF-8 bytes)
//! +------------------+
//! | Metadata Count   | (u32)
//! | Metadata Pairs   | (length-prefixed name, length-prefixed value)
//! +------------------+
//! | Checksum         | (32 bytes, SHA-256 of plaintext payload)
//! +------------------+
//! | Payload          | (u32 length + bytes, plain or sealed)
//! +------------------+
//! | Frame CRC32      | (u32, over every preceding byte)
//! +------------------+
//! ```
//!
//! The payload is length-prefixed so it may contain any byte, zero included.
//! Any framing violation is a [`CodecError`]; the store surfaces it as a
//! corrupt record and never retries.

use thiserror::Error;

use super::checksum::CHECKSUM_LEN;
use super::record::{Metadata, Record};

/// Frame magic
pub const MAGIC: &[u8; 4] = b"ARCR";

/// Current frame format version
pub const FORMAT_VERSION: u8 = 1;

/// Smallest possible frame: magic, version, empty key, zero metadata,
/// checksum, empty payload, crc.
const MIN_FRAME_LEN: usize = 4 + 1 + 4 + 4 + CHECKSUM_LEN + 4 + 4;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Framing violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    #[error("bad frame magic")]
    BadMagic,

    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    #[error("truncated {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("frame crc mismatch: computed {computed:08x}, stored {stored:08x}")]
    CrcMismatch { computed: u32, stored: u32 },

    #[error("{field} of {len} bytes exceeds frame limit")]
    FieldTooLarge { field: &'static str, len: usize },
}

/// Serializes `record` into one self-describing frame.
pub fn encode(record: &Record) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(MIN_FRAME_LEN + record.key.len() + record.payload.len());

    buf.extend_from_slice(MAGIC);
    buf.push(FORMAT_VERSION);

    put_bytes(&mut buf, "key", record.key.as_bytes())?;

    put_len(&mut buf, "metadata", record.metadata.len())?;
    for (name, value) in &record.metadata {
        put_bytes(&mut buf, "metadata name", name.as_bytes())?;
        put_bytes(&mut buf, "metadata value", value.as_bytes())?;
    }

    buf.extend_from_slice(&record.checksum);
    put_bytes(&mut buf, "payload", &record.payload)?;

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());

    Ok(buf)
}

/// Parses a frame produced by [`encode`].
pub fn decode(data: &[u8]) -> CodecResult<Record> {
    if data.len() < MIN_FRAME_LEN {
        return Err(CodecError::TooShort(data.len()));
    }

    let (body, trailer) = data.split_at(data.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32fast::hash(body);
    if computed != stored {
        return Err(CodecError::CrcMismatch { computed, stored });
    }

    let mut reader = FrameReader::new(body);

    if reader.take(MAGIC.len(), "magic")? != MAGIC {
        return Err(CodecError::BadMagic);
    }

    let version = reader.take(1, "version")?[0];
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let key = reader.string("key")?;

    let count = reader.u32("metadata count")? as usize;
    let mut metadata = Metadata::new();
    for _ in 0..count {
        let name = reader.string("metadata name")?;
        let value = reader.string("metadata value")?;
        metadata.insert(name, value);
    }

    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(reader.take(CHECKSUM_LEN, "checksum")?);

    let payload = reader.bytes("payload")?.to_vec();

    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }

    Ok(Record {
        key,
        payload,
        metadata,
        checksum,
    })
}

fn put_len(buf: &mut Vec<u8>, field: &'static str, len: usize) -> CodecResult<()> {
    let len32 = u32::try_from(len).map_err(|_| CodecError::FieldTooLarge { field, len })?;
    buf.extend_from_slice(&len32.to_le_bytes());
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, field: &'static str, bytes: &[u8]) -> CodecResult<()> {
    put_len(buf, field, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over a frame body.
///
/// Length prefixes are checked against the remaining bytes before anything
/// is allocated, so a corrupt prefix cannot trigger a huge allocation.
struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize, field: &'static str) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::Truncated {
                field,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self, field: &'static str) -> CodecResult<u32> {
        let b = self.take(4, field)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes(&mut self, field: &'static str) -> CodecResult<&'a [u8]> {
        let len = self.u32(field)? as usize;
        self.take(len, field)
    }

    fn string(&mut self, field: &'static str) -> CodecResult<String> {
        let bytes = self.bytes(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(field))
    }
}

//! Per-entry deflate compression
//!
//! Level 0 still produces a deflate stream (stored blocks), so every entry
//! is decoded the same way regardless of the level it was written with.

use std::io::{self, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Highest accepted compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Deflate `data` at `level` (0 = store, 9 = best).
pub fn compress(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level.min(MAX_COMPRESSION_LEVEL)));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate an entry written by [`compress`].
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

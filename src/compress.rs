//! Byte compression used for bundle payloads.
//!
//! Payloads are zstd frames with a content checksum, so a damaged payload is
//! reported as [`Error::CorruptData`] instead of silently producing garbage.

use std::fmt;
use std::io::{self, Read, Write};

use crate::{Error, Result};

// zstd levels for qualities 1..=11, kept below the "ultra" range so that
// decompression never needs a large window.
const ZSTD_LEVELS: [i32; 11] = [1, 2, 3, 5, 7, 9, 11, 13, 15, 17, 19];
// Output buffers start no larger than this, whatever length is claimed.
const PREALLOCATE_LIMIT: usize = 16 << 20;

/// Compression effort, from 1 (fastest) to 11 (smallest output).
///
/// Quality only affects packing. Decompression is identical for every level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 11;
    pub const FASTEST: Quality = Quality(1);
    pub const BEST: Quality = Quality(11);

    /// Returns `None` when `quality` is outside `1..=11`.
    pub fn new(quality: u32) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&quality) {
            Some(Self(quality as u8))
        } else {
            None
        }
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    fn zstd_level(self) -> i32 {
        ZSTD_LEVELS[self.0 as usize - 1]
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::BEST
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Compress `data` into a single checksummed zstd frame.
pub fn compress(data: &[u8], quality: Quality) -> Result<Vec<u8>> {
    let buffer = Vec::with_capacity(data.len() / 2);
    let mut encoder = zstd::stream::write::Encoder::new(buffer, quality.zstd_level())?;
    encoder.include_checksum(true)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a frame produced by [`compress`].
///
/// `expected_len` is the original length recorded next to the payload. Output
/// larger or smaller than that is treated as corruption, as is any frame the
/// decoder rejects. No state is shared between calls.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let corrupt = |e: io::Error| Error::CorruptData(e.to_string());
    let decoder = zstd::stream::read::Decoder::with_buffer(data).map_err(corrupt)?;
    // The recorded length is untrusted, so it only bounds the output.
    let mut decoded = Vec::with_capacity(expected_len.min(PREALLOCATE_LIMIT));
    decoder
        .take((expected_len as u64).saturating_add(1))
        .read_to_end(&mut decoded)
        .map_err(corrupt)?;
    if decoded.len() != expected_len {
        return Err(Error::CorruptData(format!(
            "decompressed {} bytes, expected {}",
            decoded.len(),
            expected_len
        )));
    }
    Ok(decoded)
}

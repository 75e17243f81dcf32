//! Blob layout.
//!
//! ```text
//! +---------+-------------------------------------------+-----------------+
//! | BRFSv01 | index (bincode, fixint, little endian)    | payload region  |
//! +---------+-------------------------------------------+-----------------+
//!             u64 count
//!             count x { u64 path_len, path, u64 original_len,
//!                       u64 stored_len, u64 offset, u32 mode, u8 compressed }
//! ```
//!
//! Offsets are relative to the start of the payload region, whose length is
//! the sum of all stored lengths.

use std::io::Write;

use bincode::Options;

use crate::index::Index;
use crate::{Error, Result};

// Magic number at the start of every blob, used to check integrity.
pub(crate) const MAGIC_NUMBER: &[u8; 7] = b"BRFSv01";
// Headers larger than this are refused.
const HEADER_LIMIT: u64 = 104857600 /* 100MiB */;

fn header_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(HEADER_LIMIT)
}

/// An index plus the payload region it describes. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    index: Index,
    payload: Vec<u8>,
}

impl Bundle {
    pub(crate) fn new(index: Index, payload: Vec<u8>) -> Self {
        Self { index, payload }
    }

    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The stored (possibly compressed) bytes of the entry at `position`.
    pub fn stored_bytes(&self, position: usize) -> Option<&[u8]> {
        let entry = self.index.entries().get(position)?;
        let start = entry.offset() as usize;
        self.payload.get(start..start + entry.stored_len() as usize)
    }

    /// Serialize into a blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut blob = Vec::with_capacity(self.payload.len() + 64 * self.index.len());
        self.write_to(&mut blob)?;
        Ok(blob)
    }

    /// Serialize into `target`.
    pub fn write_to<W: Write>(&self, mut target: W) -> Result<()> {
        let header = header_options()
            .serialize(&self.index)
            .map_err(|e| Error::SerializationError(e.to_string()))?;
        target.write_all(MAGIC_NUMBER)?;
        target.write_all(&header)?;
        target.write_all(&self.payload)?;
        Ok(())
    }

    /// Parse a blob, copying its payload region.
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        let (index, payload_start) = parse_header(blob)?;
        Ok(Self {
            index,
            payload: blob[payload_start..].to_vec(),
        })
    }
}

/// Parse and validate the header of `blob`.
///
/// Returns the index and the position of the payload region within `blob`.
/// Every entry is checked against the payload bounds here, so readers can
/// slice the payload without further checks.
pub(crate) fn parse_header(blob: &[u8]) -> Result<(Index, usize)> {
    let body = blob
        .strip_prefix(MAGIC_NUMBER.as_slice())
        .ok_or(Error::IllegalData)?;
    let mut reader = body;
    let index: Index = header_options()
        .deserialize_from(&mut reader)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;
    let payload_start = blob.len() - reader.len();
    validate(&index, reader.len())?;
    Ok((index, payload_start))
}

fn validate(index: &Index, payload_len: usize) -> Result<()> {
    if !index.is_sorted() {
        return Err(Error::IllegalData);
    }
    let mut ranges = Vec::with_capacity(index.len());
    let mut total: u64 = 0;
    for entry in index.entries() {
        if crate::path::normalize(entry.path()).ok().as_deref() != Some(entry.path()) {
            return Err(Error::IllegalData);
        }
        if crate::path::parents(entry.path()).any(|dir| index.get(dir).is_some()) {
            return Err(Error::IllegalData);
        }
        let size_ok = if entry.is_compressed() {
            entry.stored_len() <= entry.original_len()
        } else {
            entry.stored_len() == entry.original_len()
        };
        if !size_ok || entry.mode().is_dir() {
            return Err(Error::IllegalData);
        }
        let end = entry
            .offset()
            .checked_add(entry.stored_len())
            .ok_or(Error::IllegalData)?;
        total = total
            .checked_add(entry.stored_len())
            .ok_or(Error::IllegalData)?;
        usize::try_from(entry.original_len()).map_err(|_| Error::IllegalData)?;
        ranges.push((entry.offset(), end));
    }
    if total != payload_len as u64 {
        return Err(Error::IllegalData);
    }
    ranges.sort_unstable();
    if ranges.windows(2).any(|w| w[0].1 > w[1].0) {
        return Err(Error::IllegalData);
    }
    if ranges.last().map_or(false, |&(_, end)| end > payload_len as u64) {
        return Err(Error::IllegalData);
    }
    Ok(())
}

//! The read-only file system served from a blob.
//!
//! Most APIs are similar to `std::fs`, but read only and keyed by
//! slash-separated strings instead of `Path`s.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};
use std::ops::Deref;
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;
use tracing::{trace, warn};

use crate::bundle::parse_header;
use crate::index::{Child, Entry, Index, Mode};
use crate::{compress, path, Error, Result};

/// Read-only File System over a serialized bundle.
///
/// The index is parsed once when the `Vfs` is created. File contents are
/// decompressed on first access and then shared by every later [`File`];
/// concurrent first accesses to the same entry decompress it only once.
pub struct Vfs {
    blob: Cow<'static, [u8]>,
    payload_start: usize,
    index: Index,
    cache: Box<[OnceCell<Arc<[u8]>>]>,
}

impl Vfs {
    /// Load a blob owned by the caller.
    pub fn new(blob: Vec<u8>) -> Result<Self> {
        Self::from_cow(Cow::Owned(blob))
    }

    /// Load a blob baked into the executable.
    pub fn from_static(blob: &'static [u8]) -> Result<Self> {
        Self::from_cow(Cow::Borrowed(blob))
    }

    fn from_cow(blob: Cow<'static, [u8]>) -> Result<Self> {
        let (index, payload_start) = parse_header(&blob)?;
        let cache = (0..index.len()).map(|_| OnceCell::new()).collect();
        Ok(Self {
            blob,
            payload_start,
            index,
            cache,
        })
    }

    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Open the file at `path`. A leading `/` is optional.
    ///
    /// Directories cannot be opened; they report [`Error::NotFound`] like any
    /// other missing file.
    pub fn open(&self, path: impl AsRef<str>) -> Result<File> {
        let path = path.as_ref();
        let position = path::resolve(path)
            .and_then(|resolved| self.index.position(&resolved))
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let entry = &self.index.entries()[position];
        let data = self.contents(position)?;
        Ok(File {
            mode: entry.mode(),
            cursor: Cursor::new(data),
        })
    }

    /// Read the whole file at `path`.
    pub fn read(&self, path: impl AsRef<str>) -> Result<Vec<u8>> {
        Ok(self.open(path)?.as_bytes().to_vec())
    }

    /// Returns the file (or directory) information of the corresponding path.
    #[doc(alias = "stat")]
    pub fn metadata(&self, path: impl AsRef<str>) -> Result<Metadata> {
        let path = path.as_ref();
        let not_found = || Error::NotFound(path.to_string());
        let resolved = path::resolve(path).ok_or_else(not_found)?;
        if let Some(entry) = self.index.get(&resolved) {
            return Ok(Metadata::of(entry));
        }
        if self.index.is_dir(&resolved) {
            return Ok(Metadata::DIR);
        }
        Err(not_found())
    }

    pub fn exists(&self, path: impl AsRef<str>) -> bool {
        self.metadata(path).is_ok()
    }

    /// Returns an iterator over the entries within a directory, sorted by name.
    pub fn read_dir(&self, path: impl AsRef<str>) -> Result<ReadDir> {
        let path = path.as_ref();
        let not_found = || Error::NotFound(path.to_string());
        let dir = path::resolve(path).ok_or_else(not_found)?;
        let children = self.index.children(&dir).ok_or_else(not_found)?;
        let data: Vec<DirEntry> = children
            .into_iter()
            .map(|(name, child)| DirEntry {
                path: path::join(&dir, name),
                metadata: match child {
                    Child::File(entry) => Metadata::of(entry),
                    Child::Dir => Metadata::DIR,
                },
            })
            .collect();
        Ok(ReadDir {
            data: data.into_iter(),
        })
    }

    // At most one decompression per entry for the lifetime of `self`.
    fn contents(&self, position: usize) -> Result<Arc<[u8]>> {
        self.cache[position]
            .get_or_try_init(|| self.decode(&self.index.entries()[position]))
            .map(Arc::clone)
    }

    fn decode(&self, entry: &Entry) -> Result<Arc<[u8]>> {
        // Ranges were checked against the payload in `parse_header`.
        let start = self.payload_start + entry.offset() as usize;
        let stored = &self.blob[start..start + entry.stored_len() as usize];
        if !entry.is_compressed() {
            return Ok(Arc::from(stored));
        }
        trace!(path = entry.path(), stored_len = stored.len(), "decompressing");
        match compress::decompress(stored, entry.original_len() as usize) {
            Ok(data) => Ok(Arc::from(data)),
            Err(Error::CorruptData(reason)) => {
                warn!(path = entry.path(), %reason, "corrupt entry");
                Err(Error::CorruptData(format!("{}: {reason}", entry.path())))
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("entries", &self.index.len())
            .field("blob_len", &self.blob.len())
            .finish()
    }
}

/// A bundle baked into the executable, parsed on first use.
///
/// This is the type of the statics written by the emitter:
///
/// ```
/// static ASSETS: brfs::Embedded = brfs::Embedded::new(b"not a bundle");
/// assert!(ASSETS.get().is_err());
/// ```
pub struct Embedded {
    blob: &'static [u8],
    fs: OnceCell<Vfs>,
}

impl Embedded {
    pub const fn new(blob: &'static [u8]) -> Self {
        Self {
            blob,
            fs: OnceCell::new(),
        }
    }

    /// The file system, parsing the index on the first call.
    pub fn get(&self) -> Result<&Vfs> {
        self.fs.get_or_try_init(|| Vfs::from_static(self.blob))
    }
}

impl Deref for Embedded {
    type Target = Vfs;

    /// # Panics
    ///
    /// Panics if the embedded blob is not a valid bundle, which means the
    /// generated source and its blob are out of sync.
    fn deref(&self) -> &Vfs {
        match self.get() {
            Ok(fs) => fs,
            Err(e) => panic!("BUG: brfs: embedded bundle is invalid: {e}"),
        }
    }
}

impl fmt::Debug for Embedded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedded")
            .field("blob_len", &self.blob.len())
            .field("loaded", &self.fs.get().is_some())
            .finish()
    }
}

/// An open file. Implements `Read`, `BufRead` and `Seek` over the
/// decompressed contents, which are shared rather than copied.
#[derive(Clone)]
pub struct File {
    mode: Mode,
    cursor: Cursor<Arc<[u8]>>,
}

impl File {
    #[inline]
    pub fn open(fs: &Vfs, path: impl AsRef<str>) -> Result<File> {
        fs.open(path)
    }
    #[inline]
    pub fn metadata(&self) -> Metadata {
        Metadata {
            len: self.len(),
            mode: self.mode,
        }
    }
    #[inline]
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
    /// The whole decompressed file, independent of the read position.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("len", &self.len())
            .field("position", &self.cursor.position())
            .field("mode", &self.mode)
            .finish()
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl BufRead for File {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.cursor.fill_buf()
    }
    fn consume(&mut self, amt: usize) {
        self.cursor.consume(amt)
    }
}

impl Seek for File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Metadata information about a file or directory.
///
/// Directories have length 0. Timestamps are not stored, so create, access
/// and modify times are all `UNIX_EPOCH`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Metadata {
    len: u64,
    mode: Mode,
}

/// Representation of the permissions on a file. Always read only.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Permissions(u32);

/// A structure representing a type of file with accessors for each file type.
/// It is returned by [Metadata::file_type] method.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FileType {
    dir: bool,
}

impl Metadata {
    const DIR: Metadata = Metadata {
        len: 0,
        mode: Mode::dir(),
    };

    fn of(entry: &Entry) -> Self {
        Self {
            len: entry.original_len(),
            mode: entry.mode(),
        }
    }
    #[inline]
    pub fn file_type(&self) -> FileType {
        FileType {
            dir: self.mode.is_dir(),
        }
    }
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }
    #[inline]
    pub fn is_file(&self) -> bool {
        !self.mode.is_dir()
    }
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }
    #[inline]
    pub fn permissions(&self) -> Permissions {
        Permissions(self.mode.permissions())
    }
    #[inline]
    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
    #[inline]
    pub fn accessed(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
    #[inline]
    pub fn created(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
}

impl Permissions {
    #[inline]
    pub fn readonly(&self) -> bool {
        true
    }
    /// Permission bits recorded when the file was packed.
    #[inline]
    pub fn mode(&self) -> u32 {
        self.0
    }
}

impl FileType {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.dir
    }
    #[inline]
    pub fn is_file(&self) -> bool {
        !self.dir
    }
    #[inline]
    pub fn is_symlink(&self) -> bool {
        false
    }
}

/// Iterator over the entries in a directory.
/// This iterator is returned from [Vfs::read_dir].
#[derive(Debug)]
pub struct ReadDir {
    data: std::vec::IntoIter<DirEntry>,
}

impl Iterator for ReadDir {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        self.data.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.data.size_hint()
    }
}

impl ExactSizeIterator for ReadDir {}

/// Entries returned by the [ReadDir] iterator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    path: String,
    metadata: Metadata,
}

impl DirEntry {
    /// Full path of this entry relative to the root, without a leading `/`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn file_name(&self) -> &str {
        match self.path.rfind('/') {
            Some(slash) => &self.path[slash + 1..],
            None => &self.path,
        }
    }

    #[inline]
    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    #[inline]
    pub fn file_type(&self) -> FileType {
        self.metadata.file_type()
    }
}

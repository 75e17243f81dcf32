//! # BRFS: Bundled Read-only File System
//!
//! BRFS packs a directory of static assets into one compressed blob that a
//! program can embed in its own executable, and serves it back at run time
//! as a read-only file system. Each file is compressed on its own and only
//! decompressed when it is first opened.
//!
//! Most APIs are similar to std::fs, but read only.
//!
//! ## Main Function
//!
//! [Encoder]: Pack a set of files into a [Bundle].
//!
//! [Vfs]: Open, stat and list the files of a serialized bundle.
//!
//! [Embedded]: A bundle baked in with `include_bytes!`, parsed on first use.
//!
//! [load] / [pack]: Read a blob from disk, or pack a folder into one.
//!
//! With the `build` feature, [PackConfig] drives the whole pipeline used by
//! the `brfs` command: walking inputs, filtering them with globs, encoding,
//! and writing the blob next to generated Rust source that declares it.
//!
//! ## Example
//!
//! ```rust
//! use brfs::{Encoder, Mode, Quality, RawFile, Vfs};
//!
//! fn main() -> brfs::Result<()> {
//!     let bundle = Encoder::new(Quality::BEST).encode(vec![
//!         RawFile::new("index.html", "<h1>hi</h1>", Mode::file(0o644)),
//!         RawFile::new("css/site.css", "h1 { color: red }", Mode::file(0o644)),
//!     ])?;
//!     let fs = Vfs::new(bundle.to_bytes()?)?;
//!     // iterating over what's inside is as easy as using std::fs
//!     for entry in fs.read_dir("/")? {
//!         if entry.metadata().is_file() {
//!             println!("{:?}", fs.open(entry.path())?);
//!         } else {
//!             println!("Dir {{ path: {:?} }}", entry.path());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::io::{self, ErrorKind};
use std::path::Path;

mod bundle;
pub mod compress;
mod encode;
mod fs;
mod index;
pub mod path;

#[cfg(feature = "build")]
mod config;
#[cfg(feature = "build")]
pub mod emit;
#[cfg(feature = "build")]
mod platform;
#[cfg(feature = "build")]
pub mod walk;

#[cfg(feature = "vfs")]
mod vfs_impl;

pub use bundle::Bundle;
pub use compress::Quality;
pub use encode::{Encoder, RawFile};
pub use fs::{DirEntry, Embedded, File, FileType, Metadata, Permissions, ReadDir, Vfs};
pub use index::{Child, Entry, Index, Mode};

#[cfg(feature = "build")]
pub use config::{ConfigError, PackConfig, PackSummary, Packer};
#[cfg(feature = "build")]
pub use walk::Filter;

/// Internal error type
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    IO(#[from] io::Error),
    #[error("No such file or directory: {0}")]
    NotFound(String),
    #[error("Illegal data: not a BRFS bundle")]
    IllegalData,
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),
    #[error("Duplicate path: {0:?}")]
    DuplicatePath(String),
    #[error("Corrupt data: {0}")]
    CorruptData(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[cfg(feature = "build")]
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::IO(io_error) => io_error,
            Error::NotFound(_) => io::Error::new(ErrorKind::NotFound, error.to_string()),
            Error::InvalidPath(_) | Error::DuplicatePath(_) => {
                io::Error::new(ErrorKind::InvalidInput, error.to_string())
            }
            _ => io::Error::new(ErrorKind::InvalidData, error.to_string()),
        }
    }
}

/// Load a BRFS blob from disk.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vfs> {
    Vfs::new(std::fs::read(path)?)
}

/// Pack a folder into a BRFS blob at the best quality.
#[cfg(feature = "build")]
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(source: P, target: Q) -> Result<()> {
    let files = walk::collect(&[source.as_ref().to_path_buf()], &Filter::All)?;
    let bundle = Encoder::default().encode(files)?;
    std::fs::write(target, bundle.to_bytes()?)?;
    Ok(())
}

//! [`vfs`] integration: a [`Vfs`] can back a `vfs::VfsPath`.

use std::io::Write;

use vfs::error::VfsErrorKind;
use vfs::{FileSystem, SeekAndRead, VfsError, VfsFileType, VfsMetadata, VfsPath, VfsResult};

use crate::{Error, Vfs};

impl From<Error> for VfsError {
    fn from(error: Error) -> Self {
        match error {
            Error::NotFound(_) => VfsErrorKind::FileNotFound.into(),
            Error::IO(io_error) => VfsErrorKind::IoError(io_error).into(),
            error => VfsErrorKind::Other(error.to_string()).into(),
        }
    }
}

impl FileSystem for Vfs {
    fn read_dir(&self, path: &str) -> VfsResult<Box<dyn Iterator<Item = String> + Send>> {
        let names: Vec<String> = Vfs::read_dir(self, path)?
            .map(|entry| entry.file_name().to_string())
            .collect();
        Ok(Box::new(names.into_iter()))
    }

    fn create_dir(&self, _path: &str) -> VfsResult<()> {
        Err(VfsErrorKind::NotSupported.into())
    }

    fn open_file(&self, path: &str) -> VfsResult<Box<dyn SeekAndRead + Send>> {
        Ok(Box::new(self.open(path)?))
    }

    fn create_file(&self, _path: &str) -> VfsResult<Box<dyn Write + Send>> {
        Err(VfsErrorKind::NotSupported.into())
    }

    fn append_file(&self, _path: &str) -> VfsResult<Box<dyn Write + Send>> {
        Err(VfsErrorKind::NotSupported.into())
    }

    fn metadata(&self, path: &str) -> VfsResult<VfsMetadata> {
        let metadata = Vfs::metadata(self, path)?;
        Ok(VfsMetadata {
            file_type: if metadata.is_dir() {
                VfsFileType::Directory
            } else {
                VfsFileType::File
            },
            len: metadata.len(),
        })
    }

    fn exists(&self, path: &str) -> VfsResult<bool> {
        Ok(Vfs::exists(self, path))
    }

    fn remove_file(&self, _path: &str) -> VfsResult<()> {
        Err(VfsErrorKind::NotSupported.into())
    }

    fn remove_dir(&self, _path: &str) -> VfsResult<()> {
        Err(VfsErrorKind::NotSupported.into())
    }
}

impl From<Vfs> for VfsPath {
    fn from(fs: Vfs) -> Self {
        VfsPath::new(fs)
    }
}

use std::fs::Metadata;

use crate::index::Mode;

#[cfg(unix)]
pub fn file_mode(metadata: &Metadata) -> Mode {
    use std::os::unix::fs::PermissionsExt;
    Mode::file(metadata.permissions().mode())
}

// Without unix permission bits, only the read-only flag carries over.
#[cfg(not(unix))]
pub fn file_mode(metadata: &Metadata) -> Mode {
    if metadata.permissions().readonly() {
        Mode::file(0o444)
    } else {
        Mode::file(0o644)
    }
}

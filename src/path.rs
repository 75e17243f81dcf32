//! Slash-separated bundle paths.
//!
//! Stored paths never start with `/`, never contain empty, `.` or `..`
//! segments, and are compared byte-wise (case-sensitive).

use crate::{Error, Result};

/// Normalize a path handed to the encoder.
///
/// Leading, trailing and repeated slashes and `.` segments are dropped.
/// `..` segments, NUL bytes and paths that normalize to nothing are
/// rejected with [`Error::InvalidPath`].
pub fn normalize(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(Error::InvalidPath(path.to_string())),
            s if s.contains('\0') => return Err(Error::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(segments.join("/"))
}

/// Resolve a lookup path against the bundle root.
///
/// Unlike [`normalize`], `..` pops the previous segment the way a shell
/// would. Returns `None` if the path climbs above the root. The root itself
/// resolves to the empty string.
pub fn resolve(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}

/// Join a directory and a child name, treating `""` as the root.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Every proper ancestor directory of a normalized `path`, nearest last.
///
/// `"a/b/c"` yields `"a"` then `"a/b"`. The root is not included.
pub(crate) fn parents(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(slash, _)| &path[..slash])
}

/// The prefix every descendant of `dir` starts with.
pub(crate) fn dir_prefix(dir: &str) -> String {
    if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    }
}

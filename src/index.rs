//! The path index stored in a bundle header.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::path;

/// File mode bits: permission bits plus a directory flag.
///
/// Stored entries are always regular files; the directory flag only shows up
/// on modes synthesized for directories at lookup time.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Mode(u32);

impl Mode {
    pub const DIR: u32 = 1 << 31;
    pub const PERMISSIONS: u32 = 0o7777;

    /// Mode of a regular file with the given permission bits.
    #[inline]
    pub const fn file(permissions: u32) -> Self {
        Self(permissions & Self::PERMISSIONS)
    }

    /// Mode reported for synthesized directories.
    #[inline]
    pub const fn dir() -> Self {
        Self(Self::DIR | 0o755)
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_dir(self) -> bool {
        self.0 & Self::DIR != 0
    }

    #[inline]
    pub fn permissions(self) -> u32 {
        self.0 & Self::PERMISSIONS
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::file(0o644)
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        write!(f, "Mode({kind}{:04o})", self.permissions())
    }
}

/// One packed file.
///
/// Field order is the on-disk record order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub(crate) path: String,
    pub(crate) original_len: u64,
    pub(crate) stored_len: u64,
    pub(crate) offset: u64,
    pub(crate) mode: Mode,
    pub(crate) compressed: bool,
}

impl Entry {
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }
    /// Length of the file once decompressed.
    #[inline]
    pub fn original_len(&self) -> u64 {
        self.original_len
    }
    /// Length of the bytes kept in the payload region.
    #[inline]
    pub fn stored_len(&self) -> u64 {
        self.stored_len
    }
    /// Offset relative to the start of the payload region.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
}

/// What a directory listing found under a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child<'a> {
    File(&'a Entry),
    Dir,
}

/// Entries sorted by path.
///
/// Directories are not stored. A directory exists iff some entry path has
/// it as a proper prefix, which sorted order turns into a binary search.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    entries: Vec<Entry>,
}

impl Index {
    /// `entries` must already be sorted by path with no duplicates.
    pub(crate) fn from_sorted(entries: Vec<Entry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].path < w[1].path));
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].path < w[1].path)
    }

    /// Position of the entry stored at exactly `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.entries
            .binary_search_by(|entry| entry.path.as_str().cmp(path))
            .ok()
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.position(path).map(|i| &self.entries[i])
    }

    /// Whether `dir` is a directory. The root always is.
    pub fn is_dir(&self, dir: &str) -> bool {
        dir.is_empty() || !self.prefix_range(&path::dir_prefix(dir)).is_empty()
    }

    /// Immediate children of `dir`, keyed and ordered by name.
    ///
    /// Returns `None` when `dir` is not a directory. Whole subdirectories are
    /// skipped with a second binary search instead of being walked.
    pub fn children(&self, dir: &str) -> Option<BTreeMap<&str, Child<'_>>> {
        if !self.is_dir(dir) {
            return None;
        }
        let prefix = path::dir_prefix(dir);
        let range = self.prefix_range(&prefix);
        let mut children = BTreeMap::new();
        let mut i = range.start;
        while i < range.end {
            let entry = &self.entries[i];
            let rest = &entry.path[prefix.len()..];
            match rest.find('/') {
                None => {
                    children.insert(rest, Child::File(entry));
                    i += 1;
                }
                Some(slash) => {
                    let name = &rest[..slash];
                    children.insert(name, Child::Dir);
                    let sub_prefix = &entry.path[..prefix.len() + slash + 1];
                    i = self.prefix_range(sub_prefix).end;
                }
            }
        }
        Some(children)
    }

    // Entries starting with `prefix` are contiguous in sorted order.
    fn prefix_range(&self, prefix: &str) -> Range<usize> {
        let start = self
            .entries
            .partition_point(|entry| entry.path.as_str() < prefix);
        let end = start
            + self.entries[start..].partition_point(|entry| entry.path.starts_with(prefix));
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> Index {
        let mut paths = paths.to_vec();
        paths.sort_unstable();
        let entries = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| Entry {
                path: path.to_string(),
                original_len: 1,
                stored_len: 1,
                offset: i as u64,
                mode: Mode::default(),
                compressed: false,
            })
            .collect();
        Index::from_sorted(entries)
    }

    fn names(index: &Index, dir: &str) -> Vec<(String, bool)> {
        index
            .children(dir)
            .unwrap()
            .into_iter()
            .map(|(name, child)| (name.to_string(), child == Child::Dir))
            .collect()
    }

    #[test]
    fn exact_lookup() {
        let index = index(&["a/b.txt", "a/c/d.txt", "z"]);
        assert_eq!(index.get("a/b.txt").unwrap().path(), "a/b.txt");
        assert!(index.get("a").is_none());
        assert!(index.get("a/B.txt").is_none());
        assert!(index.get("a/c").is_none());
    }

    #[test]
    fn directories_are_derived() {
        let index = index(&["a/b.txt", "a/c/d.txt"]);
        assert!(index.is_dir(""));
        assert!(index.is_dir("a"));
        assert!(index.is_dir("a/c"));
        assert!(!index.is_dir("a/b.txt"));
        assert!(!index.is_dir("a/c/d.txt"));
        assert!(!index.is_dir("b"));
        // A prefix of a segment is not a directory.
        assert!(!index.is_dir("a/c/d"));
    }

    #[test]
    fn children_are_one_segment_deep() {
        let index = index(&["a/b.txt", "a/c/d.txt", "a/c/e.txt", "a/c-x", "top"]);
        assert_eq!(
            names(&index, "a"),
            vec![
                ("b.txt".to_string(), false),
                ("c".to_string(), true),
                ("c-x".to_string(), false),
            ]
        );
        assert_eq!(
            names(&index, ""),
            vec![("a".to_string(), true), ("top".to_string(), false)]
        );
        assert!(index.children("top").is_none());
        assert!(index.children("missing").is_none());
    }

    #[test]
    fn empty_index_has_a_root() {
        let index = Index::default();
        assert!(index.is_dir(""));
        assert!(index.children("").unwrap().is_empty());
    }

    #[test]
    fn mode_flags() {
        assert!(Mode::dir().is_dir());
        assert_eq!(Mode::dir().permissions(), 0o755);
        let file = Mode::file(Mode::DIR | 0o100755);
        assert!(!file.is_dir());
        assert_eq!(file.permissions(), 0o755);
        assert_eq!(format!("{:?}", Mode::file(0o644)), "Mode(-0644)");
    }
}

//! Turning a set of files into a [`Bundle`].

use std::collections::HashSet;
use std::thread;

use tracing::{debug, info};

use crate::bundle::Bundle;
use crate::compress::{self, Quality};
use crate::index::{Entry, Index, Mode};
use crate::{path, Error, Result};

/// A file to be packed: its path inside the bundle, contents and mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFile {
    pub path: String,
    pub data: Vec<u8>,
    pub mode: Mode,
}

impl RawFile {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>, mode: Mode) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            mode,
        }
    }
}

/// Packs files into bundles at a fixed quality.
///
/// # Example
/// ```
/// use brfs::{Encoder, Mode, Quality, RawFile, Vfs};
///
/// let bundle = Encoder::new(Quality::BEST)
///     .encode(vec![RawFile::new("hello.txt", "hello", Mode::default())])
///     .unwrap();
/// let fs = Vfs::new(bundle.to_bytes().unwrap()).unwrap();
/// assert_eq!(fs.read("hello.txt").unwrap(), b"hello");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Encoder {
    quality: Quality,
    threads: usize,
}

impl Encoder {
    /// Compress with `quality`, on one worker per CPU.
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            threads: num_cpus::get(),
        }
    }

    /// Limit the number of compression workers. `0` is treated as `1`.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    #[inline]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Build a bundle from `files`.
    ///
    /// Paths are normalized first and any invalid or duplicate path aborts
    /// the whole operation before compression starts. Entries are laid out
    /// sorted by path.
    pub fn encode<I>(&self, files: I) -> Result<Bundle>
    where
        I: IntoIterator<Item = RawFile>,
    {
        let mut files = files
            .into_iter()
            .map(|mut file| {
                file.path = path::normalize(&file.path)?;
                Ok(file)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(files.len());
        for file in &files {
            if !seen.insert(file.path.as_str()) {
                return Err(Error::DuplicatePath(file.path.clone()));
            }
        }
        // A path cannot name both a file and a directory.
        for file in &files {
            if let Some(parent) = path::parents(&file.path).find(|p| seen.contains(p)) {
                return Err(Error::DuplicatePath(parent.to_string()));
            }
        }
        drop(seen);
        files.sort_unstable_by(|a, b| a.path.cmp(&b.path));

        let shrunk = self.compress_all(&files)?;

        let mut entries = Vec::with_capacity(files.len());
        let mut payload = Vec::new();
        let mut raw_total: u64 = 0;
        for (file, compressed) in files.into_iter().zip(shrunk) {
            let original_len = file.data.len() as u64;
            let is_compressed = compressed.is_some();
            let stored = compressed.unwrap_or(file.data);
            debug!(
                path = %file.path,
                original_len,
                stored_len = stored.len(),
                compressed = is_compressed,
                "packed file"
            );
            entries.push(Entry {
                path: file.path,
                original_len,
                stored_len: stored.len() as u64,
                offset: payload.len() as u64,
                mode: Mode::file(file.mode.bits()),
                compressed: is_compressed,
            });
            raw_total += original_len;
            payload.extend_from_slice(&stored);
        }

        info!(
            files = entries.len(),
            raw_bytes = raw_total,
            packed_bytes = payload.len(),
            quality = %self.quality,
            "bundle encoded"
        );
        Ok(Bundle::new(Index::from_sorted(entries), payload))
    }

    // Compressed form of each file, or `None` where compression does not
    // make it smaller. Output order matches `files`.
    fn compress_all(&self, files: &[RawFile]) -> Result<Vec<Option<Vec<u8>>>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let quality = self.quality;
        let workers = self.threads.clamp(1, files.len());
        let chunk_len = (files.len() + workers - 1) / workers;

        thread::scope(|scope| {
            let handles: Vec<_> = files
                .chunks(chunk_len)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|file| shrink(&file.data, quality))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect();

            let mut out = Vec::with_capacity(files.len());
            for handle in handles {
                let chunk = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                out.extend(chunk);
            }
            Ok(out)
        })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

fn shrink(data: &[u8], quality: Quality) -> Result<Option<Vec<u8>>> {
    let compressed = compress::compress(data, quality)?;
    if compressed.len() < data.len() {
        Ok(Some(compressed))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noise(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(len as u64).fill(&mut data[..]);
        data
    }

    #[test]
    fn rejects_duplicates_after_normalization() {
        let err = Encoder::default()
            .encode(vec![
                RawFile::new("css/site.css", "a", Mode::default()),
                RawFile::new("/css//./site.css", "b", Mode::default()),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePath(ref p) if p == "css/site.css"), "{err:?}");
    }

    #[test]
    fn rejects_a_file_that_is_also_a_directory() {
        for order in [["a", "a/b"], ["a/b", "a"]] {
            let err = Encoder::default()
                .encode(order.map(|p| RawFile::new(p, "x", Mode::default())))
                .unwrap_err();
            assert!(matches!(err, Error::DuplicatePath(ref p) if p == "a"), "{err:?}");
        }
        let err = Encoder::default()
            .encode(vec![
                RawFile::new("docs/v1", "file", Mode::default()),
                RawFile::new("docs/v1-notes", "sibling", Mode::default()),
                RawFile::new("docs/v1/deep/readme", "nested", Mode::default()),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePath(ref p) if p == "docs/v1"), "{err:?}");

        // Shared prefixes that stop short of a segment are fine.
        Encoder::default()
            .encode(vec![
                RawFile::new("a", "x", Mode::default()),
                RawFile::new("ab/c", "y", Mode::default()),
            ])
            .unwrap();
    }

    #[test]
    fn rejects_invalid_paths() {
        let err = Encoder::default()
            .encode(vec![
                RawFile::new("ok.txt", "a", Mode::default()),
                RawFile::new("../secret", "b", Mode::default()),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)), "{err:?}");
    }

    #[test]
    fn sorted_contiguous_layout() {
        let bundle = Encoder::new(Quality::FASTEST)
            .threads(2)
            .encode(vec![
                RawFile::new("z.bin", noise(100), Mode::default()),
                RawFile::new("a.txt", "x".repeat(300), Mode::default()),
                RawFile::new("m/n.bin", noise(50), Mode::default()),
            ])
            .unwrap();
        let entries = bundle.index().entries();
        let paths: Vec<_> = entries.iter().map(Entry::path).collect();
        assert_eq!(paths, ["a.txt", "m/n.bin", "z.bin"]);

        let mut offset = 0;
        for entry in entries {
            assert_eq!(entry.offset(), offset);
            offset += entry.stored_len();
        }
        assert_eq!(offset, bundle.payload().len() as u64);
    }

    #[test]
    fn never_inflates() {
        let files = (0..16).map(|i| {
            let data = if i % 2 == 0 { noise(i * 37 + 1) } else { vec![b'a'; i * 37] };
            RawFile::new(format!("f{i:02}"), data, Mode::default())
        });
        let bundle = Encoder::default().encode(files).unwrap();
        for (i, entry) in bundle.index().entries().iter().enumerate() {
            assert!(entry.stored_len() <= entry.original_len(), "{entry:?}");
            if !entry.is_compressed() {
                assert_eq!(
                    bundle.stored_bytes(i).unwrap().len() as u64,
                    entry.original_len()
                );
            }
        }
    }

    #[test]
    fn empty_files_are_stored_raw() {
        let bundle = Encoder::default()
            .encode(vec![RawFile::new("empty", Vec::new(), Mode::default())])
            .unwrap();
        let entry = &bundle.index().entries()[0];
        assert!(!entry.is_compressed());
        assert_eq!(entry.stored_len(), 0);
    }

    #[test]
    fn directory_flag_is_dropped() {
        let bundle = Encoder::default()
            .encode(vec![RawFile::new("x", "x", Mode::dir())])
            .unwrap();
        let mode = bundle.index().entries()[0].mode();
        assert!(!mode.is_dir());
        assert_eq!(mode.permissions(), 0o755);
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let files: Vec<_> = (0..9)
            .map(|i| RawFile::new(format!("dir{}/f{i}", i % 3), "abc".repeat(i * 20), Mode::default()))
            .collect();
        let one = Encoder::default().threads(1).encode(files.clone()).unwrap();
        let many = Encoder::default().threads(8).encode(files).unwrap();
        assert_eq!(one, many);
    }
}

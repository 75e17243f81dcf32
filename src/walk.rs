//! Collecting files from disk for packing.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ConfigError;
use crate::encode::RawFile;
use crate::{platform, Error, Result};

/// Which files to pack.
///
/// A pattern matches when it matches either the path relative to its input
/// root or just the file name, so `*.html` selects HTML files at any depth.
#[derive(Clone, Debug, Default)]
pub enum Filter {
    #[default]
    All,
    Include(Vec<Pattern>),
    Exclude(Vec<Pattern>),
}

impl Filter {
    /// Build a filter from comma-separated glob lists.
    ///
    /// Supplying both lists is an error: include and exclude are mutually
    /// exclusive.
    pub fn new(
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> std::result::Result<Self, ConfigError> {
        match (non_empty(include), non_empty(exclude)) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingFilters),
            (Some(globs), None) => Ok(Filter::Include(patterns(globs)?)),
            (None, Some(globs)) => Ok(Filter::Exclude(patterns(globs)?)),
            (None, None) => Ok(Filter::All),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let hit = |patterns: &[Pattern]| {
            let name = path.rsplit('/').next().unwrap_or(path);
            patterns.iter().any(|p| p.matches(path) || p.matches(name))
        };
        match self {
            Filter::All => true,
            Filter::Include(patterns) => hit(patterns),
            Filter::Exclude(patterns) => !hit(patterns),
        }
    }
}

fn non_empty(globs: Option<&str>) -> Option<&str> {
    globs.filter(|g| !g.trim().is_empty())
}

fn patterns(globs: &str) -> std::result::Result<Vec<Pattern>, ConfigError> {
    globs
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(|g| {
            Pattern::new(g).map_err(|source| ConfigError::InvalidPattern {
                pattern: g.to_string(),
                source,
            })
        })
        .collect()
}

/// Read every file under `inputs` that `filter` accepts.
///
/// A directory input contributes paths relative to itself; a file input
/// contributes its file name. Symlinks are followed. Directories themselves
/// are not recorded, so empty directories are lost.
pub fn collect(inputs: &[PathBuf], filter: &Filter) -> Result<Vec<RawFile>> {
    let mut files = Vec::new();
    for input in inputs {
        let metadata = fs::metadata(input)?;
        if metadata.is_dir() {
            for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
                let path = to_bundle_path(relative)?;
                let metadata = entry.metadata().map_err(io::Error::from)?;
                push(&mut files, filter, path, entry.path(), &metadata)?;
            }
        } else {
            let name = input
                .file_name()
                .ok_or_else(|| Error::InvalidPath(input.display().to_string()))?;
            let path = to_bundle_path(Path::new(name))?;
            push(&mut files, filter, path, input, &metadata)?;
        }
    }
    Ok(files)
}

fn push(
    files: &mut Vec<RawFile>,
    filter: &Filter,
    path: String,
    source: &Path,
    metadata: &fs::Metadata,
) -> Result<()> {
    if !filter.matches(&path) {
        debug!(%path, "filtered out");
        return Ok(());
    }
    let data = fs::read(source)?;
    files.push(RawFile::new(path, data, platform::file_mode(metadata)));
    Ok(())
}

// Join the normal components of a relative host path with '/'.
fn to_bundle_path(relative: &Path) -> Result<String> {
    let invalid = || Error::InvalidPath(relative.display().to_string());
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(segments.join("/"))
}

//! Packing configuration.
//!
//! [`PackConfig`] collects the raw options, [`PackConfig::validate`] checks
//! all of them before any file is touched and hands back an immutable
//! [`Packer`] that does the work.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compress::Quality;
use crate::emit::Emitter;
use crate::encode::Encoder;
use crate::walk::{self, Filter};
use crate::Result;

/// Default input directory.
pub const DEFAULT_INPUT: &str = "public";
/// Default name of the generated static.
pub const DEFAULT_VARIABLE: &str = "br";
/// Extension of generated source files.
pub const SOURCE_EXTENSION: &str = "gen.rs";
/// Extension of blob files.
pub const BLOB_EXTENSION: &str = "brfs";

/// Errors in the packing options. Always detected before any encoding work.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no input files or directories given")]
    NoInputs,
    #[error("{0:?} is not a valid Rust identifier")]
    InvalidIdentifier(String),
    #[error("mutually exclusive options --include and --exclude found")]
    ConflictingFilters,
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("unsupported compression quality {0} (1-11)")]
    QualityOutOfRange(u32),
}

/// A builder for the packing process.
///
/// # Example
/// ```no_run
/// // in build.rs
/// brfs::PackConfig::new(["assets"])
///     .variable("ASSETS")
///     .include("*.html,*.css")
///     .quality(9)
///     .validate()
///     .expect("invalid packing options")
///     .pack()
///     .expect("failed to pack assets");
/// ```
#[derive(Clone, Debug)]
pub struct PackConfig {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    variable: String,
    include: Option<String>,
    exclude: Option<String>,
    quality: u32,
    inline: bool,
}

impl PackConfig {
    /// Pack the given files and directories.
    pub fn new<I, P>(inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            inputs: inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            output: None,
            variable: DEFAULT_VARIABLE.to_string(),
            include: None,
            exclude: None,
            quality: Quality::MAX,
            inline: false,
        }
    }

    /// Name of the generated source file. Defaults to the first input with
    /// its extension replaced by `.gen.rs`.
    #[must_use]
    pub fn output(mut self, output: impl AsRef<Path>) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// Name of the generated static, `br` by default.
    #[must_use]
    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    /// Comma-separated globs of files to include.
    #[must_use]
    pub fn include(mut self, globs: impl Into<String>) -> Self {
        self.include = Some(globs.into());
        self
    }

    /// Comma-separated globs of files to leave out.
    #[must_use]
    pub fn exclude(mut self, globs: impl Into<String>) -> Self {
        self.exclude = Some(globs.into());
        self
    }

    /// Compression quality (1-11), the highest by default.
    #[must_use]
    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Embed the blob as a byte-string literal instead of `include_bytes!`.
    #[must_use]
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Check every option.
    pub fn validate(&self) -> std::result::Result<Packer, ConfigError> {
        let first = self.inputs.first().ok_or(ConfigError::NoInputs)?;
        if syn::parse_str::<syn::Ident>(&self.variable).is_err() {
            return Err(ConfigError::InvalidIdentifier(self.variable.clone()));
        }
        let filter = Filter::new(self.include.as_deref(), self.exclude.as_deref())?;
        let quality =
            Quality::new(self.quality).ok_or(ConfigError::QualityOutOfRange(self.quality))?;
        let source = source_path(self.output.as_deref().unwrap_or(first));
        let blob = source.with_file_name(format!("{}.{BLOB_EXTENSION}", file_stem(&source)));
        Ok(Packer {
            inputs: self.inputs.clone(),
            source,
            blob,
            variable: self.variable.clone(),
            filter,
            quality,
            inline: self.inline,
        })
    }
}

impl Default for PackConfig {
    fn default() -> Self {
        Self::new([DEFAULT_INPUT])
    }
}

// `assets` -> `assets.gen.rs`, `out/site.txt` -> `out/site.gen.rs`.
fn source_path(base: &Path) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_INPUT);
    if name.ends_with(&format!(".{SOURCE_EXTENSION}")) {
        return base.to_path_buf();
    }
    let stem = name.split('.').next().filter(|s| !s.is_empty()).unwrap_or(DEFAULT_INPUT);
    base.with_file_name(format!("{stem}.{SOURCE_EXTENSION}"))
}

fn file_stem(source: &Path) -> &str {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(&format!(".{SOURCE_EXTENSION}")))
        .unwrap_or(DEFAULT_INPUT)
}

/// Validated, immutable packing options.
#[derive(Clone, Debug)]
pub struct Packer {
    inputs: Vec<PathBuf>,
    source: PathBuf,
    blob: PathBuf,
    variable: String,
    filter: Filter,
    quality: Quality,
    inline: bool,
}

/// What [`Packer::pack`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackSummary {
    pub files: usize,
    pub raw_bytes: u64,
    pub packed_bytes: u64,
    pub source: PathBuf,
    pub blob: Option<PathBuf>,
}

impl Packer {
    /// Path of the generated source file.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Path of the blob written next to the source, unless inlined.
    pub fn blob_path(&self) -> Option<&Path> {
        (!self.inline).then_some(self.blob.as_path())
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Walk the inputs, encode them, and write the generated files.
    ///
    /// Nothing is written unless every file was read and encoded.
    pub fn pack(&self) -> Result<PackSummary> {
        let files = walk::collect(&self.inputs, &self.filter)?;
        let bundle = Encoder::new(self.quality).encode(files)?;
        let blob = bundle.to_bytes()?;
        let emitter = Emitter::new(&self.variable);

        let code = if self.inline {
            emitter.render_inline(&blob)
        } else {
            fs::write(&self.blob, &blob)?;
            emitter.render_include(file_name(&self.blob))
        };
        fs::write(&self.source, code)?;

        let summary = PackSummary {
            files: bundle.index().len(),
            raw_bytes: bundle.index().entries().iter().map(|e| e.original_len()).sum(),
            packed_bytes: blob.len() as u64,
            source: self.source.clone(),
            blob: self.blob_path().map(Path::to_path_buf),
        };
        info!(
            files = summary.files,
            raw_bytes = summary.raw_bytes,
            packed_bytes = summary.packed_bytes,
            source = %self.source.display(),
            "wrote bundle"
        );
        Ok(summary)
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

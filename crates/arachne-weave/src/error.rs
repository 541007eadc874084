//! Error types for the weaver.
//!
//! [`WeaveError`] covers two distinct severities. Hard errors (bad
//! configuration, an unreadable output directory) abort the pass and are
//! returned from [`Weaver::run`](crate::Weaver::run). Per-file and per-method
//! errors are converted into [`UnitFailure`](crate::UnitFailure) entries on
//! the report so a single broken source file cannot block the rest of the
//! tree from weaving.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using [`WeaveError`].
pub type WeaveResult<T> = Result<T, WeaveError>;

/// Standard error type for weave passes.
#[derive(Error, Debug)]
pub enum WeaveError {
    /// A source or generated file could not be read.
    #[error("failed to read `{path}`: {source}")]
    Read {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A generated file or directory could not be written.
    #[error("failed to write `{path}`: {source}")]
    Write {
        /// The file or directory that failed to write.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source file is not parseable Rust.
    #[error("failed to parse `{path}`: {message}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The parser's diagnostic.
        message: String,
    },

    /// A configuration field holds an unusable value.
    #[error("invalid configuration `{field}`: {message}")]
    InvalidConfig {
        /// The offending field, dotted from the `[weave]` table root.
        field: String,
        /// Why the value is unusable.
        message: String,
    },

    /// A configuration file could not be loaded.
    #[error("configuration file `{path}`: {message}")]
    ConfigFile {
        /// The configuration file path.
        path: PathBuf,
        /// Why loading failed.
        message: String,
    },

    /// A qualifying method cannot be woven.
    ///
    /// These are produced during analysis and normally downgraded to report
    /// entries; the variant exists so library callers composing their own
    /// passes see a typed error rather than a bare string.
    #[error("cannot weave `{unit}::{method}`: {message}")]
    Method {
        /// The declaring unit.
        unit: String,
        /// The method name.
        method: String,
        /// Why the method cannot be woven.
        message: String,
    },

    /// Walking the source tree failed below the root.
    #[error("failed to scan `{path}`: {message}")]
    Scan {
        /// The directory that failed to scan.
        path: PathBuf,
        /// The walker's diagnostic.
        message: String,
    },
}

impl WeaveError {
    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for a source file.
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration-file error.
    #[must_use]
    pub fn config_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a per-method weave error.
    #[must_use]
    pub fn method(
        unit: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Method {
            unit: unit.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a scan error.
    #[must_use]
    pub fn scan(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The source path this error is attached to, when it names one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Parse { path, .. }
            | Self::ConfigFile { path, .. }
            | Self::Scan { path, .. } => Some(path),
            Self::InvalidConfig { .. } | Self::Method { .. } => None,
        }
    }
}

//! Error taxonomy
//!
//! Configuration errors are fatal at startup. Compile and sink errors only
//! fail the current cycle. Per-file problems never show up here; they are
//! [`ScanWarning`](crate::core::model::ScanWarning)s.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed configuration: bad globs, bad transforms, unreadable config.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("content.files must contain at least one pattern")]
    NoContentPatterns,

    #[error("invalid transform for file type `{file_type}`: {reason}")]
    InvalidTransform { file_type: String, reason: String },

    #[error("invalid regex in transform for `{file_type}`: {source}")]
    InvalidTransformPattern {
        file_type: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration value `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Catalog failures. Fatal for one cycle only.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("catalog unavailable at {path}: {source}")]
    CatalogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog at {path} is corrupt: {source}")]
    CatalogCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog is invalid: {0}")]
    InvalidCatalog(String),
}

/// Failure of the CSS output collaborator
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write css output {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

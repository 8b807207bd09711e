//! Data model shared by the scanner, cache, compiler and engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// File type key used to pick a transform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Lower-cased extension (or an explicit alias for it)
    Named(String),
    /// No extension
    Untyped,
}

impl FileType {
    pub fn named(name: impl Into<String>) -> Self {
        FileType::Named(name.into().to_ascii_lowercase())
    }

    /// Infer the file type from the path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(FileType::named)
            .unwrap_or(FileType::Untyped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FileType::Named(name) => name,
            FileType::Untyped => "",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Named(name) => write!(f, "{}", name),
            FileType::Untyped => write!(f, "<untyped>"),
        }
    }
}

/// Per-file scan result tracked by the candidate cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the root, '/' separated
    pub path: String,

    pub file_type: FileType,

    /// Digest of the raw bytes (not of the transformed text)
    pub fingerprint: String,

    pub tokens: BTreeSet<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, file_type: FileType, fingerprint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type,
            fingerprint: fingerprint.into(),
            tokens: BTreeSet::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: BTreeSet<String>) -> Self {
        self.tokens = tokens;
        self
    }
}

/// A single CSS declaration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// One compiled utility rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityRule {
    /// The candidate token this rule was compiled from
    pub token: String,

    /// Fully escaped selector, including pseudo-class suffixes
    pub selector: String,

    pub declarations: Vec<Declaration>,

    /// Enclosing at-rules, outermost first (e.g. `@media (min-width: 40rem)`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wrappers: Vec<String>,

    /// Position in the compiled stylesheet
    pub source_order: usize,
}

/// Warning codes for per-file scan problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// File could not be read
    Unreadable,
    /// Read did not finish within the configured timeout
    ReadTimeout,
    /// Invalid UTF-8 was replaced with U+FFFD
    LossyDecode,
    /// File was skipped (e.g. larger than the size limit)
    Skipped,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::Unreadable => "UNREADABLE",
            WarningCode::ReadTimeout => "READ_TIMEOUT",
            WarningCode::LossyDecode => "LOSSY_DECODE",
            WarningCode::Skipped => "SKIPPED",
        }
    }
}

/// A recoverable, per-file scan problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: String,
    pub code: WarningCode,
    pub reason: String,
}

impl ScanWarning {
    pub fn new(path: impl Into<String>, code: WarningCode, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.code.as_str(), self.reason)
    }
}

/// Rules added to and removed from the live stylesheet in one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDiff {
    pub added: Vec<UtilityRule>,
    pub removed: Vec<UtilityRule>,
}

impl RuleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Kind of a file-system change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change notification delivered by a watch collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

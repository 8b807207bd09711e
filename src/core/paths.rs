//! Path normalization utilities
//!
//! Ensures all paths are normalized to use '/' as separator and are relative to root.

use std::path::{Path, PathBuf};

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Relative path key used by the cache; falls back to the full path for
/// files outside the root.
pub fn record_key(path: &Path, root: &Path) -> String {
    make_relative(path, root).unwrap_or_else(|| normalize_path(path))
}

/// Get the .windscan cache directory for a given root
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(".windscan")
}

/// Strip a leading "./" from a content pattern
pub fn trim_dot_slash(pattern: &str) -> &str {
    let mut trimmed = pattern;
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed
}

/// Longest literal directory prefix of a glob pattern (the directory a walk
/// has to start from to see every match).
pub fn glob_root(pattern: &str) -> PathBuf {
    let pattern = trim_dot_slash(pattern);
    let first_meta = pattern
        .char_indices()
        .find(|(_, ch)| matches!(ch, '*' | '?' | '[' | '{'))
        .map(|(idx, _)| idx);

    let Some(first_meta) = first_meta else {
        let path = Path::new(pattern);
        return match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::new(),
        };
    };

    let prefix = &pattern[..first_meta];
    match prefix.rfind('/') {
        Some(idx) => PathBuf::from(&prefix[..idx]),
        None => PathBuf::new(),
    }
}

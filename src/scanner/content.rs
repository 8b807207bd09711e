//! Content set - resolves `content.files` globs to concrete paths
//!
//! Uses globset for matching and the ignore crate for traversal.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::error::ConfigurationError;
use crate::core::paths::{glob_root, make_relative, normalize_path, trim_dot_slash};

/// Compiled content patterns anchored at a root directory
#[derive(Debug, Clone)]
pub struct ContentSet {
    root: PathBuf,
    patterns: Vec<String>,
    include: GlobSet,
    exclude: GlobSet,
    walk_roots: Vec<PathBuf>,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigurationError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(trim_dot_slash(pattern))
            .literal_separator(true)
            .build()
            .map_err(|source| ConfigurationError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|source| ConfigurationError::InvalidGlob {
            pattern: patterns.join(", "),
            source,
        })
}

impl ContentSet {
    pub fn new(
        root: &Path,
        patterns: &[String],
        ignore_patterns: &[String],
    ) -> Result<Self, ConfigurationError> {
        if patterns.is_empty() {
            return Err(ConfigurationError::NoContentPatterns);
        }

        let include = build_globset(patterns)?;
        let exclude = build_globset(ignore_patterns)?;

        let mut roots: Vec<PathBuf> = patterns
            .iter()
            .map(|pattern| root.join(glob_root(pattern)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        // A root nested in another root is already covered by the outer walk
        let all = roots.clone();
        roots.retain(|candidate| {
            !all
                .iter()
                .any(|other| other != candidate && candidate.starts_with(other))
        });

        Ok(Self {
            root: root.to_path_buf(),
            patterns: patterns.to_vec(),
            include,
            exclude,
            walk_roots: roots,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Directories walked by [`resolve_paths`](Self::resolve_paths)
    pub fn walk_roots(&self) -> &[PathBuf] {
        &self.walk_roots
    }

    /// Whether `path` (absolute, or relative to the root) is in the set
    pub fn matches(&self, path: &Path) -> bool {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let relative = make_relative(&absolute, &self.root);

        let hit = |p: &str| self.include.is_match(p) && !self.exclude.is_match(p);
        match relative {
            Some(rel) => hit(&rel) || hit(&normalize_path(&absolute)),
            None => hit(&normalize_path(&absolute)),
        }
    }

    /// All regular files matched by the patterns.
    ///
    /// Each file appears once no matter how many patterns match it or how
    /// many symlinks lead to it. Directory symlinks are entered at most once.
    pub fn resolve_paths(&self) -> BTreeSet<PathBuf> {
        let mut paths = BTreeSet::new();
        let mut seen_files = HashSet::new();

        for walk_root in &self.walk_roots {
            if !walk_root.exists() {
                tracing::debug!(root = %walk_root.display(), "content root does not exist");
                continue;
            }

            let visited_dirs: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));
            let visited = Arc::clone(&visited_dirs);

            let mut builder = WalkBuilder::new(walk_root);
            builder
                .follow_links(true)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .sort_by_file_name(|a, b| a.cmp(b))
                .filter_entry(move |entry| {
                    let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                    if !is_dir {
                        return true;
                    }
                    match entry.path().canonicalize() {
                        Ok(canonical) => match visited.lock() {
                            Ok(mut set) => set.insert(canonical),
                            Err(_) => true,
                        },
                        Err(_) => false,
                    }
                });

            for entry in builder.build() {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::debug!(error = %err, "skipping walk entry");
                        continue;
                    }
                };
                if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                    continue;
                }

                let path = entry.path();
                if !self.matches(path) {
                    continue;
                }
                let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                if seen_files.insert(canonical) {
                    paths.insert(path.to_path_buf());
                }
            }
        }

        paths
    }
}

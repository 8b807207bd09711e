//! Source scanner - read, fingerprint, transform and extract per file
//!
//! Every file is handled independently; with the `parallel` feature the
//! per-file work runs on a bounded rayon pool. File-level failures never
//! escape this module: they become a [`ScanWarning`] plus an empty token set.

pub mod content;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cache::CandidateCache;
use crate::core::error::ConfigurationError;
use crate::core::file_reader::{decode_lossy, read_bytes, FileReadConfig};
use crate::core::model::{FileRecord, FileType, ScanWarning, WarningCode};
use crate::core::paths::record_key;
use crate::core::util::{hash_bytes, HashAlgorithm};
use crate::extract::Extractor;
use crate::transform::TransformRegistry;

pub use content::ContentSet;

/// Records and warnings produced by one scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Sorted by path
    pub records: Vec<FileRecord>,

    /// Sorted by path
    pub warnings: Vec<ScanWarning>,

    /// Files whose tokens were taken from the prior cache
    pub reused: usize,
}

/// Scanner options
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub read: FileReadConfig,
    pub hash: HashAlgorithm,

    /// Worker threads; 0 uses the rayon default
    pub threads: usize,

    /// Extension aliases, e.g. `templ -> html`
    pub extension_aliases: BTreeMap<String, String>,
}

/// Produces [`FileRecord`]s for concrete paths
pub struct Scanner {
    root: PathBuf,
    registry: TransformRegistry,
    extractor: Extractor,
    options: ScanOptions,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

struct FileScan {
    record: FileRecord,
    warnings: Vec<ScanWarning>,
    reused: bool,
}

impl Scanner {
    pub fn new(
        root: &Path,
        registry: TransformRegistry,
        extractor: Extractor,
        options: ScanOptions,
    ) -> Result<Self, ConfigurationError> {
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .thread_name(|i| format!("windscan-scan-{}", i))
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                key: "scan.threads".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            root: root.to_path_buf(),
            registry,
            extractor,
            options,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File type of `path`, after applying extension aliases
    pub fn file_type_of(&self, path: &Path) -> FileType {
        match FileType::from_path(path) {
            FileType::Named(ext) => match self.options.extension_aliases.get(&ext) {
                Some(alias) => FileType::named(alias.as_str()),
                None => FileType::Named(ext),
            },
            FileType::Untyped => FileType::Untyped,
        }
    }

    /// Scan `paths`. When `prior` holds a record with the same fingerprint
    /// its tokens are reused instead of re-running transform and extraction.
    pub fn scan(&self, paths: &[PathBuf], prior: Option<&CandidateCache>) -> ScanOutcome {
        let results = self.scan_all(paths, prior);

        let mut outcome = ScanOutcome::default();
        for result in results {
            if result.reused {
                outcome.reused += 1;
            }
            outcome.warnings.extend(result.warnings);
            outcome.records.push(result.record);
        }
        outcome.records.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.warnings.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!(
            files = outcome.records.len(),
            reused = outcome.reused,
            warnings = outcome.warnings.len(),
            "scan finished"
        );
        outcome
    }

    /// Resolve the content set and scan everything in it
    pub fn scan_content(&self, content: &ContentSet, prior: Option<&CandidateCache>) -> ScanOutcome {
        let paths: Vec<PathBuf> = content.resolve_paths().into_iter().collect();
        self.scan(&paths, prior)
    }

    #[cfg(feature = "parallel")]
    fn scan_all(&self, paths: &[PathBuf], prior: Option<&CandidateCache>) -> Vec<FileScan> {
        use rayon::prelude::*;

        self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| self.scan_file(path, prior))
                .collect()
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn scan_all(&self, paths: &[PathBuf], prior: Option<&CandidateCache>) -> Vec<FileScan> {
        paths.iter().map(|path| self.scan_file(path, prior)).collect()
    }

    fn scan_file(&self, path: &Path, prior: Option<&CandidateCache>) -> FileScan {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let key = record_key(&absolute, &self.root);
        let file_type = self.file_type_of(&absolute);

        let bytes = match read_bytes(&absolute, &self.options.read) {
            Ok(bytes) => bytes,
            Err(failure) => {
                let warning = ScanWarning::new(key.clone(), failure.code, failure.reason);
                tracing::warn!(path = %warning.path, code = warning.code.as_str(), "{}", warning.reason);
                return FileScan {
                    record: FileRecord::new(key, file_type, String::new()),
                    warnings: vec![warning],
                    reused: false,
                };
            }
        };

        let fingerprint = hash_bytes(&bytes, self.options.hash);

        if let Some(tokens) = prior
            .and_then(|cache| cache.get(&key))
            .filter(|record| record.fingerprint == fingerprint)
            .map(|record| record.tokens.clone())
        {
            return FileScan {
                record: FileRecord::new(key, file_type, fingerprint).with_tokens(tokens),
                warnings: Vec::new(),
                reused: true,
            };
        }

        let mut warnings = Vec::new();
        let (text, lossy) = decode_lossy(&bytes);
        if lossy {
            let warning = ScanWarning::new(
                key.clone(),
                WarningCode::LossyDecode,
                "invalid UTF-8 replaced with U+FFFD",
            );
            tracing::warn!(path = %warning.path, code = warning.code.as_str(), "{}", warning.reason);
            warnings.push(warning);
        }

        let scannable = self.registry.resolve(&file_type).apply(&text);
        let tokens = self.extractor.extract(&scannable);

        FileScan {
            record: FileRecord::new(key, file_type, fingerprint).with_tokens(tokens),
            warnings,
            reused: false,
        }
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformSpec;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn scanner(root: &Path) -> Scanner {
        Scanner::new(root, TransformRegistry::new(), Extractor::default(), ScanOptions::default())
            .unwrap()
    }

    fn leptos_scanner(root: &Path) -> Scanner {
        let mut registry = TransformRegistry::new();
        let transform = TransformSpec::Replace {
            pattern: r"(?:^|\s)class:".to_string(),
            replacement: " ".to_string(),
        }
        .build("rs")
        .unwrap();
        registry.register(FileType::named("rs"), transform);
        Scanner::new(root, registry, Extractor::default(), ScanOptions::default()).unwrap()
    }

    #[test]
    fn test_scan_extracts_tokens() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.html"), "<p class=\"flex mt-4\">").unwrap();

        let outcome = scanner(temp.path()).scan(&[temp.path().join("a.html")], None);
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.path, "a.html");
        assert_eq!(record.file_type, FileType::named("html"));
        assert!(record.tokens.contains("flex"));
        assert!(record.tokens.contains("mt-4"));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_transform_applied_by_file_type() {
        let temp = tempdir().unwrap();
        let source = r#"view! { <div class:hidden=move || open.get()></div> }"#;
        fs::write(temp.path().join("app.rs"), source).unwrap();
        fs::write(temp.path().join("app.txt"), source).unwrap();

        let outcome = leptos_scanner(temp.path()).scan(
            &[temp.path().join("app.rs"), temp.path().join("app.txt")],
            None,
        );
        let rs = &outcome.records[0];
        let txt = &outcome.records[1];
        assert_eq!(rs.path, "app.rs");
        assert!(rs.tokens.contains("hidden"));
        assert!(!rs.tokens.contains("class:hidden"));
        assert!(txt.tokens.contains("class:hidden"));
    }

    #[test]
    fn test_fingerprint_is_over_raw_bytes() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("app.rs"), " class:flex").unwrap();
        fs::write(temp.path().join("app.txt"), " class:flex").unwrap();

        let outcome = leptos_scanner(temp.path()).scan(
            &[temp.path().join("app.rs"), temp.path().join("app.txt")],
            None,
        );
        assert_eq!(outcome.records[0].fingerprint, outcome.records[1].fingerprint);
        assert_ne!(outcome.records[0].tokens, outcome.records[1].tokens);
    }

    #[test]
    fn test_unreadable_file_yields_warning_and_empty_tokens() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("ok.html"), "flex").unwrap();

        let outcome = scanner(temp.path()).scan(
            &[temp.path().join("gone.html"), temp.path().join("ok.html")],
            None,
        );
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records[0].tokens.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].path, "gone.html");
        assert_eq!(outcome.warnings[0].code, WarningCode::Unreadable);
        assert!(outcome.records[1].tokens.contains("flex"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy_not_fatal() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("bin.html"), [b'f', b'l', b'e', b'x', b' ', 0xff, b'p']).unwrap();

        let outcome = scanner(temp.path()).scan(&[temp.path().join("bin.html")], None);
        assert!(outcome.records[0].tokens.contains("flex"));
        assert!(outcome.records[0].tokens.contains("p"));
        assert_eq!(outcome.warnings[0].code, WarningCode::LossyDecode);
    }

    #[test]
    fn test_prior_tokens_reused_for_same_fingerprint() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.html");
        fs::write(&path, "flex").unwrap();

        let s = scanner(temp.path());
        let first = s.scan(&[path.clone()], None);
        let mut cache = CandidateCache::new();
        cache.diff(first.records.clone(), true);

        let second = s.scan(&[path.clone()], Some(&cache));
        assert_eq!(second.reused, 1);
        assert_eq!(second.records, first.records);

        fs::write(&path, "grid").unwrap();
        let third = s.scan(&[path], Some(&cache));
        assert_eq!(third.reused, 0);
        let expected: BTreeSet<String> = ["grid".to_string()].into_iter().collect();
        assert_eq!(third.records[0].tokens, expected);
    }

    #[test]
    fn test_extension_alias() {
        let temp = tempdir().unwrap();
        let mut options = ScanOptions::default();
        options
            .extension_aliases
            .insert("templ".to_string(), "html".to_string());
        let s = Scanner::new(temp.path(), TransformRegistry::new(), Extractor::default(), options)
            .unwrap();
        assert_eq!(s.file_type_of(Path::new("a.templ")), FileType::named("html"));
        assert_eq!(s.file_type_of(Path::new("a.rs")), FileType::named("rs"));
    }

    #[test]
    fn test_scan_order_independent() {
        let temp = tempdir().unwrap();
        for (name, body) in [("a.html", "flex"), ("b.html", "grid"), ("c.html", "p-2")] {
            fs::write(temp.path().join(name), body).unwrap();
        }
        let s = scanner(temp.path());
        let forward = s.scan(
            &[
                temp.path().join("a.html"),
                temp.path().join("b.html"),
                temp.path().join("c.html"),
            ],
            None,
        );
        let backward = s.scan(
            &[
                temp.path().join("c.html"),
                temp.path().join("b.html"),
                temp.path().join("a.html"),
            ],
            None,
        );
        assert_eq!(forward.records, backward.records);
    }
}

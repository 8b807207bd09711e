//! Configuration - `windscan.toml`
//!
//! ```toml
//! [content]
//! files = ["./src/**/*.rs"]
//!
//! [content.transform.rs]
//! kind = "replace"
//! pattern = '(?:^|\s)class:'
//! replacement = " "
//! ```
//!
//! `theme` and `plugins` are accepted for compatibility and only matter to
//! whoever builds the catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::ConfigurationError;
use crate::core::file_reader::{FileReadConfig, DEFAULT_MAX_FILE_SIZE, DEFAULT_READ_TIMEOUT_MS};
use crate::core::util::{short_hash, HashAlgorithm};
use crate::extract::{Extractor, TokenAlphabet, DEFAULT_MAX_TOKEN_LEN, DEFAULT_PUNCTUATION};
use crate::scanner::ScanOptions;
use crate::transform::TransformRegistry;

/// Default config file name, looked up in the root
pub const CONFIG_FILE: &str = "windscan.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub content: ContentConfig,
    pub scan: ScanConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
    pub theme: Option<toml::Value>,
    pub plugins: Vec<toml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Glob patterns relative to the root
    pub files: Vec<String>,

    /// Glob patterns excluded from `files`
    pub ignore: Vec<String>,

    /// File type → transform table
    pub transform: BTreeMap<String, toml::Value>,

    /// Extension → file type aliases
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker threads (0 = number of CPUs)
    pub threads: usize,
    /// Per-file read timeout (0 = no timeout)
    pub read_timeout_ms: u64,
    pub max_file_size: u64,
    pub max_token_len: usize,
    /// Punctuation allowed in class tokens besides ASCII letters and digits
    pub alphabet: String,
    pub hash: HashAlgorithm,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
            alphabet: DEFAULT_PUNCTUATION.to_string(),
            hash: HashAlgorithm::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON catalog; the builtin catalog is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
    pub minify: bool,
}

/// Load a config file
pub fn load(path: &Path) -> Result<Config, ConfigurationError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, path)
}

fn parse(text: &str, path: &Path) -> Result<Config, ConfigurationError> {
    toml::from_str(text).map_err(|source| ConfigurationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `explicit`, or `<root>/windscan.toml` if present, or defaults
pub fn load_or_default(root: &Path, explicit: Option<&Path>) -> Result<Config, ConfigurationError> {
    match explicit {
        Some(path) => load(&resolve_path(root, path)),
        None => {
            let default = root.join(CONFIG_FILE);
            if default.exists() {
                load(&default)
            } else {
                tracing::debug!(root = %root.display(), "no config file, using defaults");
                Ok(Config::default())
            }
        }
    }
}

/// `path` relative to `root` unless already absolute
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl Config {
    pub fn transform_registry(&self) -> Result<TransformRegistry, ConfigurationError> {
        TransformRegistry::from_config(&self.content.transform)
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(TokenAlphabet::new(&self.scan.alphabet))
            .with_max_token_len(self.scan.max_token_len)
    }

    pub fn read_config(&self) -> FileReadConfig {
        FileReadConfig {
            max_file_size: self.scan.max_file_size,
            timeout: match self.scan.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            read: self.read_config(),
            hash: self.scan.hash,
            threads: self.scan.threads,
            extension_aliases: self
                .content
                .extensions
                .iter()
                .map(|(ext, alias)| {
                    (
                        ext.trim_start_matches('.').to_ascii_lowercase(),
                        alias.trim_start_matches('.').to_ascii_lowercase(),
                    )
                })
                .collect(),
        }
    }

    /// Identity of everything that influences extracted tokens. A persisted
    /// cache is only reused under the same policy hash.
    pub fn policy_hash(&self) -> String {
        #[derive(Serialize)]
        struct Policy<'a> {
            content: &'a ContentConfig,
            alphabet: &'a str,
            max_token_len: usize,
            max_file_size: u64,
            hash: HashAlgorithm,
        }

        let policy = Policy {
            content: &self.content,
            alphabet: &self.scan.alphabet,
            max_token_len: self.scan.max_token_len,
            max_file_size: self.scan.max_file_size,
            hash: self.scan.hash,
        };
        let json = serde_json::to_string(&policy).unwrap_or_default();
        short_hash(json.as_bytes())
    }
}

//! Cache metadata management

use serde::{Deserialize, Serialize};

/// Default cache version
pub const CACHE_VERSION: &str = "1";

/// Cache metadata stored in .windscan/meta.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Cache format version
    pub cache_version: String,

    /// Root directory (absolute path)
    pub root: String,

    /// Hash of the scan policy (patterns, transforms, alphabet, hash algorithm)
    pub policy_hash: String,

    /// Timestamp when cache was generated (ms since epoch)
    pub generated_at: i64,
}

impl CacheMeta {
    pub fn new(root: &str, policy_hash: &str) -> Self {
        Self {
            cache_version: CACHE_VERSION.to_string(),
            root: root.to_string(),
            policy_hash: policy_hash.to_string(),
            generated_at: crate::core::util::now_ms(),
        }
    }

    /// Whether records written under this metadata may be reused
    pub fn is_compatible(&self, policy_hash: &str) -> bool {
        self.cache_version == CACHE_VERSION && self.policy_hash == policy_hash
    }
}

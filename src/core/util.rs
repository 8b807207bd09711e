//! Common utilities

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Xxh3,
    Sha1,
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xxh3" | "xxhash" => Ok(HashAlgorithm::Xxh3),
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            _ => Err(format!("Unknown hash algorithm: {}", s)),
        }
    }
}

/// Compute a content fingerprint of raw bytes.
///
/// xxh3 uses the 128-bit variant so fingerprints stay collision resistant
/// across large trees; sha1 is available when a cryptographic digest is
/// preferred.
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Xxh3 => format!("{:032x}", xxh3_128(data)),
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        }
    }
}

/// Short, non-cryptographic hash used for policy/config identity
pub fn short_hash(data: &[u8]) -> String {
    format!("{:016x}", xxh3_64(data))
}

/// Get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let data = b"hello world";
        let hash = hash_bytes(data, HashAlgorithm::Xxh3);
        assert_eq!(hash.len(), 32); // 128-bit hex

        let sha1_hash = hash_bytes(data, HashAlgorithm::Sha1);
        assert_eq!(sha1_hash.len(), 40); // 160-bit hex
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            hash_bytes(b"flex mt-4", HashAlgorithm::Xxh3),
            hash_bytes(b"flex mt-4", HashAlgorithm::Xxh3)
        );
        assert_ne!(
            hash_bytes(b"flex mt-4", HashAlgorithm::Xxh3),
            hash_bytes(b"flex mt-5", HashAlgorithm::Xxh3)
        );
    }

    #[test]
    fn test_short_hash_len() {
        assert_eq!(short_hash(b"policy").len(), 16);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("sha1".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha1));
        assert_eq!("XXH3".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Xxh3));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_now_ms_positive() {
        assert!(now_ms() > 0);
    }
}

//! File reading strategies
//!
//! Provides consistent handling for:
//! - Reads that hang (bounded timeout)
//! - Oversized files
//! - Non-UTF-8 content (lossy decode)

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::core::model::WarningCode;

/// Default maximum file size in bytes (16 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Default read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Configuration for file reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReadConfig {
    /// Maximum file size to process (bytes)
    pub max_file_size: u64,

    /// Read timeout; `None` reads on the calling thread without a bound
    pub timeout: Option<Duration>,
}

impl Default for FileReadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: Some(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS)),
        }
    }
}

/// Why a file produced no bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    pub code: WarningCode,
    pub reason: String,
}

impl ReadFailure {
    fn new(code: WarningCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Read a file's raw bytes under the given configuration
pub fn read_bytes(path: &Path, config: &FileReadConfig) -> Result<Vec<u8>, ReadFailure> {
    let metadata = fs::metadata(path).map_err(|e| {
        ReadFailure::new(WarningCode::Unreadable, format!("cannot read metadata: {}", e))
    })?;

    if metadata.len() > config.max_file_size {
        return Err(ReadFailure::new(
            WarningCode::Skipped,
            format!(
                "file size {} exceeds limit {}",
                metadata.len(),
                config.max_file_size
            ),
        ));
    }

    match config.timeout {
        None => fs::read(path).map_err(|e| ReadFailure::new(WarningCode::Unreadable, e.to_string())),
        Some(timeout) => read_with_timeout(path.to_path_buf(), timeout),
    }
}

/// Read on a helper thread and give up after `timeout`.
///
/// A read that outlives the timeout keeps its thread until the OS returns;
/// its result is dropped.
fn read_with_timeout(path: PathBuf, timeout: Duration) -> Result<Vec<u8>, ReadFailure> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("windscan-read".to_string())
        .spawn(move || {
            let _ = tx.send(fs::read(&path));
        })
        .map_err(|e| {
            ReadFailure::new(WarningCode::Unreadable, format!("cannot spawn reader: {}", e))
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(ReadFailure::new(WarningCode::Unreadable, e.to_string())),
        Err(_) => Err(ReadFailure::new(
            WarningCode::ReadTimeout,
            format!("read did not complete within {} ms", timeout.as_millis()),
        )),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD.
///
/// Returns the text and whether any replacement happened.
pub fn decode_lossy(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    let text = String::from_utf8_lossy(bytes);
    let lossy = matches!(text, Cow::Owned(_));
    (text, lossy)
}

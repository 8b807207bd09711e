//! Cache store - Read/write .windscan/ cache files

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cache::meta::CacheMeta;
use crate::cache::CandidateCache;
use crate::core::model::FileRecord;
use crate::core::paths::cache_dir;

/// Cache file names
pub const RECORDS_CACHE: &str = "records.jsonl";
pub const META_FILE: &str = "meta.json";

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> Result<PathBuf> {
    let cache = cache_dir(root);
    if !cache.exists() {
        fs::create_dir_all(&cache).context("Failed to create .windscan directory")?;
    }
    Ok(cache)
}

/// Write file records to a JSONL cache file
pub fn write_records<'a>(
    cache_path: &Path,
    records: impl IntoIterator<Item = &'a FileRecord>,
) -> Result<()> {
    let file_path = cache_path.join(RECORDS_CACHE);
    let file = File::create(&file_path)
        .with_context(|| format!("Failed to create cache file: {:?}", file_path))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let json = serde_json::to_string(record)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;

    Ok(())
}

/// Read file records from the JSONL cache file
pub fn read_records(cache_path: &Path) -> Result<Vec<FileRecord>> {
    let file_path = cache_path.join(RECORDS_CACHE);
    let file = File::open(&file_path)
        .with_context(|| format!("Failed to open cache file: {:?}", file_path))?;

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            let record: FileRecord = serde_json::from_str(&line)
                .with_context(|| format!("Corrupt cache line in {:?}", file_path))?;
            records.push(record);
        }
    }

    Ok(records)
}

/// Write cache metadata
pub fn write_meta(cache_path: &Path, meta: &CacheMeta) -> Result<()> {
    let file_path = cache_path.join(META_FILE);
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(&file_path, json).context("Failed to write meta.json")?;
    Ok(())
}

/// Read cache metadata
pub fn read_meta(cache_path: &Path) -> Result<CacheMeta> {
    let file_path = cache_path.join(META_FILE);
    let content = fs::read_to_string(&file_path).context("Failed to read meta.json")?;
    let meta: CacheMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load a persisted cache if it exists and was written under the same policy.
///
/// Any problem (missing files, version or policy mismatch, corrupt lines)
/// yields `None`; the caller then starts from an empty cache.
pub fn load_cache(root: &Path, policy_hash: &str) -> Option<CandidateCache> {
    let cache = cache_dir(root);
    if !cache.exists() {
        return None;
    }

    let meta = match read_meta(&cache) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring cache without readable metadata");
            return None;
        }
    };
    if !meta.is_compatible(policy_hash) {
        tracing::debug!(
            cached = %meta.policy_hash,
            current = %policy_hash,
            "ignoring cache written under a different policy"
        );
        return None;
    }

    match read_records(&cache) {
        Ok(records) => Some(CandidateCache::from_records(records)),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable cache records");
            None
        }
    }
}

/// Persist the cache together with its metadata
pub fn save_cache(root: &Path, cache: &CandidateCache, policy_hash: &str) -> Result<()> {
    let cache_path = ensure_cache_dir(root)?;
    write_records(&cache_path, cache.records())?;

    let root_str = root.to_string_lossy().to_string();
    let meta = CacheMeta::new(&root_str, policy_hash);
    write_meta(&cache_path, &meta)?;
    Ok(())
}

/// Clear the cache
pub fn clear_cache(root: &Path) -> Result<bool> {
    let cache = cache_dir(root);
    if cache.exists() {
        fs::remove_dir_all(&cache).context("Failed to remove .windscan directory")?;
        return Ok(true);
    }
    Ok(false)
}

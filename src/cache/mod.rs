//! Candidate cache - path → (fingerprint, tokens), and change detection
//!
//! Provides:
//! - In-memory record map with token-level diffs
//! - Cache storage under .windscan/ (records.jsonl, meta.json)
//! - Cache metadata management

pub mod meta;
pub mod store;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::model::FileRecord;

/// Token-level changes produced by [`CandidateCache::diff`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub changed_paths: BTreeSet<String>,
}

impl CacheDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed_paths.is_empty()
    }

    fn record_delta(&mut self, path: &str, old: &BTreeSet<String>, new: &BTreeSet<String>) {
        self.added.extend(new.difference(old).cloned());
        self.removed.extend(old.difference(new).cloned());
        self.changed_paths.insert(path.to_string());
    }
}

/// Path-keyed file records.
///
/// The union of all records' tokens is exactly the set of tokens the live
/// stylesheet must cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateCache {
    records: BTreeMap<String, FileRecord>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.path.clone(), record))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn fingerprint_of(&self, path: &str) -> Option<&str> {
        self.records.get(path).map(|r| r.fingerprint.as_str())
    }

    pub fn tokens_of(&self, path: &str) -> Option<&BTreeSet<String>> {
        self.records.get(path).map(|r| &r.tokens)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge freshly scanned records.
    ///
    /// With `full_scan` the incoming records are the complete content set:
    /// cached paths missing from it are dropped and their tokens reported
    /// as removed.
    pub fn diff(&mut self, new_records: Vec<FileRecord>, full_scan: bool) -> CacheDiff {
        let mut diff = CacheDiff::default();
        let empty = BTreeSet::new();
        let mut seen = BTreeSet::new();

        for record in new_records {
            seen.insert(record.path.clone());
            match self.records.get(&record.path) {
                Some(old) if old.fingerprint == record.fingerprint => continue,
                Some(old) => diff.record_delta(&record.path, &old.tokens, &record.tokens),
                None => diff.record_delta(&record.path, &empty, &record.tokens),
            }
            self.records.insert(record.path.clone(), record);
        }

        if full_scan {
            let stale: Vec<String> = self
                .records
                .keys()
                .filter(|path| !seen.contains(*path))
                .cloned()
                .collect();
            let removal = self.remove_paths(&stale);
            diff.removed.extend(removal.removed);
            diff.changed_paths.extend(removal.changed_paths);
        }

        diff
    }

    /// Forget `paths`; their tokens are reported as removed
    pub fn remove_paths(&mut self, paths: &[String]) -> CacheDiff {
        let mut diff = CacheDiff::default();
        let empty = BTreeSet::new();
        for path in paths {
            if let Some(old) = self.records.remove(path) {
                diff.record_delta(path, &old.tokens, &empty);
            }
        }
        diff
    }

    /// Union of every record's tokens
    pub fn live_tokens(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|record| record.tokens.iter().cloned())
            .collect()
    }
}

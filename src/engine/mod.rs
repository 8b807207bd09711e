//! Incremental orchestrator
//!
//! One cycle: scan (full or incremental) → update the candidate cache →
//! compile the live token set → diff against the previous rules → emit.
//!
//! State is threaded explicitly: [`Engine::run_cycle`] takes the previous
//! [`ScanState`] and returns the next one together with a [`CycleReport`].
//! A failed cycle never replaces the last good rule set.

pub mod queue;
pub mod sink;
#[cfg(feature = "watch")]
pub mod watch;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::cache::{CacheDiff, CandidateCache};
use crate::compiler::{compile, CatalogSource, FileCatalogSource, StaticCatalogSource};
use crate::config::{resolve_path, Config};
use crate::core::error::ConfigurationError;
use crate::core::model::{ChangeEvent, RuleDiff, ScanWarning, UtilityRule};
use crate::core::paths::record_key;
use crate::scanner::{ContentSet, Scanner};

pub use queue::{Trigger, TriggerQueue};
pub use sink::{CssFileSink, CssSink, MemorySink, StdoutSink};

/// Where the engine is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Scanning,
    Compiling,
    Failed,
}

/// Everything carried from one cycle to the next
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    cache: CandidateCache,
    rules: Vec<UtilityRule>,
    patterns: Vec<String>,
    initialized: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a persisted cache. The first cycle is still a full scan,
    /// but unchanged files keep their cached tokens.
    pub fn from_cache(cache: CandidateCache) -> Self {
        Self {
            cache,
            ..Self::default()
        }
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    /// Last successfully compiled rules, in stylesheet order
    pub fn rules(&self) -> &[UtilityRule] {
        &self.rules
    }

    /// Whether a cycle has completed successfully
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// `idle` on success, `failed` otherwise
    pub phase: Phase,
    pub full_scan: bool,
    pub files_scanned: usize,
    pub files_reused: usize,
    pub added_tokens: BTreeSet<String>,
    pub removed_tokens: BTreeSet<String>,
    pub changed_paths: BTreeSet<String>,
    pub rule_diff: RuleDiff,
    /// Size of the live rule set after the cycle
    pub rule_count: usize,
    pub warnings: Vec<ScanWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    pub fn is_failed(&self) -> bool {
        self.phase == Phase::Failed
    }
}

/// Paths touched by a change notification
#[derive(Debug, Default)]
struct IncrementalPlan {
    scan: Vec<PathBuf>,
    remove: Vec<String>,
}

pub struct Engine {
    root: PathBuf,
    content: ContentSet,
    ignore: Vec<String>,
    scanner: Scanner,
    catalog: Box<dyn CatalogSource>,
    sink: Box<dyn CssSink>,
    phase: Phase,
}

impl Engine {
    pub fn new(
        content: ContentSet,
        ignore: Vec<String>,
        scanner: Scanner,
        catalog: Box<dyn CatalogSource>,
        sink: Box<dyn CssSink>,
    ) -> Self {
        Self {
            root: content.root().to_path_buf(),
            content,
            ignore,
            scanner,
            catalog,
            sink,
            phase: Phase::Idle,
        }
    }

    /// Build an engine from configuration. All configuration errors surface
    /// here, before any cycle runs.
    pub fn from_config(
        root: &Path,
        config: &Config,
        sink: Box<dyn CssSink>,
    ) -> Result<Self, ConfigurationError> {
        let content = ContentSet::new(root, &config.content.files, &config.content.ignore)?;
        let scanner = Scanner::new(
            root,
            config.transform_registry()?,
            config.extractor(),
            config.scan_options(),
        )?;
        let catalog: Box<dyn CatalogSource> = match &config.catalog.path {
            Some(path) => Box::new(FileCatalogSource::new(resolve_path(root, path))),
            None => Box::new(StaticCatalogSource::builtin()),
        };
        Ok(Self::new(
            content,
            config.content.ignore.clone(),
            scanner,
            catalog,
            sink,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn content(&self) -> &ContentSet {
        &self.content
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Run one cycle
    pub fn run_cycle(&mut self, mut state: ScanState, trigger: Trigger) -> (ScanState, CycleReport) {
        let mut report = CycleReport::default();

        if let Trigger::PatternsChanged(patterns) = &trigger {
            match ContentSet::new(&self.root, patterns, &self.ignore) {
                Ok(content) => {
                    tracing::info!(patterns = ?patterns, "content patterns changed");
                    self.content = content;
                }
                Err(err) => return self.fail(state, report, err.to_string()),
            }
        }

        self.set_phase(Phase::Scanning);
        let live_before = state.cache.live_tokens();

        let plan = match trigger {
            Trigger::Changes(events)
                if state.initialized && state.patterns.as_slice() == self.content.patterns() =>
            {
                self.plan(&state.cache, events)
            }
            _ => None,
        };

        let (outcome, cache_diff) = match plan {
            Some(plan) => {
                let outcome = self.scanner.scan(&plan.scan, Some(&state.cache));
                let mut diff = state.cache.diff(outcome.records.clone(), false);
                merge_diff(&mut diff, state.cache.remove_paths(&plan.remove));
                (outcome, diff)
            }
            None => {
                report.full_scan = true;
                let outcome = self.scanner.scan_content(&self.content, Some(&state.cache));
                let diff = state.cache.diff(outcome.records.clone(), true);
                (outcome, diff)
            }
        };
        state.patterns = self.content.patterns().to_vec();

        let live_after = state.cache.live_tokens();
        report.files_scanned = outcome.records.len();
        report.files_reused = outcome.reused;
        report.warnings = outcome.warnings;
        report.changed_paths = cache_diff.changed_paths;
        report.added_tokens = live_after.difference(&live_before).cloned().collect();
        report.removed_tokens = live_before.difference(&live_after).cloned().collect();

        self.set_phase(Phase::Compiling);
        let catalog = match self.catalog.load() {
            Ok(catalog) => catalog,
            Err(err) => return self.fail(state, report, err.to_string()),
        };
        let rules = compile(&live_after, catalog.as_ref());
        let rule_diff = diff_rules(&state.rules, &rules);

        if !rule_diff.is_empty() || !state.initialized {
            if let Err(err) = self.sink.emit(&rule_diff, &rules) {
                return self.fail(state, report, err.to_string());
            }
        }

        tracing::info!(
            full = report.full_scan,
            files = report.files_scanned,
            reused = report.files_reused,
            added = rule_diff.added.len(),
            removed = rule_diff.removed.len(),
            rules = rules.len(),
            "cycle complete"
        );

        state.rules = rules;
        state.initialized = true;
        report.rule_count = state.rules.len();
        report.rule_diff = rule_diff;
        report.phase = Phase::Idle;
        self.set_phase(Phase::Idle);
        (state, report)
    }

    /// Map change events onto the cache. `None` when only a full scan can
    /// answer, e.g. a directory appeared.
    fn plan(&self, cache: &CandidateCache, events: Vec<ChangeEvent>) -> Option<IncrementalPlan> {
        let mut plan = IncrementalPlan::default();
        let mut scan = BTreeSet::new();
        let mut remove = BTreeSet::new();

        for event in events {
            let absolute = if event.path.is_absolute() {
                event.path
            } else {
                self.root.join(event.path)
            };
            let exists = absolute.exists();
            if exists && absolute.is_dir() {
                tracing::debug!(path = %absolute.display(), "directory change, falling back to full scan");
                return None;
            }

            let key = record_key(&absolute, &self.root);
            // What is on disk decides, not the event kind
            if !exists {
                // A removed directory takes every record below it along
                let prefix = format!("{}/", key);
                remove.extend(
                    cache
                        .records()
                        .map(|record| record.path.as_str())
                        .filter(|path| *path == key || path.starts_with(&prefix))
                        .map(str::to_string),
                );
            } else if self.content.matches(&absolute) {
                scan.insert(absolute);
            } else if cache.get(&key).is_some() {
                remove.insert(key);
            }
        }

        // Records without a fingerprint come from failed reads; retry them
        for record in cache.records().filter(|record| record.fingerprint.is_empty()) {
            if remove.contains(&record.path) {
                continue;
            }
            let absolute = self.root.join(&record.path);
            if absolute.is_file() && self.content.matches(&absolute) {
                scan.insert(absolute);
            }
        }

        plan.scan = scan.into_iter().collect();
        plan.remove = remove.into_iter().collect();
        Some(plan)
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "phase");
            self.phase = phase;
        }
    }

    fn fail(
        &mut self,
        state: ScanState,
        mut report: CycleReport,
        error: String,
    ) -> (ScanState, CycleReport) {
        tracing::warn!(phase = ?self.phase, "cycle failed: {}", error);
        self.set_phase(Phase::Failed);
        report.phase = Phase::Failed;
        self.set_phase(Phase::Idle);
        report.rule_count = state.rules.len();
        report.error = Some(error);
        (state, report)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.root)
            .field("patterns", &self.content.patterns())
            .field("phase", &self.phase)
            .finish()
    }
}

fn merge_diff(into: &mut CacheDiff, other: CacheDiff) {
    into.added.extend(other.added);
    into.removed.extend(other.removed);
    into.changed_paths.extend(other.changed_paths);
}

fn same_rule(a: &UtilityRule, b: &UtilityRule) -> bool {
    a.selector == b.selector && a.declarations == b.declarations && a.wrappers == b.wrappers
}

/// Rules to add and remove to go from `old` to `new`.
///
/// Rules are matched by token; a token whose output changed (e.g. after a
/// catalog edit) shows up on both sides. Position alone is not a change.
pub fn diff_rules(old: &[UtilityRule], new: &[UtilityRule]) -> RuleDiff {
    let old_by_token: BTreeMap<&str, &UtilityRule> =
        old.iter().map(|rule| (rule.token.as_str(), rule)).collect();
    let new_by_token: BTreeMap<&str, &UtilityRule> =
        new.iter().map(|rule| (rule.token.as_str(), rule)).collect();

    RuleDiff {
        added: new
            .iter()
            .filter(|rule| {
                old_by_token
                    .get(rule.token.as_str())
                    .map_or(true, |prev| !same_rule(prev, rule))
            })
            .cloned()
            .collect(),
        removed: old
            .iter()
            .filter(|rule| {
                new_by_token
                    .get(rule.token.as_str())
                    .map_or(true, |next| !same_rule(rule, next))
            })
            .cloned()
            .collect(),
    }
}

/// Owns an engine and its state, and runs a cycle per queued trigger
pub struct Orchestrator {
    engine: Engine,
    state: ScanState,
    queue: Arc<TriggerQueue>,
}

impl Orchestrator {
    pub fn new(engine: Engine, state: ScanState, queue: Arc<TriggerQueue>) -> Self {
        Self {
            engine,
            state,
            queue,
        }
    }

    pub fn queue(&self) -> Arc<TriggerQueue> {
        Arc::clone(&self.queue)
    }

    /// Process triggers until the queue is closed, then return the final state
    pub fn run<F>(mut self, mut on_report: F) -> ScanState
    where
        F: FnMut(&ScanState, &CycleReport),
    {
        while let Some(trigger) = self.queue.next() {
            let state = std::mem::take(&mut self.state);
            let (state, report) = self.engine.run_cycle(state, trigger);
            on_report(&state, &report);
            self.state = state;
        }
        tracing::debug!(coalesced = self.queue.coalesced(), "trigger queue closed");
        self.state
    }

    /// [`run`](Self::run) on a dedicated thread
    pub fn spawn<F>(self, on_report: F) -> JoinHandle<ScanState>
    where
        F: FnMut(&ScanState, &CycleReport) + Send + 'static,
    {
        std::thread::spawn(move || self.run(on_report))
    }
}

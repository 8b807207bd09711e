//! Command handlers behind the CLI

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cache::{store, CandidateCache};
use crate::config::{resolve_path, Config};
use crate::core::model::{FileRecord, ScanWarning};
use crate::core::render::{RenderConfig, Renderer};
use crate::engine::{
    CssFileSink, CssSink, CycleReport, Engine, MemorySink, ScanState, StdoutSink, Trigger,
};
use crate::scanner::{ContentSet, ScanOutcome, Scanner};

/// Everything a command needs from the command line
#[derive(Debug)]
pub struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub render: RenderConfig,
    pub quiet: bool,
    pub use_cache: bool,
}

impl Session {
    fn load_cache(&self) -> CandidateCache {
        if !self.use_cache {
            return CandidateCache::new();
        }
        store::load_cache(&self.root, &self.config.policy_hash()).unwrap_or_default()
    }

    fn initial_state(&self) -> ScanState {
        ScanState::from_cache(self.load_cache())
    }

    fn persist(&self, cache: &CandidateCache) -> Result<()> {
        if self.use_cache {
            store::save_cache(&self.root, cache, &self.config.policy_hash())?;
        }
        Ok(())
    }

    fn print<T: serde::Serialize + crate::core::render::MarkdownLine>(&self, items: &[T]) {
        let renderer = Renderer::with_config(self.render);
        println!("{}", renderer.render(items));
    }

    fn warn_all(&self, warnings: &[ScanWarning]) {
        if self.quiet {
            return;
        }
        for warning in warnings {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
    }

    fn summarize(&self, report: &CycleReport) {
        self.warn_all(&report.warnings);
        if self.quiet {
            return;
        }
        let status = if report.is_failed() {
            "✗ failed".red().bold()
        } else {
            "✓ built".green().bold()
        };
        eprintln!(
            "{} {} files ({} reused) │ {} rules (+{} -{}) │ {} warnings",
            status,
            report.files_scanned,
            report.files_reused,
            report.rule_count,
            report.rule_diff.added.len(),
            report.rule_diff.removed.len(),
            report.warnings.len()
        );
        if let Some(error) = &report.error {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
    }

    /// Where `build`/`watch` write CSS: `--out`, then output.path, then stdout
    fn css_sink(&self, out: Option<PathBuf>, minify: bool) -> Box<dyn CssSink> {
        let minify = minify || self.config.output.minify;
        let target = out.or_else(|| {
            self.config
                .output
                .path
                .as_deref()
                .map(|path| resolve_path(&self.root, path))
        });
        match target {
            Some(path) => Box::new(CssFileSink::new(path, minify)),
            None => Box::new(StdoutSink::new(minify)),
        }
    }

    /// Full scan of the content set, refreshing the persisted cache
    fn scan(&self) -> Result<(ScanOutcome, CandidateCache)> {
        let config = &self.config;
        let content = ContentSet::new(&self.root, &config.content.files, &config.content.ignore)?;
        let scanner = Scanner::new(
            &self.root,
            config.transform_registry()?,
            config.extractor(),
            config.scan_options(),
        )?;

        let mut cache = self.load_cache();
        let outcome = scanner.scan_content(&content, Some(&cache));
        cache.diff(outcome.records.clone(), true);
        self.persist(&cache)?;
        self.warn_all(&outcome.warnings);
        Ok((outcome, cache))
    }

    fn run_once(&self, sink: Box<dyn CssSink>) -> Result<(ScanState, CycleReport)> {
        let mut engine = Engine::from_config(&self.root, &self.config, sink)?;
        let (state, report) = engine.run_cycle(self.initial_state(), Trigger::Initial);
        self.persist(state.cache())?;
        Ok((state, report))
    }
}

/// Run scan command
pub fn run_scan(session: &Session) -> Result<()> {
    let (outcome, _) = session.scan()?;
    let records: Vec<FileRecord> = outcome.records;
    session.print(&records);
    Ok(())
}

/// Run tokens command
pub fn run_tokens(session: &Session) -> Result<()> {
    let (_, cache) = session.scan()?;
    let tokens: Vec<String> = cache.live_tokens().into_iter().collect();
    session.print(&tokens);
    Ok(())
}

/// Run rules command
pub fn run_rules(session: &Session) -> Result<()> {
    let (state, report) = session.run_once(Box::new(MemorySink::new()))?;
    session.warn_all(&report.warnings);
    if let Some(error) = report.error {
        bail!(error);
    }
    session.print(state.rules());
    Ok(())
}

/// Run build command
pub fn run_build(session: &Session, out: Option<PathBuf>, minify: bool) -> Result<()> {
    let sink = session.css_sink(out, minify);
    let (_, report) = session.run_once(sink)?;
    session.summarize(&report);
    if let Some(error) = report.error {
        bail!(error);
    }
    Ok(())
}

/// Run watch command
#[cfg(feature = "watch")]
pub fn run_watch(session: &Session, out: Option<PathBuf>, minify: bool) -> Result<()> {
    use anyhow::Context as _;
    use std::sync::Arc;

    use crate::engine::watch::watch_content;
    use crate::engine::{Orchestrator, TriggerQueue};

    let sink = session.css_sink(out, minify);
    let engine = Engine::from_config(&session.root, &session.config, sink)?;

    let queue = Arc::new(TriggerQueue::new());
    let _watcher = watch_content(engine.content().clone(), Arc::clone(&queue))
        .context("failed to start watcher")?;
    queue.push(Trigger::Initial);

    if !session.quiet {
        eprintln!("watching for changes (press Ctrl+C to stop)...");
    }

    Orchestrator::new(engine, session.initial_state(), queue).run(|state, report| {
        if let Err(err) = session.persist(state.cache()) {
            tracing::warn!(error = %err, "failed to persist cache");
        }
        session.summarize(report);
    });
    Ok(())
}

/// Run cache clear command
pub fn run_cache_clear(root: &Path, quiet: bool) -> Result<()> {
    let removed = store::clear_cache(root)?;
    if !quiet {
        if removed {
            eprintln!("{} removed {}", "✓".green(), crate::core::paths::cache_dir(root).display());
        } else {
            eprintln!("no cache to remove");
        }
    }
    Ok(())
}

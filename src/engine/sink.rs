//! CSS output collaborators

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::SinkError;
use crate::core::model::{RuleDiff, UtilityRule};
use crate::core::render::render_css;

/// Receives the rule delta of every cycle that changed the stylesheet.
///
/// `stylesheet` is the complete rule set after applying `diff`, for sinks
/// that rewrite their output wholesale.
pub trait CssSink: Send + Sync {
    fn emit(&self, diff: &RuleDiff, stylesheet: &[UtilityRule]) -> Result<(), SinkError>;
}

/// Rewrites a CSS file on every emit
#[derive(Debug, Clone)]
pub struct CssFileSink {
    path: PathBuf,
    minify: bool,
}

impl CssFileSink {
    pub fn new(path: impl Into<PathBuf>, minify: bool) -> Self {
        Self {
            path: path.into(),
            minify,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, css: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Readers never observe a partially written stylesheet
        let tmp = self.path.with_extension("css.tmp");
        fs::write(&tmp, css)?;
        fs::rename(&tmp, &self.path)
    }
}

impl CssSink for CssFileSink {
    fn emit(&self, diff: &RuleDiff, stylesheet: &[UtilityRule]) -> Result<(), SinkError> {
        let css = render_css(stylesheet, self.minify);
        self.write(&css).map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            path = %self.path.display(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            rules = stylesheet.len(),
            "wrote stylesheet"
        );
        Ok(())
    }
}

/// Prints the full stylesheet to stdout on every emit
#[derive(Debug, Clone, Default)]
pub struct StdoutSink {
    minify: bool,
}

impl StdoutSink {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }
}

impl CssSink for StdoutSink {
    fn emit(&self, _diff: &RuleDiff, stylesheet: &[UtilityRule]) -> Result<(), SinkError> {
        let css = render_css(stylesheet, self.minify);
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(css.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|source| SinkError::Write {
                path: PathBuf::from("<stdout>"),
                source,
            })
    }
}

/// Keeps every emitted diff; used by tests and embedders
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: Mutex<Vec<RuleDiff>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<RuleDiff> {
        self.emitted.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<RuleDiff> {
        self.emitted.lock().ok().and_then(|d| d.last().cloned())
    }
}

impl CssSink for MemorySink {
    fn emit(&self, diff: &RuleDiff, _stylesheet: &[UtilityRule]) -> Result<(), SinkError> {
        if let Ok(mut emitted) = self.emitted.lock() {
            emitted.push(diff.clone());
        }
        Ok(())
    }
}

impl<T: CssSink + ?Sized> CssSink for std::sync::Arc<T> {
    fn emit(&self, diff: &RuleDiff, stylesheet: &[UtilityRule]) -> Result<(), SinkError> {
        (**self).emit(diff, stylesheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Declaration;
    use tempfile::tempdir;

    fn flex() -> UtilityRule {
        UtilityRule {
            token: "flex".to_string(),
            selector: ".flex".to_string(),
            declarations: vec![Declaration::new("display", "flex")],
            wrappers: Vec::new(),
            source_order: 0,
        }
    }

    #[test]
    fn test_file_sink_writes_stylesheet() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dist/app.css");
        let sink = CssFileSink::new(&path, true);

        let diff = RuleDiff {
            added: vec![flex()],
            removed: Vec::new(),
        };
        sink.emit(&diff, &[flex()]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), ".flex{display:flex}");
        assert!(!path.with_extension("css.tmp").exists());
    }

    #[test]
    fn test_file_sink_reports_write_failure() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let sink = CssFileSink::new(blocker.join("app.css"), false);

        let err = sink.emit(&RuleDiff::default(), &[]).unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
    }

    #[test]
    fn test_memory_sink_records_diffs() {
        let sink = MemorySink::new();
        assert!(sink.last().is_none());
        sink.emit(
            &RuleDiff {
                added: vec![flex()],
                removed: Vec::new(),
            },
            &[flex()],
        )
        .unwrap();
        assert_eq!(sink.emitted().len(), 1);
        assert_eq!(sink.last().unwrap().added[0].token, "flex");
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{ColumnAction, ColumnReport, NormalizeSummary};

/// Observer interface for normalization outcomes.
///
/// Implementors can record metrics or logs. Callbacks run on the thread that applies column
/// replacements, in schema order.
pub trait NormalizeObserver: Send + Sync {
    /// Called once per column after its outcome has been applied.
    fn on_column(&self, _report: &ColumnReport) {}

    /// Called once after every column has been processed.
    fn on_finished(&self, _summary: &NormalizeSummary) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn NormalizeObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn NormalizeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl NormalizeObserver for CompositeObserver {
    fn on_column(&self, report: &ColumnReport) {
        for o in &self.observers {
            o.on_column(report);
        }
    }

    fn on_finished(&self, summary: &NormalizeSummary) {
        for o in &self.observers {
            o.on_finished(summary);
        }
    }
}

/// Logs rewritten columns and the final summary to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl NormalizeObserver for StdErrObserver {
    fn on_column(&self, report: &ColumnReport) {
        if report.changed {
            eprintln!("[normalize][rewrite] column={} {}", report.column, report.action);
        }
    }

    fn on_finished(&self, summary: &NormalizeSummary) {
        eprintln!("[normalize][done] {summary}");
    }
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl NormalizeObserver for TracingObserver {
    fn on_column(&self, report: &ColumnReport) {
        match &report.action {
            ColumnAction::SkippedTyped | ColumnAction::NoLists { .. } => {
                tracing::trace!(column = %report.column, action = %report.action, "column left as-is");
            }
            _ if report.changed => {
                tracing::debug!(column = %report.column, action = %report.action, "column rewritten");
            }
            _ => {
                tracing::trace!(column = %report.column, action = %report.action, "list column already uniform");
            }
        }
    }

    fn on_finished(&self, summary: &NormalizeSummary) {
        tracing::info!(
            columns = summary.columns,
            scanned = summary.scanned,
            coerced = summary.coerced,
            rewritten = summary.rewritten,
            "normalization finished"
        );
    }
}

/// Appends one JSON object per column report (and one per summary) to a local file.
#[derive(Debug)]
pub struct JsonLinesObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesObserver {
    /// Create an observer that appends to `path`.
    ///
    /// Writes are best-effort; failures to open/write the file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append<T: serde::Serialize>(&self, record: &T) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl NormalizeObserver for JsonLinesObserver {
    fn on_column(&self, report: &ColumnReport) {
        self.append(report);
    }

    fn on_finished(&self, summary: &NormalizeSummary) {
        self.append(summary);
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ExtractionError;

/// Minimal per-row stats reported after a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStats {
    /// Number of configured output fields.
    pub fields: usize,
    /// Fields degraded to null cells by the skip-failed policy.
    pub fields_skipped: usize,
}

/// Observer interface for extraction outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. Callbacks never
/// affect extraction semantics or row cardinality.
pub trait ExtractionObserver: Send + Sync {
    /// Called when a row was extracted and merged successfully.
    fn on_row_extracted(&self, _stats: RowStats) {}

    /// Called when a field failed and was degraded to a null cell.
    fn on_field_skipped(&self, _path: &str, _message: &str) {}

    /// Called when a row failed fatally (no output row produced).
    fn on_row_failed(&self, _error: &ExtractionError) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ExtractionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ExtractionObserver>>) -> Self {
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

impl ExtractionObserver for CompositeObserver {
    fn on_row_extracted(&self, stats: RowStats) {
        for o in &self.observers {
            o.on_row_extracted(stats);
        }
    }

    fn on_field_skipped(&self, path: &str, message: &str) {
        for o in &self.observers {
            o.on_field_skipped(path, message);
        }
    }

    fn on_row_failed(&self, error: &ExtractionError) {
        for o in &self.observers {
            o.on_row_failed(error);
        }
    }
}

/// Logs extraction events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ExtractionObserver for StdErrObserver {
    fn on_row_extracted(&self, stats: RowStats) {
        eprintln!(
            "[extract][ok] fields={} skipped={}",
            stats.fields, stats.fields_skipped
        );
    }

    fn on_field_skipped(&self, path: &str, message: &str) {
        eprintln!("[extract][skip] path={path} err={message}");
    }

    fn on_row_failed(&self, error: &ExtractionError) {
        eprintln!("[extract][fail] err={error}");
    }
}

/// Appends extraction events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ExtractionObserver for FileObserver {
    fn on_row_extracted(&self, stats: RowStats) {
        self.append_line(&format!(
            "{} ok fields={} skipped={}",
            unix_ts(),
            stats.fields,
            stats.fields_skipped
        ));
    }

    fn on_field_skipped(&self, path: &str, message: &str) {
        self.append_line(&format!("{} skip path={path} err={message}", unix_ts()));
    }

    fn on_row_failed(&self, error: &ExtractionError) {
        self.append_line(&format!("{} fail err={error}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{info, warn};

use stockwise_analytics::RunReport;

/// Destination for completed run reports.
///
/// Reports are snapshots, not events: each one supersedes the previous.
pub trait SnapshotSink: Send + Sync + 'static {
    fn emit(&self, report: RunReport);
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySnapshotSink {
    inner: Mutex<Vec<RunReport>>,
}

impl InMemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<RunReport> {
        self.lock().clone()
    }

    pub fn latest(&self) -> Option<RunReport> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RunReport>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotSink for InMemorySnapshotSink {
    fn emit(&self, report: RunReport) {
        self.lock().push(report);
    }
}

/// Writes each report to `<dir>/<run_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, report: &RunReport) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", report.snapshot.run_id));
        let json = serde_json::to_vec_pretty(report)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

impl SnapshotSink for JsonDirectorySink {
    fn emit(&self, report: RunReport) {
        match self.write(&report) {
            Ok(path) => info!(run_id = %report.snapshot.run_id, path = %path.display(), "run report written"),
            Err(e) => warn!(run_id = %report.snapshot.run_id, error = %e, "failed to write run report"),
        }
    }
}

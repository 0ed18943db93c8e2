use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::GroupError;
use crate::types::Value;

/// Events emitted by the engine during a run.
///
/// `group` fields are 1-based. With more than one evaluation thread, `PartitionStarted`,
/// `GroupEvaluated` and `GroupFailed` of different partitions may interleave; all other events
/// are emitted in partition order.
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        partitions: usize,
        groups: usize,
    },
    PartitionStarted {
        key: Value,
        rows: usize,
    },
    GroupEvaluated {
        key: Value,
        group: usize,
        rows: usize,
    },
    GroupFailed {
        key: Value,
        group: usize,
        error: GroupError,
    },
    ArtifactWritten {
        key: Value,
        location: PathBuf,
    },
    ArtifactFailed {
        key: Value,
        error: String,
    },
    RunFinished {
        elapsed: Duration,
        metrics: RunMetricsSnapshot,
    },
}

/// Partition keys as shown in logs: `'N'`, or `null`.
pub(crate) struct KeyLabel<'a>(pub &'a Value);

impl fmt::Display for KeyLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Null => f.write_str("null"),
            v => write!(f, "'{v}'"),
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { partitions, groups } => {
                write!(f, "run started partitions={partitions} groups={groups}")
            }
            Self::PartitionStarted { key, rows } => {
                write!(f, "partition {} started rows={rows}", KeyLabel(key))
            }
            Self::GroupEvaluated { key, group, rows } => {
                write!(f, "partition {} group {group} rows={rows}", KeyLabel(key))
            }
            Self::GroupFailed { key, group, error } => {
                write!(f, "partition {} group {group} failed: {error}", KeyLabel(key))
            }
            Self::ArtifactWritten { key, location } => {
                write!(f, "partition {} written to {}", KeyLabel(key), location.display())
            }
            Self::ArtifactFailed { key, error } => {
                write!(f, "partition {} write failed: {error}", KeyLabel(key))
            }
            Self::RunFinished { elapsed, metrics } => {
                write!(f, "run finished in {elapsed:?}: {metrics}")
            }
        }
    }
}

/// Observer hook for run events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Prints every event to stderr.
#[derive(Debug, Default)]
pub struct StdErrRunObserver;

impl RunObserver for StdErrRunObserver {
    fn on_event(&self, event: &RunEvent) {
        eprintln!("[split-filter] {event}");
    }
}

/// Forwards events to the [`log`] facade.
///
/// Failures are logged at `warn` (group) and `error` (artifact), run boundaries and written
/// artifacts at `info`, per-partition progress at `debug`.
#[derive(Debug, Default)]
pub struct LogRunObserver;

impl RunObserver for LogRunObserver {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::GroupFailed { .. } => log::warn!("{event}"),
            RunEvent::ArtifactFailed { .. } => log::error!("{event}"),
            RunEvent::PartitionStarted { .. } | RunEvent::GroupEvaluated { .. } => {
                log::debug!("{event}")
            }
            RunEvent::RunStarted { .. }
            | RunEvent::ArtifactWritten { .. }
            | RunEvent::RunFinished { .. } => log::info!("{event}"),
        }
    }
}

/// Appends events to a local log file, one timestamped line per event.
///
/// Writes are best-effort; failures to open/write the log file are ignored.
#[derive(Debug)]
pub struct FileRunObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRunObserver {
    /// Create a file observer that appends events to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }
}

impl RunObserver for FileRunObserver {
    fn on_event(&self, event: &RunEvent) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {event}", unix_ts());
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Fans every event out to a list of observers.
#[derive(Default)]
pub struct CompositeRunObserver {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl CompositeRunObserver {
    /// Create a composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn RunObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeRunObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRunObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl RunObserver for CompositeRunObserver {
    fn on_event(&self, event: &RunEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Live counters for the current run.
///
/// The engine updates these while it works; callers can snapshot them at any time, from any
/// thread.
#[derive(Debug, Default)]
pub struct RunMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    partitions_evaluated: AtomicU64,
    rows_scanned: AtomicU64,
    groups_evaluated: AtomicU64,
    groups_failed: AtomicU64,
    rows_selected: AtomicU64,
    artifacts_written: AtomicU64,
    artifacts_failed: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        for counter in [
            &self.elapsed_ns,
            &self.partitions_evaluated,
            &self.rows_scanned,
            &self.groups_evaluated,
            &self.groups_failed,
            &self.rows_selected,
            &self.artifacts_written,
            &self.artifacts_failed,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_partition(&self, rows: usize) {
        let _ = self.partitions_evaluated.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_scanned.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_group_evaluated(&self, rows: usize) {
        let _ = self.groups_evaluated.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_selected.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_group_failed(&self) {
        let _ = self.groups_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_artifact_written(&self) {
        let _ = self.artifacts_written.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_artifact_failed(&self) {
        let _ = self.artifacts_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        RunMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            partitions_evaluated: self.partitions_evaluated.load(Ordering::SeqCst),
            rows_scanned: self.rows_scanned.load(Ordering::SeqCst),
            groups_evaluated: self.groups_evaluated.load(Ordering::SeqCst),
            groups_failed: self.groups_failed.load(Ordering::SeqCst),
            rows_selected: self.rows_selected.load(Ordering::SeqCst),
            artifacts_written: self.artifacts_written.load(Ordering::SeqCst),
            artifacts_failed: self.artifacts_failed.load(Ordering::SeqCst),
        }
    }
}

/// Immutable snapshot of [`RunMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub partitions_evaluated: u64,
    pub rows_scanned: u64,
    pub groups_evaluated: u64,
    pub groups_failed: u64,
    pub rows_selected: u64,
    pub artifacts_written: u64,
    pub artifacts_failed: u64,
}

impl fmt::Display for RunMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, partitions={}, rows_scanned={}, groups={} (failed {}), rows_selected={}, artifacts={} (failed {}), elapsed={:?}",
            self.run_id,
            self.partitions_evaluated,
            self.rows_scanned,
            self.groups_evaluated,
            self.groups_failed,
            self.rows_selected,
            self.artifacts_written,
            self.artifacts_failed,
            self.elapsed
        )
    }
}

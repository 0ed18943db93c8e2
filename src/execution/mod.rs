//! Run orchestration: split, evaluate, write.
//!
//! This module sits "above" [`crate::processing`] and [`crate::output`] and provides:
//!
//! - The [`ExecutionEngine`], which drives one [`FilterPlan`] over one dataset
//! - Optional parallel evaluation of partitions on a `rayon` pool
//! - Real-time metrics + observer hooks for monitoring
//!
//! Writes always happen on the calling thread, one artifact at a time, in partition order, so the
//! output of a run does not depend on the thread count.

mod observer;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::FilterPlan;
use crate::error::{ConfigError, ConfigResult, EvaluationError, GroupError, OutputError};
use crate::output::{Artifact, ArtifactSink, RAW_SECTION, group_section_name};
use crate::processing::{Operator, Partition, Partitions, combine, split};
use crate::types::{DataSet, Value};

pub use observer::{
    CompositeRunObserver, FileRunObserver, LogRunObserver, RunEvent, RunMetrics, RunMetricsSnapshot,
    RunObserver, StdErrRunObserver,
};

use observer::KeyLabel;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Number of threads used to evaluate partitions.
    ///
    /// `Some(1)` (the default) evaluates on the calling thread. `None` uses the platform's
    /// available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            num_threads: Some(1),
        }
    }
}

/// Outcome of evaluating one group against one partition.
///
/// `Ok(None)` only happens for an empty group, which a validated plan never contains.
pub type GroupOutcome = Result<Option<DataSet>, GroupError>;

/// One partition with the outcome of every group, in group order.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionResult {
    pub key: Value,
    pub raw: DataSet,
    pub groups: Vec<GroupOutcome>,
}

impl PartitionResult {
    /// Build the artifact for this partition and collect its group failures.
    ///
    /// Sections are `"raw"` followed by `"group N"` for every group that evaluated, including
    /// groups that selected nothing.
    pub fn into_artifact(self) -> (Artifact, Vec<GroupFailure>) {
        let mut artifact = Artifact::new(self.key);
        artifact.push(RAW_SECTION, self.raw);

        let mut failures = Vec::new();
        for (idx, outcome) in self.groups.into_iter().enumerate() {
            match outcome {
                Ok(Some(data)) => artifact.push(group_section_name(idx + 1), data),
                Ok(None) => {}
                Err(e) => failures.push(GroupFailure::new(artifact.key.clone(), idx + 1, e)),
            }
        }
        (artifact, failures)
    }
}

/// A group that could not be evaluated for one partition. The group gets no section.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub partition: Value,
    /// 1-based group index.
    pub group: usize,
    /// 1-based condition index within the group.
    pub condition: usize,
    pub column: String,
    pub operator: Operator,
    pub error: EvaluationError,
}

impl GroupFailure {
    fn new(partition: Value, group: usize, e: GroupError) -> Self {
        Self {
            partition,
            group,
            condition: e.condition,
            column: e.column,
            operator: e.operator,
            error: e.source,
        }
    }
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition {} group {} condition {} ({} {}): {}",
            KeyLabel(&self.partition),
            self.group,
            self.condition,
            self.column,
            self.operator,
            self.error
        )
    }
}

/// An artifact the sink failed to persist. The artifact is kept so callers can retry elsewhere.
#[derive(Debug)]
pub struct WriteFailure {
    pub partition: Value,
    pub artifact: Artifact,
    pub error: OutputError,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition {} write failed: {}",
            KeyLabel(&self.partition),
            self.error
        )
    }
}

/// Name and row count of one written section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    pub name: String,
    pub rows: usize,
}

/// What was produced for one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub key: Value,
    /// Where the sink put the artifact; `None` when the write failed.
    pub location: Option<PathBuf>,
    pub sections: Vec<SectionSummary>,
}

/// Summary of a completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per partition, in partition order.
    pub partitions: Vec<PartitionSummary>,
    pub group_failures: Vec<GroupFailure>,
    pub write_failures: Vec<WriteFailure>,
    pub metrics: RunMetricsSnapshot,
}

impl RunReport {
    /// `true` when every group evaluated and every artifact was written.
    pub fn is_success(&self) -> bool {
        self.group_failures.is_empty() && self.write_failures.is_empty()
    }

    /// Locations of the artifacts that were written, in partition order.
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.partitions.iter().filter_map(|p| p.location.as_ref())
    }
}

/// Drives a [`FilterPlan`] over a [`DataSet`].
///
/// ```rust
/// use split_filter::config::FilterPlan;
/// use split_filter::execution::ExecutionEngine;
/// use split_filter::output::MemorySink;
/// use split_filter::processing::{FilterCondition, FilterGroup};
/// use split_filter::types::{DataSet, DataType, Field, Schema, Value};
///
/// let schema = Schema::new(vec![
///     Field::new("region", DataType::Utf8),
///     Field::new("qty", DataType::Int64),
/// ]);
/// let ds = DataSet::new(
///     schema,
///     vec![
///         vec![Value::from("N"), Value::Int64(5)],
///         vec![Value::from("N"), Value::Int64(15)],
///         vec![Value::from("S"), Value::Int64(8)],
///     ],
/// );
/// let plan = FilterPlan::new(
///     "region",
///     vec![FilterGroup::new(FilterCondition::parse("qty", ">", "10").unwrap())],
/// );
///
/// let mut sink = MemorySink::new();
/// let report = ExecutionEngine::default().run(&ds, &plan, &mut sink).unwrap();
///
/// assert!(report.is_success());
/// let north = sink.get(&Value::from("N")).unwrap();
/// assert_eq!(north.section("group 1").unwrap().data.row_count(), 1);
/// ```
pub struct ExecutionEngine {
    pool: Option<ThreadPool>,
    observer: Option<Arc<dyn RunObserver>>,
    metrics: Arc<RunMetrics>,
}

impl Default for ExecutionEngine {
    /// A sequential engine with no observer.
    fn default() -> Self {
        Self {
            pool: None,
            observer: None,
            metrics: Arc::new(RunMetrics::new()),
        }
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("threads", &self.pool.as_ref().map_or(1, |p| p.current_num_threads()))
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// Fails with [`ConfigError::InvalidOption`] if `num_threads == Some(0)` or the thread pool
    /// cannot be built.
    pub fn new(opts: ExecutionOptions) -> ConfigResult<Self> {
        let n_threads = match opts.num_threads {
            Some(0) => {
                return Err(ConfigError::InvalidOption {
                    message: "num_threads must be > 0 when set".to_string(),
                });
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        let pool = if n_threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()
                .map_err(|e| ConfigError::InvalidOption {
                    message: format!("failed to build thread pool: {e}"),
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            pool,
            ..Self::default()
        })
    }

    /// Attach an observer for run events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Validate, split and evaluate without writing anything.
    ///
    /// Results are in partition order.
    pub fn evaluate(&self, dataset: &DataSet, plan: &FilterPlan) -> ConfigResult<Vec<PartitionResult>> {
        let partitions = self.prepare(dataset, plan)?;
        Ok(self.evaluate_partitions(partitions, plan))
    }

    /// Run `plan` over `dataset` and hand one artifact per partition to `sink`.
    ///
    /// Only an invalid plan aborts the run, before any partition is evaluated or written. Group
    /// and write failures are collected in the returned [`RunReport`].
    pub fn run<S>(&self, dataset: &DataSet, plan: &FilterPlan, sink: &mut S) -> ConfigResult<RunReport>
    where
        S: ArtifactSink + ?Sized,
    {
        let start = Instant::now();
        let partitions = self.prepare(dataset, plan)?;

        self.metrics.begin_run();
        self.emit(RunEvent::RunStarted {
            partitions: partitions.len(),
            groups: plan.groups().len(),
        });

        let mut report = RunReport::default();
        if self.pool.is_some() {
            for result in self.evaluate_partitions(partitions, plan) {
                self.write_partition(result, sink, &mut report);
            }
        } else {
            // One partition's selections in memory at a time.
            for partition in partitions {
                let result = self.evaluate_partition(partition, plan);
                self.write_partition(result, sink, &mut report);
            }
        }

        self.metrics.end_run(start.elapsed());
        report.metrics = self.metrics.snapshot();
        self.emit(RunEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: report.metrics.clone(),
        });

        Ok(report)
    }

    fn write_partition<S>(&self, result: PartitionResult, sink: &mut S, report: &mut RunReport)
    where
        S: ArtifactSink + ?Sized,
    {
        let (artifact, failures) = result.into_artifact();
        report.group_failures.extend(failures);

        let sections = artifact
            .sections
            .iter()
            .map(|s| SectionSummary {
                name: s.name.clone(),
                rows: s.data.row_count(),
            })
            .collect();

        let location = match sink.write_artifact(&artifact) {
            Ok(location) => {
                self.metrics.on_artifact_written();
                self.emit(RunEvent::ArtifactWritten {
                    key: artifact.key.clone(),
                    location: location.clone(),
                });
                Some(location)
            }
            Err(error) => {
                self.metrics.on_artifact_failed();
                self.emit(RunEvent::ArtifactFailed {
                    key: artifact.key.clone(),
                    error: error.to_string(),
                });
                report.write_failures.push(WriteFailure {
                    partition: artifact.key.clone(),
                    artifact: artifact.clone(),
                    error,
                });
                None
            }
        };

        report.partitions.push(PartitionSummary {
            key: artifact.key,
            location,
            sections,
        });
    }

    fn prepare(&self, dataset: &DataSet, plan: &FilterPlan) -> ConfigResult<Partitions> {
        plan.validate(&dataset.schema)?;
        split(dataset, plan.split_column())
    }

    fn evaluate_partitions(&self, partitions: Partitions, plan: &FilterPlan) -> Vec<PartitionResult> {
        let eval = |p: Partition| self.evaluate_partition(p, plan);
        match &self.pool {
            Some(pool) => pool.install(|| {
                partitions
                    .into_iter()
                    .collect::<Vec<_>>()
                    .into_par_iter()
                    .map(eval)
                    .collect()
            }),
            None => partitions.into_iter().map(eval).collect(),
        }
    }

    fn evaluate_partition(&self, partition: Partition, plan: &FilterPlan) -> PartitionResult {
        let Partition { key, rows, .. } = partition;
        self.metrics.on_partition(rows.row_count());
        self.emit(RunEvent::PartitionStarted {
            key: key.clone(),
            rows: rows.row_count(),
        });

        let groups = plan
            .groups()
            .iter()
            .enumerate()
            .map(|(idx, group)| {
                let outcome = combine(&rows, group);
                match &outcome {
                    Ok(Some(selected)) => {
                        self.metrics.on_group_evaluated(selected.row_count());
                        self.emit(RunEvent::GroupEvaluated {
                            key: key.clone(),
                            group: idx + 1,
                            rows: selected.row_count(),
                        });
                    }
                    Ok(None) => {}
                    Err(error) => {
                        self.metrics.on_group_failed();
                        self.emit(RunEvent::GroupFailed {
                            key: key.clone(),
                            group: idx + 1,
                            error: error.clone(),
                        });
                    }
                }
                outcome
            })
            .collect();

        PartitionResult {
            key,
            raw: rows,
            groups,
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

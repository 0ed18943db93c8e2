//! `split-filter` splits a tabular dataset by the distinct values of one column and, for every
//! resulting partition, evaluates a list of AND/OR filter groups. Each partition becomes one
//! output artifact (by default an `.xlsx` workbook) holding the unfiltered partition plus one
//! section per filter group.
//!
//! The primary entrypoint is [`execution::ExecutionEngine::run`], which takes a
//! [`types::DataSet`], a [`config::FilterPlan`] and an [`output::ArtifactSink`].
//!
//! ## What a run does
//!
//! 1. Validate the plan against the dataset schema. A bad plan aborts here, before anything is
//!    evaluated or written.
//! 2. Split the dataset into partitions, in first-occurrence order of the split-column values.
//! 3. For every partition, fold every group's conditions left to right.
//! 4. Write one artifact per partition: a `"raw"` section, then `"group 1"`, `"group 2"`, ...
//!
//! A group that fails to evaluate (e.g. `>` against a text column with a non-numeric operand)
//! only loses its own section, and a failed write only loses its own artifact. Both are collected
//! in the [`execution::RunReport`].
//!
//! ## Group semantics
//!
//! Connectors are applied strictly left to right, with no precedence: `A OR B AND C` is
//! `(A OR B) AND C`. `AND` narrows the running selection. `OR` appends rows of the **whole
//! partition** that match the condition and are not yet selected, so an `OR` can bring back rows
//! an earlier `AND` removed. Rows keep their selection order: existing rows first, then newly
//! added rows in partition order.
//!
//! ## Quick example
//!
//! ```no_run
//! use split_filter::config::PlanConfig;
//! use split_filter::execution::{ExecutionEngine, ExecutionOptions};
//! use split_filter::ingestion::{load_dataset, LoadOptions};
//! use split_filter::output::XlsxSink;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PlanConfig::from_path("plan.json")?;
//! let ds = load_dataset("orders.xlsx", &cfg.schema(), &LoadOptions::default())?;
//!
//! let engine = ExecutionEngine::new(ExecutionOptions::default())?;
//! let mut sink = XlsxSink::new("out");
//! let report = engine.run(&ds, &cfg.to_plan()?, &mut sink)?;
//!
//! for failure in &report.group_failures {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: schema + in-memory dataset types
//! - [`ingestion`]: loading CSV and (feature `excel`) workbook files
//! - [`processing`]: splitting, condition evaluation and group combination
//! - [`config`]: filter plans and the JSON plan file
//! - [`execution`]: the run orchestrator, observers and metrics
//! - [`output`]: artifacts and the sinks that write them
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod output;
pub mod processing;
pub mod types;

pub use error::{
    ConfigError, ConfigResult, EvaluationError, GroupError, IngestionError, IngestionResult,
    OutputError, OutputResult,
};

//! Split a spreadsheet by one column and write one filtered workbook per value.
//!
//! # Usage
//!
//! ```bash
//! split-filter --plan plan.json --input orders.xlsx --out out/
//! ```
//!
//! Exit codes: `0` when every group evaluated and every artifact was written, `1` when the plan or
//! the input could not be loaded, `2` when the run finished with failures.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use split_filter::config::PlanConfig;
use split_filter::execution::{
    CompositeRunObserver, ExecutionEngine, ExecutionOptions, FileRunObserver, LogRunObserver,
    RunObserver, RunReport,
};
use split_filter::ingestion::{LoadOptions, load_dataset};
use split_filter::output::{ArtifactSink, CsvSink};

/// Split a dataset by one column and evaluate filter groups per partition
#[derive(Parser, Debug)]
#[command(name = "split-filter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON plan: declared columns, split column and filter groups
    #[arg(long)]
    plan: PathBuf,

    /// Input file (.csv, .xlsx, .xls, .xlsm, .xlsb, .ods)
    #[arg(long)]
    input: PathBuf,

    /// Worksheet to read (defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::default())]
    format: OutputFormat,

    /// Threads used to evaluate partitions
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Also append run events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One workbook per partition
    Xlsx,
    /// One directory per partition, one CSV file per section
    Csv,
}

impl Default for OutputFormat {
    fn default() -> Self {
        if cfg!(feature = "excel") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            for failure in &report.group_failures {
                log::warn!("{failure}");
            }
            for failure in &report.write_failures {
                log::error!("{failure}");
            }
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let cfg = PlanConfig::from_path(&cli.plan)
        .with_context(|| format!("loading plan {}", cli.plan.display()))?;
    let plan = cfg.to_plan()?;

    let load = LoadOptions {
        sheet: cli.sheet.clone(),
        ..Default::default()
    };
    let dataset = load_dataset(&cli.input, &cfg.schema(), &load)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    log::info!(
        "loaded {} rows from {}",
        dataset.row_count(),
        cli.input.display()
    );

    let mut observers: Vec<Arc<dyn RunObserver>> = vec![Arc::new(LogRunObserver)];
    if let Some(path) = &cli.log_file {
        observers.push(Arc::new(FileRunObserver::new(path)));
    }
    let engine = ExecutionEngine::new(ExecutionOptions {
        num_threads: Some(cli.threads),
    })?
    .with_observer(Arc::new(CompositeRunObserver::new(observers)));

    let mut sink = make_sink(cli)?;
    let report = engine.run(&dataset, &plan, &mut sink)?;
    Ok(report)
}

fn make_sink(cli: &Cli) -> anyhow::Result<Box<dyn ArtifactSink>> {
    match cli.format {
        OutputFormat::Csv => Ok(Box::new(CsvSink::new(&cli.out))),
        #[cfg(feature = "excel")]
        OutputFormat::Xlsx => Ok(Box::new(split_filter::output::XlsxSink::new(&cli.out))),
        #[cfg(not(feature = "excel"))]
        OutputFormat::Xlsx => anyhow::bail!("xlsx output not enabled (enable cargo feature 'excel')"),
    }
}

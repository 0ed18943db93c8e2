use thiserror::Error;

use crate::processing::Operator;
use crate::types::DataType;

/// Convenience result type for input loading.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for plan construction and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Convenience result type for evaluating a single condition.
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Convenience result type for artifact sinks.
pub type OutputResult<T> = Result<T, OutputError>;

/// Error type returned by ingestion functions.
///
/// A single error enum shared across CSV and (optional) Excel loading.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel ingestion error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The input does not conform to the declared schema (missing columns, bad row arity, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the declared [`DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

/// Caller mistakes in a filter plan.
///
/// These are detected before any partition is processed and abort the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The operator text does not name a supported operator.
    #[error("unknown operator '{operator}'")]
    InvalidOperator { operator: String },

    /// The connector text is neither AND nor OR.
    #[error("unknown connector '{connector}' (expected AND or OR)")]
    InvalidConnector { connector: String },

    /// A filter group has no conditions.
    #[error("filter group {group} has no conditions")]
    EmptyGroup { group: usize },

    /// A referenced column is not part of the dataset schema.
    #[error("column '{column}' not found. columns={available:?}")]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// An engine or loader option is out of range.
    #[error("invalid option: {message}")]
    InvalidOption { message: String },

    /// A rule failed to parse; `group` and `condition` are 1-based.
    #[error("group {group} condition {condition}: {source}")]
    Condition {
        group: usize,
        condition: usize,
        source: Box<ConfigError>,
    },

    /// The plan file could not be read.
    #[error("failed to read plan: {0}")]
    PlanIo(#[from] std::io::Error),

    /// The plan file is not valid plan JSON.
    #[error("failed to parse plan: {0}")]
    PlanParse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Attach a (1-based) group/condition position to this error.
    pub fn at(self, group: usize, condition: usize) -> Self {
        Self::Condition {
            group,
            condition,
            source: Box::new(self),
        }
    }
}

/// Failure of a single condition against a single partition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// The column values and the operand cannot be compared with the operator.
    #[error(
        "cannot apply '{operator}' to column '{column}' ({data_type:?}) with operand '{operand}': {message}"
    )]
    TypeError {
        column: String,
        operator: Operator,
        operand: String,
        data_type: DataType,
        message: String,
    },

    /// The condition references a column the partition does not have.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },
}

/// A condition failure, tagged with the (1-based) position of the condition in its group.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("condition {condition} ({column} {operator} '{operand}'): {source}")]
pub struct GroupError {
    pub condition: usize,
    pub column: String,
    pub operator: Operator,
    pub operand: String,
    pub source: EvaluationError,
}

/// Failure to persist one artifact.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Underlying I/O error (directory creation, file open).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook writer error (feature-gated behind `excel`).
    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

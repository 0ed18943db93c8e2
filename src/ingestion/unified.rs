//! Format detection and the single loading entry point.

use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema};

use super::csv;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Options controlling [`load_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<IngestionFormat>,
    /// Worksheet to read; `None` reads the first sheet. Ignored for CSV.
    pub sheet: Option<String>,
}

/// Load `path` into a [`DataSet`]. `schema` types the declared columns; the others are kept too.
///
/// ```no_run
/// use split_filter::ingestion::{load_dataset, LoadOptions};
/// use split_filter::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), split_filter::IngestionError> {
/// let schema = Schema::new(vec![
///     Field::new("region", DataType::Utf8),
///     Field::new("qty", DataType::Int64),
/// ]);
/// let opts = LoadOptions {
///     sheet: Some("Orders".to_string()),
///     ..Default::default()
/// };
/// let ds = load_dataset("orders.xlsx", &schema, &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn load_dataset(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &LoadOptions,
) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    match format {
        IngestionFormat::Csv => csv::read_csv_path(path, schema),
        IngestionFormat::Excel => load_excel(path, schema, options.sheet.as_deref()),
    }
}

fn infer_format_from_path(path: &Path) -> IngestionResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| IngestionError::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}

#[cfg(feature = "excel")]
fn load_excel(path: &Path, schema: &Schema, sheet: Option<&str>) -> IngestionResult<DataSet> {
    super::excel::read_excel_path(path, sheet, schema)
}

#[cfg(not(feature = "excel"))]
fn load_excel(_path: &Path, _schema: &Schema, _sheet: Option<&str>) -> IngestionResult<DataSet> {
    Err(IngestionError::SchemaMismatch {
        message: "excel ingestion not enabled (enable cargo feature 'excel')".to_string(),
    })
}

//! Loading input files into a [`crate::types::DataSet`].
//!
//! Most callers should use [`load_dataset`] (from [`unified`]) which auto-detects the format by
//! file extension (or takes it from [`LoadOptions`]). Format-specific readers live in:
//!
//! - [`csv`]
//! - [`excel`] (feature `excel`)
//!
//! All readers share the same rules:
//!
//! - every header column is loaded, in file order, so outputs can reproduce the input sheet;
//! - the header row must contain every declared column (in any order);
//! - declared columns are parsed into their declared [`DataType`] and parse failures are reported
//!   with their row and column;
//! - undeclared columns are loaded as text (CSV) or with the type their cells have (workbooks);
//! - empty cells become [`Value::Null`].

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

pub use unified::{IngestionFormat, LoadOptions, load_dataset};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Field, Schema, Value};

/// Build the schema of an input file: every header column in file order, declared columns with
/// their declared type, the rest with `undeclared_type(column_index)`.
///
/// Blank header cells are named `column_<n>` (1-based).
fn resolve_columns<'h>(
    headers: impl IntoIterator<Item = &'h str>,
    declared: &Schema,
    undeclared_type: impl Fn(usize) -> DataType,
) -> IngestionResult<Schema> {
    let names: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| match h.trim() {
            "" => format!("column_{}", i + 1),
            h => h.to_string(),
        })
        .collect();

    if let Some(missing) = declared.fields.iter().find(|f| !names.contains(&f.name)) {
        return Err(IngestionError::SchemaMismatch {
            message: format!(
                "missing required column '{}'. headers={names:?}",
                missing.name
            ),
        });
    }

    let fields = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let data_type = declared
                .fields
                .iter()
                .find(|f| f.name == name)
                .map_or_else(|| undeclared_type(i), |f| f.data_type);
            Field::new(name, data_type)
        })
        .collect();
    Ok(Schema::new(fields))
}

/// Parse one textual cell. `row` is 1-based, as a spreadsheet user would count it.
fn parse_text(row: usize, column: &str, data_type: DataType, raw: &str) -> IngestionResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_err = |message: String| IngestionError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };
    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_err(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_err(e.to_string())),
        DataType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
            "false" | "f" | "0" | "no" | "n" => Ok(Value::Bool(false)),
            _ => Err(parse_err("expected bool (true/false/1/0/yes/no)".to_string())),
        },
    }
}

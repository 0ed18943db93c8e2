#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::{parse_text, resolve_columns};

/// Read one sheet of a workbook (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory `DataSet`.
///
/// Behavior:
/// - Reads `sheet` if provided; otherwise the first sheet in the workbook
/// - Uses the first non-empty row as the header row
/// - Requires every schema field among the headers and keeps every header column in sheet order
/// - Converts declared columns into their declared type (row numbers in errors are 1-based)
/// - Gives undeclared columns the type their cells share, falling back to text
pub fn read_excel_path(
    path: impl AsRef<Path>,
    sheet: Option<&str>,
    schema: &Schema,
) -> IngestionResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestionError::SchemaMismatch {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    read_range(&range, schema).map_err(|e| match e {
        IngestionError::SchemaMismatch { message } => IngestionError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    })
}

fn read_range(range: &Range<Data>, schema: &Schema) -> IngestionResult<DataSet> {
    let mut sheet_rows = range.rows().enumerate();

    let header_cells = sheet_rows
        .by_ref()
        .find(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(_, row)| row.iter().map(|c| c.to_string()).collect::<Vec<_>>())
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: "sheet has no non-empty rows (no header row found)".to_string(),
        })?;
    let body: Vec<(usize, &[Data])> = sheet_rows.collect();
    let schema = resolve_columns(header_cells.iter().map(String::as_str), schema, |i| {
        infer_column_type(body.iter().filter_map(|(_, row)| row.get(i)))
    })?;

    let mut rows = Vec::with_capacity(body.len());
    for (idx0, row) in body {
        // Range rows are relative to the first used cell, which is A1 for typical sheets.
        let user_row = idx0 + 1;
        let out = schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let cell = row.get(i).unwrap_or(&Data::Empty);
                convert_cell(user_row, &field.name, field.data_type, cell)
            })
            .collect::<IngestionResult<Vec<_>>>()?;
        rows.push(out);
    }

    DataSet::try_new(schema, rows)
}

/// The type shared by every non-empty cell of an undeclared column.
///
/// Whole-number floats count as integers; integers mixed with floats widen to `Float64`; any other
/// mix (or an all-empty column) is `Utf8`.
fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Data>) -> DataType {
    let mut inferred: Option<DataType> = None;
    for cell in cells {
        let cell_type = match cell {
            Data::Empty => continue,
            Data::Int(_) => DataType::Int64,
            Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => DataType::Int64,
            Data::Float(_) => DataType::Float64,
            Data::Bool(_) => DataType::Bool,
            _ => return DataType::Utf8,
        };
        inferred = Some(match (inferred, cell_type) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64 | DataType::Float64), DataType::Int64 | DataType::Float64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }
    inferred.unwrap_or(DataType::Utf8)
}

/// 2^53: past this, whole floats are no longer exact integers.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn convert_cell(row: usize, column: &str, data_type: DataType, cell: &Data) -> IngestionResult<Value> {
    let mismatch = |expected: &str| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: cell.to_string(),
        message: format!("expected {expected}"),
    };

    match (cell, data_type) {
        (Data::Empty, _) => Ok(Value::Null),
        (Data::String(s), _) => parse_text(row, column, data_type, s),
        (_, DataType::Utf8) => Ok(Value::Utf8(cell.to_string())),
        (Data::Int(i), DataType::Int64) => Ok(Value::Int64(*i)),
        (Data::Float(f), DataType::Int64) if f.fract() == 0.0 => Ok(Value::Int64(*f as i64)),
        (Data::Float(_), DataType::Int64) => Err(mismatch("integer (got non-integer float)")),
        (Data::Int(i), DataType::Float64) => Ok(Value::Float64(*i as f64)),
        (Data::Float(f), DataType::Float64) => Ok(Value::Float64(*f)),
        (Data::Bool(b), DataType::Bool) => Ok(Value::Bool(*b)),
        (Data::Int(i), DataType::Bool) => Ok(Value::Bool(*i != 0)),
        (Data::Float(f), DataType::Bool) => Ok(Value::Bool(*f != 0.0)),
        (_, DataType::Int64) => Err(mismatch("integer")),
        (_, DataType::Float64) => Err(mismatch("number")),
        (_, DataType::Bool) => Err(mismatch("bool")),
    }
}

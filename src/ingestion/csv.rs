//! CSV input.

use std::io::Read;
use std::path::Path;

use crate::error::IngestionResult;
use crate::types::{DataSet, DataType, Schema, Value};

use super::{parse_text, resolve_columns};

/// Read a CSV file with a header row into an in-memory [`DataSet`].
pub fn read_csv_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    read_csv(&mut rdr, schema)
}

/// Read CSV records from an existing reader (which must be configured with headers).
///
/// Every header column is kept in file order; columns missing from `schema` load as text.
pub fn read_csv<R: Read>(rdr: &mut csv::Reader<R>, schema: &Schema) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let schema = resolve_columns(headers.iter(), schema, |_| DataType::Utf8)?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is row 1.
        let user_row = idx0 + 2;
        let row = schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                parse_text(user_row, &field.name, field.data_type, record.get(i).unwrap_or(""))
            })
            .collect::<IngestionResult<Vec<_>>>()?;
        rows.push(row);
    }

    DataSet::try_new(schema, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("region", DataType::Utf8),
            Field::new("qty", DataType::Int64),
        ])
    }

    fn reader(input: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input.as_bytes())
    }

    #[test]
    fn read_csv_keeps_every_column_in_file_order() {
        let ds = read_csv(&mut reader("qty,note,region\n5,x,N\n,7,S\n"), &schema()).unwrap();
        assert_eq!(
            ds.schema.fields,
            vec![
                Field::new("qty", DataType::Int64),
                Field::new("note", DataType::Utf8),
                Field::new("region", DataType::Utf8),
            ]
        );
        assert_eq!(
            ds.rows,
            vec![
                vec![Value::Int64(5), Value::from("x"), Value::from("N")],
                vec![Value::Null, Value::from("7"), Value::from("S")],
            ]
        );
    }

    #[test]
    fn short_records_read_as_null() {
        let ds = read_csv(&mut reader("region,qty\nN\n"), &schema()).unwrap();
        assert_eq!(ds.rows, vec![vec![Value::from("N"), Value::Null]]);
    }

    #[test]
    fn parse_errors_use_spreadsheet_row_numbers() {
        let err = read_csv(&mut reader("region,qty\nN,1\nS,two\n"), &schema()).unwrap_err();
        assert!(err.to_string().contains("row 3 column 'qty'"));
    }
}

//! Core data model types.
//!
//! Input files are loaded into an in-memory [`DataSet`] using a user-declared [`Schema`] (a list
//! of typed [`Field`]s). Partitions and filter results are also plain [`DataSet`]s sharing the
//! schema of the dataset they were cut from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, IngestionError, IngestionResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Like [`Self::index_of`], but reports a missing column as a configuration error.
    pub fn require(&self, name: &str) -> ConfigResult<usize> {
        self.index_of(name).ok_or_else(|| ConfigError::ColumnNotFound {
            column: name.to_string(),
            available: self.field_names().map(str::to_string).collect(),
        })
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` if the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Text form used by substring operators and by text outputs. `Null` renders as an empty string;
/// whole floats keep their fraction (`1.0`, not `1`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Utf8(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    ///
    /// Row arity is not checked; use [`Self::try_new`] for untrusted rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create a dataset, rejecting rows whose length differs from the schema field count.
    pub fn try_new(schema: Schema, rows: Vec<Vec<Value>>) -> IngestionResult<Self> {
        let expected = schema.fields.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(IngestionError::SchemaMismatch {
                message: format!(
                    "row {idx} has {} values but the schema has {expected} columns",
                    row.len()
                ),
            });
        }
        Ok(Self { schema, rows })
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// `true` if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Create a new dataset containing the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Create a new dataset containing only rows whose `mask` entry is `true`.
    ///
    /// Rows past the end of `mask` are dropped.
    pub fn filter_by_mask(&self, mask: &[bool]) -> Self {
        let rows = self
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Int64(1), Value::from("a")],
                vec![Value::Int64(2), Value::from("b")],
                vec![Value::Int64(3), Value::Null],
            ],
        )
    }

    #[test]
    fn schema_index_of_and_require() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("name"), Some(1));
        assert_eq!(ds.schema.require("id").unwrap(), 0);

        let err = ds.schema.require("missing").unwrap_err();
        assert!(err.to_string().contains("column 'missing' not found"));
    }

    #[test]
    fn try_new_rejects_wrong_arity() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
        let err = DataSet::try_new(schema, vec![vec![Value::Int64(1), Value::Null]]).unwrap_err();
        assert!(err.to_string().contains("row 0 has 2 values"));
    }

    #[test]
    fn take_rows_keeps_requested_order() {
        let ds = sample_dataset();
        let out = ds.take_rows(&[2, 0]);
        assert_eq!(out.schema, ds.schema);
        assert_eq!(out.rows[0][0], Value::Int64(3));
        assert_eq!(out.rows[1][0], Value::Int64(1));
    }

    #[test]
    fn filter_by_mask_can_return_empty_dataset() {
        let ds = sample_dataset();
        let out = ds.filter_by_mask(&[false, false, false]);
        assert_eq!(out.schema, ds.schema);
        assert!(out.is_empty());
    }

    #[test]
    fn display_renders_text_forms() {
        assert_eq!(Value::Int64(-4).to_string(), "-4");
        assert_eq!(Value::Float64(2.5).to_string(), "2.5");
        assert_eq!(Value::Float64(1.0).to_string(), "1.0");
        assert_eq!(Value::Float64(-0.0).to_string(), "-0.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from("N").to_string(), "N");
        assert_eq!(Value::Null.to_string(), "");
    }
}

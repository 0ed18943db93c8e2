//! Partitioning a [`DataSet`] by the distinct values of one column.

use std::collections::HashMap;

use crate::error::ConfigResult;
use crate::types::{DataSet, Value};

/// Rows of a dataset that share one value of the split column.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The shared split-column value.
    pub key: Value,
    /// The rows, in dataset order, with the dataset's schema.
    pub rows: DataSet,
    /// `source_rows[i]` is the dataset index of `rows.rows[i]`.
    pub source_rows: Vec<usize>,
}

/// Partitions in first-occurrence order of their keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions {
    column: String,
    partitions: Vec<Partition>,
}

impl Partitions {
    /// Name of the split column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Number of partitions (distinct keys).
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// `true` when the source dataset had no rows.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Keys in first-occurrence order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.partitions.iter().map(|p| &p.key)
    }

    /// Look up a partition by key, using the same equality as [`split`].
    pub fn get(&self, key: &Value) -> Option<&Partition> {
        let wanted = KeyRepr::of(key);
        self.partitions.iter().find(|p| KeyRepr::of(&p.key) == wanted)
    }

    /// Iterate partitions in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, Partition> {
        self.partitions.iter()
    }
}

impl IntoIterator for Partitions {
    type Item = Partition;
    type IntoIter = std::vec::IntoIter<Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Partitions {
    type Item = &'a Partition;
    type IntoIter = std::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.iter()
    }
}

/// Hashable identity of a split key.
///
/// Different variants never compare equal (`Int64(1)` and `Float64(1.0)` are distinct keys).
/// Floats compare by bit pattern with `-0.0` folded into `0.0`, so every `NaN` payload is its own
/// key but a key always equals itself.
#[derive(Debug, PartialEq, Eq, Hash)]
enum KeyRepr<'a> {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(&'a str),
}

impl<'a> KeyRepr<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Int64(v) => Self::Int(*v),
            Value::Float64(v) if *v == 0.0 => Self::Float(0f64.to_bits()),
            Value::Float64(v) => Self::Float(v.to_bits()),
            Value::Bool(v) => Self::Bool(*v),
            Value::Utf8(s) => Self::Text(s),
        }
    }
}

/// Split `dataset` into one partition per distinct value of `column`.
///
/// Partitions are ordered by first occurrence; rows keep their dataset order inside a partition.
/// Null values form their own partition, so the partitions always cover every row.
///
/// Fails with [`crate::error::ConfigError::ColumnNotFound`] if `column` is not in the schema.
pub fn split(dataset: &DataSet, column: &str) -> ConfigResult<Partitions> {
    let idx = dataset.schema.require(column)?;

    let mut slots: HashMap<KeyRepr<'_>, usize> = HashMap::new();
    let mut groups: Vec<(&Value, Vec<usize>)> = Vec::new();
    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let key = row.get(idx).unwrap_or(&Value::Null);
        let slot = *slots.entry(KeyRepr::of(key)).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row_idx);
    }

    let partitions = groups
        .into_iter()
        .map(|(key, source_rows)| Partition {
            key: key.clone(),
            rows: dataset.take_rows(&source_rows),
            source_rows,
        })
        .collect();

    Ok(Partitions {
        column: column.to_string(),
        partitions,
    })
}

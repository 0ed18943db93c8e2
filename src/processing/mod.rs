//! Split-and-filter evaluation.
//!
//! The processing layer operates on in-memory [`crate::types::DataSet`] values:
//!
//! - [`split()`]: partition a dataset by the distinct values of one column
//! - [`evaluate()`]: build a per-row mask from one `(column, operator, operand)` condition
//! - [`combine()`]: fold a [`FilterGroup`]'s conditions left to right with AND/OR connectors
//!
//! ## Example: split → combine
//!
//! ```rust
//! use split_filter::processing::{combine, split, FilterCondition, FilterGroup, Operator};
//! use split_filter::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("region", DataType::Utf8),
//!     Field::new("qty", DataType::Int64),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::from("N"), Value::Int64(5)],
//!         vec![Value::from("N"), Value::Int64(15)],
//!         vec![Value::from("S"), Value::Int64(8)],
//!     ],
//! );
//!
//! let parts = split(&ds, "region").unwrap();
//! let north = parts.get(&Value::from("N")).unwrap();
//!
//! let group = FilterGroup::new(FilterCondition::new("qty", Operator::Gt, "3"))
//!     .and(FilterCondition::new("qty", Operator::Lt, "10"));
//! let out = combine(&north.rows, &group).unwrap().unwrap();
//! assert_eq!(out.rows, vec![vec![Value::from("N"), Value::Int64(5)]]);
//! ```

pub mod condition;
pub mod group;
pub mod split;

pub use condition::{FilterCondition, Operator, evaluate};
pub use group::{Connector, FilterGroup, FilterRule, combine, select};
pub use split::{Partition, Partitions, split};

//! Single-condition evaluation: `(column, operator, operand)` → per-row boolean mask.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult, EvaluationError, EvaluationResult};
use crate::types::{DataSet, DataType, Value};

/// Comparison operators supported in filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`: typed equality.
    Eq,
    /// `!=`: inverse of [`Operator::Eq`].
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// Case-sensitive substring match on the value's text form.
    Contains,
    /// Inverse of [`Operator::Contains`].
    NotContains,
    /// Value is present.
    IsNotEmpty,
    /// Value is missing.
    IsEmpty,
}

impl Operator {
    /// Every operator, in the order they are usually offered to users.
    pub const ALL: [Operator; 10] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Contains,
        Self::NotContains,
        Self::IsNotEmpty,
        Self::IsEmpty,
    ];

    /// Canonical spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
            Self::IsNotEmpty => "is not empty",
            Self::IsEmpty => "is empty",
        }
    }

    /// `false` for the emptiness checks, which ignore the operand.
    pub fn takes_operand(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Self::Gt => ord == Ordering::Greater,
            Self::Lt => ord == Ordering::Less,
            Self::Ge => ord != Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            _ => ord == Ordering::Equal,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parses the canonical spellings plus a few aliases (`==`, `<>`, and the labels used by the
/// Chinese-language workbook tool: `包含`, `不包含`, `非空`, `为空`).
///
/// Word forms are matched case-insensitively; surrounding whitespace is ignored.
impl FromStr for Operator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_lowercase().as_str() {
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "contains" | "包含" => Self::Contains,
            "not contains" | "不包含" => Self::NotContains,
            "is not empty" | "not empty" | "非空" => Self::IsNotEmpty,
            "is empty" | "empty" | "为空" => Self::IsEmpty,
            _ => {
                return Err(ConfigError::InvalidOperator {
                    operator: s.to_string(),
                });
            }
        };
        Ok(op)
    }
}

/// One `(column, operator, operand)` test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    /// Column the test reads.
    pub column: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Literal operand, always supplied as text.
    pub operand: String,
}

impl FilterCondition {
    /// Create a condition from an already-typed operator.
    pub fn new(column: impl Into<String>, operator: Operator, operand: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            operand: operand.into(),
        }
    }

    /// Create a condition from operator text, e.g. `">="` or `"not contains"`.
    pub fn parse(
        column: impl Into<String>,
        operator: &str,
        operand: impl Into<String>,
    ) -> ConfigResult<Self> {
        Ok(Self::new(column, operator.parse()?, operand))
    }

    fn type_error(&self, data_type: DataType, message: impl Into<String>) -> EvaluationError {
        EvaluationError::TypeError {
            column: self.column.clone(),
            operator: self.operator,
            operand: self.operand.clone(),
            data_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator.takes_operand() {
            write!(f, "{} {} '{}'", self.column, self.operator, self.operand)
        } else {
            write!(f, "{} {}", self.column, self.operator)
        }
    }
}

/// The operand after coercion to the column's type.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(&'a str),
}

fn coerce_operand(data_type: DataType, raw: &str) -> Option<Scalar<'_>> {
    match data_type {
        DataType::Int64 => {
            let t = raw.trim();
            t.parse::<i64>()
                .map(Scalar::Int)
                .or_else(|_| t.parse::<f64>().map(Scalar::Float))
                .ok()
        }
        DataType::Float64 => raw.trim().parse::<f64>().map(Scalar::Float).ok(),
        DataType::Bool => parse_bool(raw).map(Scalar::Bool),
        DataType::Utf8 => Some(Scalar::Text(raw)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// `None` when the value is null or not comparable with the operand.
fn compare(value: &Value, operand: Scalar<'_>) -> Option<Ordering> {
    match (value, operand) {
        (Value::Int64(a), Scalar::Int(b)) => Some(a.cmp(&b)),
        (Value::Int64(a), Scalar::Float(b)) => (*a as f64).partial_cmp(&b),
        (Value::Float64(a), Scalar::Int(b)) => a.partial_cmp(&(b as f64)),
        (Value::Float64(a), Scalar::Float(b)) => a.partial_cmp(&b),
        (Value::Bool(a), Scalar::Bool(b)) => Some(a.cmp(&b)),
        (Value::Utf8(a), Scalar::Text(b)) => Some(a.as_str().cmp(b)),
        _ => None,
    }
}

fn contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Null => false,
        Value::Utf8(s) => s.contains(needle),
        other => other.to_string().contains(needle),
    }
}

/// Evaluate `condition` against every row of `partition`.
///
/// The returned mask has one entry per partition row.
///
/// - `=` on a numeric or bool column compares against the operand parsed into that type; an
///   operand that does not parse equals no row. Text columns use exact string equality.
/// - `>`, `<`, `>=`, `<=` fail with [`EvaluationError::TypeError`] when the operand cannot be
///   coerced to the column type, or when the column is bool.
/// - Null values never satisfy `=`, ordered comparisons or `contains`, so they always satisfy the
///   inverted operators.
pub fn evaluate(partition: &DataSet, condition: &FilterCondition) -> EvaluationResult<Vec<bool>> {
    let idx = partition
        .schema
        .index_of(&condition.column)
        .ok_or_else(|| EvaluationError::ColumnNotFound {
            column: condition.column.clone(),
        })?;
    let data_type = partition.schema.fields[idx].data_type;
    let values = partition
        .rows
        .iter()
        .map(|row| row.get(idx).unwrap_or(&Value::Null));

    let op = condition.operator;
    let mask = match op {
        Operator::Eq | Operator::Ne => {
            let operand = coerce_operand(data_type, &condition.operand);
            let want = op == Operator::Eq;
            values
                .map(|v| {
                    let eq = operand
                        .and_then(|o| compare(v, o))
                        .is_some_and(|ord| ord == Ordering::Equal);
                    eq == want
                })
                .collect()
        }
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => {
            if data_type == DataType::Bool {
                return Err(condition.type_error(data_type, "bool columns are not ordered"));
            }
            let operand = coerce_operand(data_type, &condition.operand).ok_or_else(|| {
                condition.type_error(data_type, "operand is not a number")
            })?;
            values
                .map(|v| compare(v, operand).is_some_and(|ord| op.accepts(ord)))
                .collect()
        }
        Operator::Contains => values.map(|v| contains(v, &condition.operand)).collect(),
        Operator::NotContains => values.map(|v| !contains(v, &condition.operand)).collect(),
        Operator::IsNotEmpty => values.map(|v| !v.is_null()).collect(),
        Operator::IsEmpty => values.map(Value::is_null).collect(),
    };
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Schema};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("region", DataType::Utf8),
            Field::new("qty", DataType::Int64),
            Field::new("price", DataType::Float64),
            Field::new("active", DataType::Bool),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::from("North"), Value::Int64(5), Value::Float64(1.5), Value::Bool(true)],
                vec![Value::from("north"), Value::Int64(15), Value::Null, Value::Bool(false)],
                vec![Value::Null, Value::Int64(8), Value::Float64(10.0), Value::Null],
            ],
        )
    }

    fn eval(column: &str, op: &str, operand: &str) -> EvaluationResult<Vec<bool>> {
        let cond = FilterCondition::parse(column, op, operand).unwrap();
        evaluate(&sample_dataset(), &cond)
    }

    #[test]
    fn operator_parses_symbols_and_aliases() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!(" >= ".parse::<Operator>().unwrap(), Operator::Ge);
        assert_eq!("Not  Contains".parse::<Operator>().unwrap(), Operator::NotContains);
        assert_eq!("包含".parse::<Operator>().unwrap(), Operator::Contains);
        assert_eq!("为空".parse::<Operator>().unwrap(), Operator::IsEmpty);
        for op in Operator::ALL {
            assert_eq!(op.symbol().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_operator_is_a_config_error() {
        let err = "~=".parse::<Operator>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOperator { ref operator } if operator == "~="));
    }

    #[test]
    fn eq_on_int_column_is_numeric() {
        assert_eq!(eval("qty", "=", "15").unwrap(), vec![false, true, false]);
        assert_eq!(eval("qty", "=", " 15.0 ").unwrap(), vec![false, true, false]);
    }

    #[test]
    fn eq_with_uncoercible_operand_matches_nothing() {
        assert_eq!(eval("qty", "=", "lots").unwrap(), vec![false, false, false]);
        assert_eq!(eval("qty", "!=", "lots").unwrap(), vec![true, true, true]);
    }

    #[test]
    fn eq_on_text_is_exact() {
        assert_eq!(eval("region", "=", "North").unwrap(), vec![true, false, false]);
        assert_eq!(eval("region", "=", "North ").unwrap(), vec![false, false, false]);
    }

    #[test]
    fn ne_is_inverse_of_eq_including_nulls() {
        assert_eq!(eval("region", "!=", "North").unwrap(), vec![false, true, true]);
        assert_eq!(eval("active", "!=", "yes").unwrap(), vec![false, true, true]);
    }

    #[test]
    fn ordered_comparisons_on_numbers() {
        assert_eq!(eval("qty", ">", "10").unwrap(), vec![false, true, false]);
        assert_eq!(eval("qty", "<=", "8").unwrap(), vec![true, false, true]);
        assert_eq!(eval("qty", ">=", "7.5").unwrap(), vec![false, true, true]);
        // Nulls never satisfy an ordered comparison.
        assert_eq!(eval("price", "<", "100").unwrap(), vec![true, false, true]);
    }

    #[test]
    fn ordered_comparison_on_text_is_lexicographic() {
        assert_eq!(eval("region", "<", "a").unwrap(), vec![true, false, false]);
    }

    #[test]
    fn ordered_comparison_with_non_numeric_operand_fails_with_context() {
        let err = eval("qty", ">", "ten").unwrap_err();
        match &err {
            EvaluationError::TypeError {
                column,
                operator,
                operand,
                data_type,
                ..
            } => {
                assert_eq!(column, "qty");
                assert_eq!(*operator, Operator::Gt);
                assert_eq!(operand, "ten");
                assert_eq!(*data_type, DataType::Int64);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("operand is not a number"));
    }

    #[test]
    fn ordered_comparison_on_bool_fails() {
        let err = eval("active", ">", "true").unwrap_err();
        assert!(err.to_string().contains("bool columns are not ordered"));
    }

    #[test]
    fn contains_is_case_sensitive_and_works_on_numbers() {
        assert_eq!(eval("region", "contains", "orth").unwrap(), vec![true, true, false]);
        assert_eq!(eval("region", "contains", "Nor").unwrap(), vec![true, false, false]);
        assert_eq!(eval("qty", "contains", "5").unwrap(), vec![true, true, false]);
        assert_eq!(eval("region", "not contains", "Nor").unwrap(), vec![false, true, true]);
    }

    #[test]
    fn contains_sees_whole_floats_with_their_fraction() {
        assert_eq!(eval("price", "contains", "10.0").unwrap(), vec![false, false, true]);
        assert_eq!(eval("price", "contains", ".0").unwrap(), vec![false, false, true]);
        assert_eq!(eval("price", "not contains", ".0").unwrap(), vec![true, true, false]);
    }

    #[test]
    fn emptiness_checks_ignore_operand() {
        assert_eq!(eval("price", "is empty", "whatever").unwrap(), vec![false, true, false]);
        assert_eq!(eval("price", "is not empty", "").unwrap(), vec![true, false, true]);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = eval("nope", "=", "1").unwrap_err();
        assert_eq!(
            err,
            EvaluationError::ColumnNotFound {
                column: "nope".to_string()
            }
        );
    }

    #[test]
    fn condition_display() {
        let c = FilterCondition::parse("qty", ">", "10").unwrap();
        assert_eq!(c.to_string(), "qty > '10'");
        let c = FilterCondition::parse("qty", "is empty", "").unwrap();
        assert_eq!(c.to_string(), "qty is empty");
    }
}

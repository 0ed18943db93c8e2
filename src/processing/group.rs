//! Filter groups: AND/OR-connected conditions folded left to right over one partition.
//!
//! The fold is deliberately *not* conventional boolean algebra:
//!
//! - the first condition seeds the result with its matching rows;
//! - `AND` narrows the running result to rows that also match the next condition;
//! - `OR` appends every row of the whole partition that matches the next condition and is not
//!   already in the result (union by row identity, existing rows first).
//!
//! There is no operator precedence: `A OR B AND C` is `(A ∨ B) ∧ C`, and rows added by an `OR`
//! appear after the rows already selected, regardless of their partition order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, GroupError};
use crate::types::DataSet;

use super::condition::{FilterCondition, evaluate};

/// How a condition combines with the running result of its group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Connector {
    /// Narrow the running result.
    #[default]
    And,
    /// Widen the running result with matches from the whole partition.
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// Case-insensitive `AND` / `OR` (also `且` / `或`). Blank text means `AND`.
impl FromStr for Connector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "and" | "且" => Ok(Self::And),
            "or" | "或" => Ok(Self::Or),
            _ => Err(ConfigError::InvalidConnector {
                connector: s.to_string(),
            }),
        }
    }
}

/// One untyped filter row, exactly as captured from a user: connector, column, operator text,
/// operand text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// `AND` / `OR`; ignored on the first rule of a group, `AND` when absent elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
    /// Column name.
    pub column: String,
    /// Operator text, see [`super::Operator`].
    pub operator: String,
    /// Operand text.
    #[serde(default)]
    pub value: String,
}

impl FilterRule {
    /// Create a rule.
    pub fn new(
        connector: Option<&str>,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            connector: connector.map(str::to_string),
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Parse the connector text (absent → `AND`).
    pub fn parse_connector(&self) -> ConfigResult<Connector> {
        self.connector
            .as_deref()
            .map_or(Ok(Connector::And), str::parse::<Connector>)
    }

    /// Parse the operator and build the typed condition.
    pub fn parse_condition(&self) -> ConfigResult<FilterCondition> {
        FilterCondition::parse(self.column.as_str(), &self.operator, self.value.as_str())
    }
}

/// An ordered sequence of `(connector, condition)` pairs.
///
/// The connector of the first pair is never consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGroup {
    entries: Vec<(Connector, FilterCondition)>,
}

impl FilterGroup {
    /// A group seeded with `condition`.
    pub fn new(condition: FilterCondition) -> Self {
        Self {
            entries: vec![(Connector::And, condition)],
        }
    }

    /// Parse raw rules. Errors carry the 1-based condition position (group position `0`; plan
    /// construction re-tags them with the real group).
    pub fn from_rules(rules: &[FilterRule]) -> ConfigResult<Self> {
        let mut entries = Vec::with_capacity(rules.len());
        for (idx, rule) in rules.iter().enumerate() {
            let parsed = if idx == 0 {
                rule.parse_condition().map(|c| (Connector::And, c))
            } else {
                rule.parse_connector()
                    .and_then(|conn| rule.parse_condition().map(|c| (conn, c)))
            };
            entries.push(parsed.map_err(|e| e.at(0, idx + 1))?);
        }
        Ok(Self { entries })
    }

    /// Append a condition that narrows the running result.
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.entries.push((Connector::And, condition));
        self
    }

    /// Append a condition whose matches widen the running result.
    pub fn or(mut self, condition: FilterCondition) -> Self {
        self.entries.push((Connector::Or, condition));
        self
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the group has no conditions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(connector, condition)` pairs in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &(Connector, FilterCondition)> {
        self.entries.iter()
    }

    /// Iterate the conditions, ignoring connectors.
    pub fn conditions(&self) -> impl Iterator<Item = &FilterCondition> {
        self.entries.iter().map(|(_, c)| c)
    }
}

/// Select the partition row indices matched by `group`, in result order.
///
/// Returns `Ok(None)` for a group without conditions.
pub fn select(partition: &DataSet, group: &FilterGroup) -> Result<Option<Vec<usize>>, GroupError> {
    let mut result: Option<Vec<usize>> = None;

    for (pos, (connector, condition)) in group.iter().enumerate() {
        let mask = evaluate(partition, condition).map_err(|source| GroupError {
            condition: pos + 1,
            column: condition.column.clone(),
            operator: condition.operator,
            operand: condition.operand.clone(),
            source,
        })?;

        result = Some(match (result, connector) {
            (None, _) => matching_indices(&mask).collect(),
            (Some(mut current), Connector::And) => {
                current.retain(|&i| mask[i]);
                current
            }
            (Some(mut current), Connector::Or) => {
                let mut selected = vec![false; mask.len()];
                for &i in &current {
                    selected[i] = true;
                }
                current.extend(matching_indices(&mask).filter(|&i| !selected[i]));
                current
            }
        });
    }

    Ok(result)
}

/// Apply `group` to `partition` and materialize the matching rows.
///
/// Returns `Ok(None)` for a group without conditions; an empty [`DataSet`] when nothing matched.
pub fn combine(partition: &DataSet, group: &FilterGroup) -> Result<Option<DataSet>, GroupError> {
    Ok(select(partition, group)?.map(|indices| partition.take_rows(&indices)))
}

fn matching_indices(mask: &[bool]) -> impl Iterator<Item = usize> + '_ {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Operator;
    use crate::types::{DataType, Field, Schema, Value};

    fn qty_partition(values: &[i64]) -> DataSet {
        let schema = Schema::new(vec![
            Field::new("region", DataType::Utf8),
            Field::new("qty", DataType::Int64),
        ]);
        let rows = values
            .iter()
            .map(|&q| vec![Value::from("N"), Value::Int64(q)])
            .collect();
        DataSet::new(schema, rows)
    }

    fn qty(op: Operator, operand: &str) -> FilterCondition {
        FilterCondition::new("qty", op, operand)
    }

    fn qtys(ds: &DataSet) -> Vec<i64> {
        ds.rows
            .iter()
            .map(|r| match r[1] {
                Value::Int64(v) => v,
                _ => panic!("qty must be int"),
            })
            .collect()
    }

    #[test]
    fn single_condition_group_matches_the_condition() {
        let p = qty_partition(&[5, 15]);
        let out = combine(&p, &FilterGroup::new(qty(Operator::Gt, "10")))
            .unwrap()
            .unwrap();
        assert_eq!(qtys(&out), vec![15]);
    }

    #[test]
    fn and_narrows_the_running_result() {
        let p = qty_partition(&[5, 15]);
        let group = FilterGroup::new(qty(Operator::Gt, "3")).and(qty(Operator::Lt, "10"));
        let out = combine(&p, &group).unwrap().unwrap();
        assert_eq!(qtys(&out), vec![5]);
    }

    #[test]
    fn or_appends_new_matches_after_existing_rows() {
        let p = qty_partition(&[1, 2, 3, 4, 5, 6]);
        // A AND B OR C: A∧B = {3, 4}; C is evaluated against the whole partition and its rows
        // are appended after the running result, not merged in partition order.
        let group = FilterGroup::new(qty(Operator::Gt, "2"))
            .and(qty(Operator::Lt, "5"))
            .or(qty(Operator::Eq, "1"));
        assert_eq!(select(&p, &group).unwrap(), Some(vec![2, 3, 0]));
    }

    #[test]
    fn fold_has_no_operator_precedence() {
        let p = qty_partition(&[1, 2, 3, 4, 5, 6]);
        // A OR B AND C folds as (A ∨ B) ∧ C. Conventional precedence would give
        // A ∨ (B ∧ C) = {1, 6}.
        let group = FilterGroup::new(qty(Operator::Eq, "1"))
            .or(qty(Operator::Ge, "5"))
            .and(qty(Operator::Gt, "5"));
        let out = combine(&p, &group).unwrap().unwrap();
        assert_eq!(qtys(&out), vec![6]);
    }

    #[test]
    fn or_deduplicates_by_row_identity_not_value() {
        let p = qty_partition(&[7, 7, 8]);
        let group = FilterGroup::new(qty(Operator::Eq, "7")).or(qty(Operator::Ge, "7"));
        assert_eq!(select(&p, &group).unwrap(), Some(vec![0, 1, 2]));
    }

    #[test]
    fn empty_group_yields_no_output() {
        let p = qty_partition(&[1]);
        assert_eq!(combine(&p, &FilterGroup::default()).unwrap(), None);
    }

    #[test]
    fn no_match_yields_empty_dataset() {
        let p = qty_partition(&[1, 2]);
        let out = combine(&p, &FilterGroup::new(qty(Operator::Gt, "100")))
            .unwrap()
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.schema, p.schema);
    }

    #[test]
    fn evaluation_error_reports_condition_position() {
        let p = qty_partition(&[1, 2]);
        let group = FilterGroup::new(qty(Operator::Gt, "0")).and(qty(Operator::Lt, "many"));
        let err = select(&p, &group).unwrap_err();
        assert_eq!(err.condition, 2);
        assert_eq!(err.column, "qty");
        assert_eq!(err.operator, Operator::Lt);
        assert!(err.to_string().starts_with("condition 2 (qty < 'many')"));
    }

    #[test]
    fn from_rules_ignores_first_connector_and_defaults_to_and() {
        let rules = vec![
            FilterRule::new(Some("OR"), "qty", ">", "3"),
            FilterRule::new(None, "qty", "<", "10"),
            FilterRule::new(Some("or"), "qty", "=", "20"),
        ];
        let group = FilterGroup::from_rules(&rules).unwrap();
        let connectors: Vec<Connector> = group.iter().map(|(c, _)| *c).collect();
        assert_eq!(connectors, vec![Connector::And, Connector::And, Connector::Or]);

        let p = qty_partition(&[5, 15, 20]);
        let out = combine(&p, &group).unwrap().unwrap();
        assert_eq!(qtys(&out), vec![5, 20]);
    }

    #[test]
    fn from_rules_rejects_bad_connector_and_operator() {
        let rules = vec![
            FilterRule::new(None, "qty", ">", "3"),
            FilterRule::new(Some("XOR"), "qty", "<", "10"),
        ];
        let err = FilterGroup::from_rules(&rules).unwrap_err();
        assert!(err.to_string().contains("condition 2: unknown connector 'XOR'"));

        let rules = vec![FilterRule::new(None, "qty", "~=", "3")];
        let err = FilterGroup::from_rules(&rules).unwrap_err();
        assert!(err.to_string().contains("unknown operator '~='"));
    }
}

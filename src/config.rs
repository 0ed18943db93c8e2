//! Filter plans and the JSON plan file.
//!
//! A [`FilterPlan`] is the complete, immutable description of a run: which column to split on and
//! which filter groups to evaluate for every partition. It is built once, validated against the
//! dataset schema, and never modified while the run is in progress.
//!
//! Plans can be built in code or read from a [`PlanConfig`] JSON document:
//!
//! ```rust
//! use split_filter::config::PlanConfig;
//!
//! let cfg = PlanConfig::from_json_str(r#"{
//!     "columns": [
//!         { "name": "region", "type": "utf8" },
//!         { "name": "qty", "type": "int64" }
//!     ],
//!     "split_column": "region",
//!     "groups": [
//!         [ { "column": "qty", "operator": ">", "value": "10" } ],
//!         [
//!             { "column": "qty", "operator": ">", "value": "3" },
//!             { "connector": "AND", "column": "qty", "operator": "<", "value": "10" }
//!         ]
//!     ]
//! }"#).unwrap();
//!
//! let plan = cfg.to_plan().unwrap();
//! assert_eq!(plan.split_column(), "region");
//! assert_eq!(plan.groups().len(), 2);
//! plan.validate(&cfg.schema()).unwrap();
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::processing::{FilterGroup, FilterRule};
use crate::types::{Field, Schema};

/// Split column plus the ordered filter groups of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPlan {
    split_column: String,
    groups: Vec<FilterGroup>,
}

impl FilterPlan {
    /// Create a plan from typed groups.
    pub fn new(split_column: impl Into<String>, groups: Vec<FilterGroup>) -> Self {
        Self {
            split_column: split_column.into(),
            groups,
        }
    }

    /// Create a plan from raw rules, one `Vec` per group.
    ///
    /// Fails on the first unknown operator or connector, tagged with its 1-based group and
    /// condition position.
    pub fn from_rules(split_column: impl Into<String>, groups: &[Vec<FilterRule>]) -> ConfigResult<Self> {
        let groups = groups
            .iter()
            .enumerate()
            .map(|(g, rules)| FilterGroup::from_rules(rules).map_err(|e| retag_group(e, g + 1)))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self::new(split_column, groups))
    }

    /// Column whose distinct values define the partitions.
    pub fn split_column(&self) -> &str {
        &self.split_column
    }

    /// Groups in evaluation order (group `i` is reported as `group i + 1`).
    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    /// Check the plan against a dataset schema.
    ///
    /// - the split column must exist
    /// - every group must have at least one condition
    /// - every condition column must exist
    pub fn validate(&self, schema: &Schema) -> ConfigResult<()> {
        schema.require(&self.split_column)?;
        for (g, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                return Err(ConfigError::EmptyGroup { group: g + 1 });
            }
            for (c, condition) in group.conditions().enumerate() {
                schema
                    .require(&condition.column)
                    .map_err(|e| e.at(g + 1, c + 1))?;
            }
        }
        Ok(())
    }
}

fn retag_group(err: ConfigError, group: usize) -> ConfigError {
    match err {
        ConfigError::Condition {
            condition, source, ..
        } => ConfigError::Condition {
            group,
            condition,
            source,
        },
        other => other,
    }
}

/// On-disk form of a run: declared input columns, split column, raw filter rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Input schema used when loading the dataset.
    #[serde(default)]
    pub columns: Vec<Field>,
    /// Column to split on.
    pub split_column: String,
    /// One entry per filter group.
    #[serde(default)]
    pub groups: Vec<Vec<FilterRule>>,
}

impl PlanConfig {
    /// Read a plan file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a plan document.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The declared input schema.
    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.clone())
    }

    /// Parse the rules into a [`FilterPlan`].
    pub fn to_plan(&self) -> ConfigResult<FilterPlan> {
        FilterPlan::from_rules(self.split_column.as_str(), &self.groups)
    }
}

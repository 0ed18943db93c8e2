use std::path::PathBuf;

use split_filter::config::{FilterPlan, PlanConfig};
use split_filter::error::{OutputError, OutputResult};
use split_filter::execution::{ExecutionEngine, ExecutionOptions};
use split_filter::output::{Artifact, ArtifactSink, MemorySink};
use split_filter::processing::{FilterCondition, FilterGroup, FilterRule};
use split_filter::types::{DataSet, DataType, Field, Schema, Value};
use split_filter::ConfigError;

fn orders() -> DataSet {
    let schema = Schema::new(vec![
        Field::new("region", DataType::Utf8),
        Field::new("qty", DataType::Int64),
    ]);
    DataSet::new(
        schema,
        vec![
            vec![Value::from("N"), Value::Int64(5)],
            vec![Value::from("N"), Value::Int64(15)],
            vec![Value::from("S"), Value::Int64(8)],
        ],
    )
}

fn cond(column: &str, op: &str, operand: &str) -> FilterCondition {
    FilterCondition::parse(column, op, operand).unwrap()
}

fn qty_of(artifact: &Artifact, section: &str) -> Vec<Value> {
    artifact
        .section(section)
        .unwrap()
        .data
        .rows
        .iter()
        .map(|r| r[1].clone())
        .collect()
}

/// Fails every write for one partition key.
struct FailingFor {
    key: Value,
    inner: MemorySink,
}

impl ArtifactSink for FailingFor {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        if artifact.key == self.key {
            return Err(OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )));
        }
        self.inner.write_artifact(artifact)
    }
}

#[test]
fn run_writes_raw_and_group_sections_per_partition() {
    let plan = FilterPlan::new(
        "region",
        vec![
            FilterGroup::new(cond("qty", ">", "10")),
            FilterGroup::new(cond("qty", ">", "3")).and(cond("qty", "<", "10")),
        ],
    );

    let mut sink = MemorySink::new();
    let report = ExecutionEngine::default().run(&orders(), &plan, &mut sink).unwrap();
    assert!(report.is_success());

    let keys: Vec<_> = sink.artifacts.iter().map(|a| a.key.clone()).collect();
    assert_eq!(keys, vec![Value::from("N"), Value::from("S")]);

    let north = sink.get(&Value::from("N")).unwrap();
    assert_eq!(
        north.section_names().collect::<Vec<_>>(),
        vec!["raw", "group 1", "group 2"]
    );
    assert_eq!(qty_of(north, "raw"), vec![Value::Int64(5), Value::Int64(15)]);
    assert_eq!(qty_of(north, "group 1"), vec![Value::Int64(15)]);
    assert_eq!(qty_of(north, "group 2"), vec![Value::Int64(5)]);

    // Empty results still get a section.
    let south = sink.get(&Value::from("S")).unwrap();
    assert_eq!(qty_of(south, "group 1"), Vec::<Value>::new());
    assert_eq!(qty_of(south, "group 2"), vec![Value::Int64(8)]);

    let summary = &report.partitions[1];
    assert_eq!(summary.key, Value::from("S"));
    assert_eq!(
        summary
            .sections
            .iter()
            .map(|s| (s.name.as_str(), s.rows))
            .collect::<Vec<_>>(),
        vec![("raw", 1), ("group 1", 0), ("group 2", 1)]
    );
}

#[test]
fn unknown_operator_fails_before_anything_is_written() {
    let rules = vec![vec![FilterRule::new(None, "qty", "~=", "3")]];
    let err = FilterPlan::from_rules("region", &rules).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Condition {
            group: 1,
            condition: 1,
            ..
        }
    ));
    assert!(err.to_string().contains("unknown operator '~='"));
}

#[test]
fn missing_condition_column_aborts_the_run() {
    let plan = FilterPlan::new("region", vec![FilterGroup::new(cond("price", ">", "1"))]);
    let mut sink = MemorySink::new();

    let err = ExecutionEngine::default()
        .run(&orders(), &plan, &mut sink)
        .unwrap_err();
    assert!(err.to_string().contains("column 'price' not found"));
    assert!(sink.artifacts.is_empty());
}

#[test]
fn failing_group_only_loses_its_own_section() {
    let plan = FilterPlan::new(
        "region",
        vec![
            FilterGroup::new(cond("qty", ">", "ten")),
            FilterGroup::new(cond("qty", "<", "10")),
        ],
    );
    let mut sink = MemorySink::new();
    let report = ExecutionEngine::default().run(&orders(), &plan, &mut sink).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.group_failures.len(), 2);
    assert!(report.group_failures.iter().all(|f| f.group == 1));
    assert!(report.write_failures.is_empty());

    for artifact in &sink.artifacts {
        assert_eq!(
            artifact.section_names().collect::<Vec<_>>(),
            vec!["raw", "group 2"]
        );
    }
    let msg = report.group_failures[0].to_string();
    assert!(msg.contains("partition 'N' group 1 condition 1"), "{msg}");
}

#[test]
fn failing_write_is_isolated_to_its_partition() {
    let plan = FilterPlan::new("region", vec![FilterGroup::new(cond("qty", ">", "0"))]);
    let mut sink = FailingFor {
        key: Value::from("N"),
        inner: MemorySink::new(),
    };
    let report = ExecutionEngine::default().run(&orders(), &plan, &mut sink).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.write_failures.len(), 1);
    let failure = &report.write_failures[0];
    assert_eq!(failure.partition, Value::from("N"));
    assert_eq!(failure.artifact.sections.len(), 2);
    assert!(failure.to_string().contains("read-only volume"));

    assert_eq!(sink.inner.artifacts.len(), 1);
    assert_eq!(sink.inner.artifacts[0].key, Value::from("S"));
    assert_eq!(report.partitions[0].location, None);
    assert_eq!(report.written().count(), 1);
    assert_eq!(report.metrics.artifacts_failed, 1);
}

#[test]
fn or_adds_back_rows_an_earlier_and_removed() {
    let schema = Schema::new(vec![
        Field::new("k", DataType::Utf8),
        Field::new("qty", DataType::Int64),
    ]);
    let rows = (1..=6).map(|q| vec![Value::from("x"), Value::Int64(q)]).collect();
    let ds = DataSet::new(schema, rows);

    let plan = FilterPlan::new(
        "k",
        vec![FilterGroup::new(cond("qty", ">", "2"))
            .and(cond("qty", "<", "5"))
            .or(cond("qty", "=", "1"))],
    );
    let mut sink = MemorySink::new();
    ExecutionEngine::default().run(&ds, &plan, &mut sink).unwrap();

    let artifact = sink.get(&Value::from("x")).unwrap();
    assert_eq!(
        qty_of(artifact, "group 1"),
        vec![Value::Int64(3), Value::Int64(4), Value::Int64(1)]
    );
}

#[test]
fn thread_count_does_not_change_the_output() {
    let schema = Schema::new(vec![
        Field::new("k", DataType::Int64),
        Field::new("qty", DataType::Int64),
    ]);
    let rows = (0..500)
        .map(|i| vec![Value::Int64(i % 37), Value::Int64(i)])
        .collect();
    let ds = DataSet::new(schema, rows);
    let plan = FilterPlan::new(
        "k",
        vec![
            FilterGroup::new(cond("qty", ">", "100")).and(cond("qty", "<=", "400")),
            FilterGroup::new(cond("qty", "<", "50")).or(cond("qty", ">=", "480")),
        ],
    );

    let mut sequential = MemorySink::new();
    ExecutionEngine::default()
        .run(&ds, &plan, &mut sequential)
        .unwrap();

    let mut parallel = MemorySink::new();
    ExecutionEngine::new(ExecutionOptions {
        num_threads: Some(4),
    })
    .unwrap()
    .run(&ds, &plan, &mut parallel)
    .unwrap();

    assert_eq!(sequential.artifacts, parallel.artifacts);
}

#[test]
fn plan_file_drives_a_full_run() {
    let cfg = PlanConfig::from_path("tests/fixtures/plan.json").unwrap();
    let ds = split_filter::ingestion::load_dataset(
        "tests/fixtures/orders.csv",
        &cfg.schema(),
        &Default::default(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let report = ExecutionEngine::default()
        .run(&ds, &cfg.to_plan().unwrap(), &mut sink)
        .unwrap();
    assert!(report.is_success(), "{:?}", report.group_failures);

    let customers = |key: &str, section: &str| -> Vec<Value> {
        sink.get(&Value::from(key))
            .unwrap()
            .section(section)
            .unwrap()
            .data
            .rows
            .iter()
            .map(|r| r[2].clone())
            .collect()
    };

    assert_eq!(customers("N", "group 1"), vec![Value::from("Grace")]);
    assert_eq!(customers("S", "group 2"), vec![Value::from("Linus")]);
    assert_eq!(customers("N", "group 3"), vec![Value::from("Grace")]);
    assert_eq!(customers("S", "group 3"), vec![Value::from("Ken")]);
    assert_eq!(customers("E", "group 3"), vec![Value::Null]);
}

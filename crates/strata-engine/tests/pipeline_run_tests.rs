//! End-to-end engine tests: pipeline runs against the store, atomic
//! failure, execution ledger transitions, and lineage recording.

use serde_json::json;
use std::sync::Arc;

use strata_core::errors::StrataErrorKind;
use strata_core::model::execution::ExecutionStatus;
use strata_core::model::pipeline::{
    ConflictResolution, FieldMapping, FilterConfig, JoinConfig, MapConfig, MergeType, Pipeline,
    Predicate, PredicateOp, SortConfig, SortDirection, TransformStep, ValueTransform,
};
use strata_core::model::value::{records_from_json, FieldValue, Record};
use strata_core::transform::sandbox::{RowTransform, ScriptRegistry};
use strata_core::transform::TransformError;
use strata_core_types::CancelToken;
use strata_engine::run_pipeline;
use strata_store::{NewSnapshot, SnapshotStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn records(value: serde_json::Value) -> Vec<Record> {
    records_from_json(value).unwrap()
}

fn store_with_input() -> SnapshotStore {
    let store = SnapshotStore::open_in_memory().unwrap();
    store
        .create_snapshot(NewSnapshot::new(
            "ds:people",
            records(json!([
                {"name": "Bob", "age": 15},
                {"name": "Al", "age": 20},
                {"name": "Cy", "age": 30}
            ])),
        ))
        .unwrap();
    store
}

fn adults_pipeline() -> Pipeline {
    Pipeline::new("adults", "ds:people", "ds:adults")
        .with_step(TransformStep::Filter(FilterConfig {
            predicates: vec![Predicate {
                field: "age".to_string(),
                op: PredicateOp::Gt,
                value: FieldValue::Number(18.0),
            }],
        }))
        .with_step(TransformStep::Sort(SortConfig {
            field: "name".to_string(),
            direction: SortDirection::Asc,
        }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_successful_run_persists_output_snapshot() {
    let store = store_with_input();
    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();

    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();

    assert_eq!(report.execution.status, ExecutionStatus::Success);
    assert_eq!(report.output_snapshot.version, 1);
    assert_eq!(report.output_snapshot.data_source_id, "ds:adults");

    let output = store
        .read_all_records(&report.output_snapshot.snapshot_id)
        .unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0]["name"], FieldValue::Text("Al".to_string()));
    assert_eq!(output[1]["name"], FieldValue::Text("Cy".to_string()));

    // Ledger row is terminal and matches the report
    let execution = store.get_execution(&report.execution.execution_id).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(
        execution.output_snapshot_id.as_deref(),
        Some(report.output_snapshot.snapshot_id.as_str())
    );
    assert!(execution.finished_at.is_some());
}

#[test]
fn test_failed_run_leaves_output_source_unchanged() {
    let store = store_with_input();
    let pipeline = Pipeline::new("broken", "ds:people", "ds:out").with_step(TransformStep::Join(
        JoinConfig {
            data_source_id: "ds:missing".to_string(),
            key: "id".to_string(),
            merge_type: MergeType::Inner,
            conflict_resolution: ConflictResolution::Left,
        },
    ));
    let registry = ScriptRegistry::new();

    let err = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::StepExecution);
    assert_eq!(err.step_index(), Some(0));
    assert_eq!(err.step_kind(), Some("join"));

    // No snapshot was persisted on the output source
    assert!(store.get_latest("ds:out").unwrap().is_none());

    // The ledger recorded the failure with the failing step
    let executions = store.list_executions(&pipeline.id).unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Error);
    assert_eq!(executions[0].failed_step, Some(0));
    assert_eq!(executions[0].failed_step_kind.as_deref(), Some("join"));
    assert!(executions[0].error_message.is_some());
}

#[test]
fn test_coercion_run_ends_in_warning() {
    let store = SnapshotStore::open_in_memory().unwrap();
    store
        .create_snapshot(NewSnapshot::new(
            "ds:raw",
            records(json!([{"amount": "12.5"}, {"amount": "n/a"}])),
        ))
        .unwrap();

    let pipeline = Pipeline::new("coerce", "ds:raw", "ds:clean").with_step(TransformStep::Map(
        MapConfig {
            mappings: vec![FieldMapping {
                source_field: "amount".to_string(),
                target_field: "amount".to_string(),
                transform: Some(ValueTransform::ToNumber),
            }],
            drop: vec![],
        },
    ));
    let registry = ScriptRegistry::new();

    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();
    assert_eq!(report.execution.status, ExecutionStatus::Warning);
    assert_eq!(report.warnings.len(), 1);
    // The snapshot is still persisted: warnings are non-fatal
    assert!(store.get_latest("ds:clean").unwrap().is_some());
}

#[test]
fn test_run_records_lineage_edges() {
    let store = store_with_input();
    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();

    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();

    let edges = store
        .list_lineage_edges(Some(&report.execution.execution_id))
        .unwrap();
    assert_eq!(edges.len(), 2);

    let input_snapshot = store.get_latest("ds:people").unwrap().unwrap();
    assert!(edges.iter().any(|e| {
        e.source_node_id == input_snapshot.snapshot_id
            && e.target_node_id == report.execution.execution_id
    }));
    assert!(edges.iter().any(|e| {
        e.source_node_id == report.execution.execution_id
            && e.target_node_id == report.output_snapshot.snapshot_id
    }));
}

#[test]
fn test_join_run_pulls_right_side_from_store() {
    let store = SnapshotStore::open_in_memory().unwrap();
    store
        .create_snapshot(NewSnapshot::new(
            "ds:orders",
            records(json!([{"id": 1, "item": "book"}, {"id": 2, "item": "pen"}])),
        ))
        .unwrap();
    store
        .create_snapshot(NewSnapshot::new(
            "ds:prices",
            records(json!([{"id": 1, "price": 10}, {"id": 2, "price": 2}])),
        ))
        .unwrap();

    let pipeline = Pipeline::new("price-orders", "ds:orders", "ds:priced").with_step(
        TransformStep::Join(JoinConfig {
            data_source_id: "ds:prices".to_string(),
            key: "id".to_string(),
            merge_type: MergeType::Inner,
            conflict_resolution: ConflictResolution::Left,
        }),
    );
    let registry = ScriptRegistry::new();

    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();
    let output = store
        .read_all_records(&report.output_snapshot.snapshot_id)
        .unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0]["price"], FieldValue::Number(10.0));

    // Join source contributes a lineage edge into the run
    let edges = store
        .list_lineage_edges(Some(&report.execution.execution_id))
        .unwrap();
    assert_eq!(edges.len(), 3);
    assert!(edges.iter().any(|e| e.transformation_type == "join"));
}

#[test]
fn test_custom_script_run() {
    let store = SnapshotStore::open_in_memory().unwrap();
    store
        .create_snapshot(NewSnapshot::new("ds:nums", records(json!([{"n": 3}]))))
        .unwrap();

    let mut registry = ScriptRegistry::new();
    let squarer: Arc<dyn RowTransform> = Arc::new(
        |record: &Record| -> Result<Vec<Record>, TransformError> {
            let mut out = record.clone();
            let n = out["n"].as_number().unwrap_or(0.0);
            out.insert("n_squared".to_string(), FieldValue::Number(n * n));
            Ok(vec![out])
        },
    );
    registry.register("square", squarer);

    let pipeline = Pipeline::new("square", "ds:nums", "ds:squared").with_step(
        TransformStep::CustomScript(strata_core::model::pipeline::ScriptConfig {
            script: "square".to_string(),
        }),
    );

    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();
    let output = store
        .read_all_records(&report.output_snapshot.snapshot_id)
        .unwrap();
    assert_eq!(output[0]["n_squared"], FieldValue::Number(9.0));
}

#[test]
fn test_cancelled_run_records_error_and_persists_nothing() {
    let store = store_with_input();
    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = run_pipeline(&store, &pipeline, &registry, cancel).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::Cancelled);
    assert!(store.get_latest("ds:adults").unwrap().is_none());

    let executions = store.list_executions(&pipeline.id).unwrap();
    assert_eq!(executions[0].status, ExecutionStatus::Error);
}

#[test]
fn test_run_filtering_everything_persists_empty_snapshot() {
    let store = SnapshotStore::open_in_memory().unwrap();
    store
        .create_snapshot(NewSnapshot::new(
            "ds:people",
            records(json!([{"name": "Kid", "age": 9}])),
        ))
        .unwrap();

    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();
    let report = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();

    assert_eq!(report.output_snapshot.record_count, 0);
    // The schema carried forward from the input survives into the
    // empty snapshot
    assert!(report.output_snapshot.schema.column("age").is_some());
    assert!(store
        .read_all_records(&report.output_snapshot.snapshot_id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_missing_input_source_is_not_found() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();
    let err = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::NotFound);
}

#[test]
fn test_rerun_produces_identical_records() {
    let store = store_with_input();
    let pipeline = adults_pipeline();
    let registry = ScriptRegistry::new();

    let first = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();
    let second = run_pipeline(&store, &pipeline, &registry, CancelToken::new()).unwrap();

    let first_records = store
        .read_all_records(&first.output_snapshot.snapshot_id)
        .unwrap();
    let second_records = store
        .read_all_records(&second.output_snapshot.snapshot_id)
        .unwrap();
    assert_eq!(
        serde_json::to_string(&first_records).unwrap(),
        serde_json::to_string(&second_records).unwrap()
    );
    // Each run is a new immutable version
    assert_eq!(second.output_snapshot.version, first.output_snapshot.version + 1);
}

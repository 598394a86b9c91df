//! Scan executor tests over in-memory catalogs.

use std::collections::HashMap;
use std::sync::Arc;

use ntest::timeout;
use serde_json::{json, Value as JsonValue};

use rowstore_core::context::ExecutorContext;
use rowstore_core::factory::TableFactory;
use rowstore_core::index::{IndexType, TableIndexScheme};
use rowstore_core::schema::TupleSchema;
use rowstore_core::table::{Table, TempTableLimits};
use rowstore_core::types::{Value, ValueType};
use rowstore_exec::executor::{AnyScanExecutor, ExecutorState};
use rowstore_exec::expression::BasicExpressionLoader;
use rowstore_exec::DbError;

const ROWS: i64 = 20;

/// `items(id INTEGER NOT NULL, c1 VARCHAR(16), c2 BIGINT, flag TINYINT)` with
/// `flag = id % 2` and a primary key on `id`.
fn items_table() -> Table {
    let schema = TupleSchema::build(
        &[ValueType::Integer, ValueType::Varchar, ValueType::BigInt, ValueType::TinyInt],
        &[4, 16, 8, 1],
        &[false, true, true, true],
    )
    .unwrap();
    let mut table = TableFactory::get_persistent_table(
        1,
        &ExecutorContext::default(),
        "items",
        schema,
        vec!["id".into(), "c1".into(), "c2".into(), "flag".into()],
        Some(TableIndexScheme::new("pk_items", IndexType::BalancedTree, vec![0], true)),
        vec![TableIndexScheme::new("by_c2", IndexType::BalancedTree, vec![2], false)],
        None,
        false,
        false,
    );
    for id in 1..=ROWS {
        table
            .insert_values(&[
                Value::Integer(id as i32),
                Value::varchar(&format!("name-{}", id)),
                Value::BigInt(id * 10),
                Value::TinyInt((id % 2) as i8),
            ])
            .unwrap();
    }
    table
}

fn catalog() -> HashMap<String, Table> {
    let mut tables = HashMap::new();
    tables.insert("items".to_string(), items_table());
    tables
}

fn column(idx: usize) -> JsonValue {
    json!({"TYPE": "VALUE_TUPLE", "COLUMN_IDX": idx})
}

fn flag_is_set() -> JsonValue {
    json!({
        "TYPE": "COMPARE_EQUAL",
        "LEFT": column(3),
        "RIGHT": {"TYPE": "VALUE_CONSTANT", "VALUE_TYPE": "TINYINT", "VALUE": 1}
    })
}

fn project_c1_c2() -> JsonValue {
    json!({"PLAN_NODE_TYPE": "PROJECTION", "OUTPUT_SCHEMA": [
        {"COLUMN_NAME": "c1", "EXPRESSION": column(1)},
        {"COLUMN_NAME": "c2", "EXPRESSION": column(2)},
    ]})
}

fn ids(rows: &[Vec<Value>]) -> Vec<i64> {
    rows.iter().map(|r| r[0].as_i64().unwrap()).collect()
}

#[timeout(1000)]
#[test]
fn test_predicate_offset_limit_then_projection() {
    let tables = catalog();
    let plan = json!({
        "PLAN_NODE_TYPE": "SEQSCAN",
        "ID": 1,
        "TARGET_TABLE_NAME": "items",
        "PREDICATE": flag_is_set(),
        "INLINE_NODES": [
            project_c1_c2(),
            {"PLAN_NODE_TYPE": "LIMIT", "LIMIT": 3, "OFFSET": 2}
        ]
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, None).unwrap();
    assert_eq!(executor.output_column_names(), &["c1".to_string(), "c2".to_string()]);

    // Qualifying ids are 1, 3, 5, ...; the 3rd to 5th of them are 5, 7, 9.
    let rows = executor.collect_rows(&tables, &[]).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::varchar("name-5"), Value::BigInt(50)],
            vec![Value::varchar("name-7"), Value::BigInt(70)],
            vec![Value::varchar("name-9"), Value::BigInt(90)],
        ]
    );
    assert_eq!(executor.state(), ExecutorState::Exhausted);
    assert_eq!(tables["items"].active_tuple_count(), ROWS as usize);
}

#[timeout(1000)]
#[test]
fn test_full_rows_without_projection() {
    let tables = catalog();
    let plan = json!({"PLAN_NODE_TYPE": "SEQSCAN", "TARGET_TABLE_NAME": "items"});
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, None).unwrap();

    let rows = executor.collect_rows(&tables, &[]).unwrap();
    assert_eq!(rows.len(), ROWS as usize);
    assert_eq!(rows[0].len(), 4);
    assert_eq!(ids(&rows), (1..=ROWS).collect::<Vec<_>>());
}

#[timeout(1000)]
#[test]
fn test_limit_zero_and_offset_past_end() {
    let tables = catalog();
    for (limit, offset) in [(0, 0), (5, 100)] {
        let plan = json!({
            "PLAN_NODE_TYPE": "SEQSCAN",
            "TARGET_TABLE_NAME": "items",
            "INLINE_NODES": [{"PLAN_NODE_TYPE": "LIMIT", "LIMIT": limit, "OFFSET": offset}]
        });
        let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
        executor.init(&tables, None).unwrap();
        assert!(executor.collect_rows(&tables, &[]).unwrap().is_empty());
    }
}

#[timeout(1000)]
#[test]
fn test_reexecution_with_new_parameters() {
    let tables = catalog();
    let plan = json!({
        "PLAN_NODE_TYPE": "SEQSCAN",
        "TARGET_TABLE_NAME": "items",
        "PREDICATE": {
            "TYPE": "COMPARE_GREATERTHAN",
            "LEFT": column(2),
            "RIGHT": {"TYPE": "VALUE_PARAMETER", "PARAM_IDX": 0, "VALUE_TYPE": "BIGINT"}
        },
        "INLINE_NODES": [{"PLAN_NODE_TYPE": "LIMIT", "LIMIT_PARAM_IDX": 1}]
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, None).unwrap();

    let rows = executor
        .collect_rows(&tables, &[Value::BigInt(150), Value::Integer(10)])
        .unwrap();
    assert_eq!(ids(&rows), vec![16, 17, 18, 19, 20]);

    let rows = executor
        .collect_rows(&tables, &[Value::BigInt(0), Value::Integer(2)])
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 2]);

    let err = executor.collect_rows(&tables, &[Value::BigInt(0)]).unwrap_err();
    assert!(matches!(err, DbError::Expression(_)));
}

#[timeout(1000)]
#[test]
fn test_index_scan_in_both_directions() {
    let tables = catalog();
    let plan = |direction: &str| {
        json!({
            "PLAN_NODE_TYPE": "INDEXSCAN",
            "TARGET_TABLE_NAME": "items",
            "TARGET_INDEX_NAME": "pk_items",
            "LOOKUP_TYPE": "GTE",
            "SORT_DIRECTION": direction,
            "SEARCHKEY_EXPRESSIONS": [{"TYPE": "VALUE_PARAMETER", "PARAM_IDX": 0}]
        })
    };

    let mut ascending = AnyScanExecutor::load(&plan("ASC"), &BasicExpressionLoader).unwrap();
    ascending.init(&tables, None).unwrap();
    let rows = ascending.collect_rows(&tables, &[Value::BigInt(16)]).unwrap();
    assert_eq!(ids(&rows), vec![16, 17, 18, 19, 20]);

    let mut descending = AnyScanExecutor::load(&plan("DESC"), &BasicExpressionLoader).unwrap();
    descending.init(&tables, None).unwrap();
    let rows = descending.collect_rows(&tables, &[Value::BigInt(16)]).unwrap();
    assert_eq!(ids(&rows), vec![20, 19, 18, 17, 16]);
}

#[timeout(1000)]
#[test]
fn test_index_scan_applies_predicate_and_limit() {
    let tables = catalog();
    let plan = json!({
        "PLAN_NODE_TYPE": "INDEXSCAN",
        "TARGET_TABLE_NAME": "items",
        "TARGET_INDEX_NAME": "by_c2",
        "LOOKUP_TYPE": "LT",
        "SORT_DIRECTION": "DESC",
        "SEARCHKEY_EXPRESSIONS": [{"TYPE": "VALUE_CONSTANT", "VALUE_TYPE": "BIGINT", "VALUE": 120}],
        "PREDICATE": flag_is_set(),
        "INLINE_NODES": [{"PLAN_NODE_TYPE": "LIMIT", "LIMIT": 2}]
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, None).unwrap();
    let rows = executor.collect_rows(&tables, &[]).unwrap();
    assert_eq!(ids(&rows), vec![11, 9]);
}

/// `readings(id INTEGER NOT NULL, v INTEGER)` holding (1, NULL), (2, 1), (3, 7)
/// with a tree index on `v`.
fn readings_catalog() -> HashMap<String, Table> {
    let schema = TupleSchema::build(&[ValueType::Integer, ValueType::Integer], &[4, 4], &[false, true])
        .unwrap();
    let mut table = TableFactory::get_persistent_table(
        1,
        &ExecutorContext::default(),
        "readings",
        schema,
        vec!["id".into(), "v".into()],
        None,
        vec![TableIndexScheme::new("by_v", IndexType::BalancedTree, vec![1], false)],
        None,
        false,
        false,
    );
    for (id, v) in [(1, None), (2, Some(1)), (3, Some(7))] {
        let v = v.map_or(Value::Null(ValueType::Integer), Value::Integer);
        table.insert_values(&[Value::Integer(id), v]).unwrap();
    }
    let mut tables = HashMap::new();
    tables.insert("readings".to_string(), table);
    tables
}

fn scan_readings(tables: &HashMap<String, Table>, lookup: &str, key: JsonValue) -> Vec<i64> {
    let plan = json!({
        "PLAN_NODE_TYPE": "INDEXSCAN",
        "TARGET_TABLE_NAME": "readings",
        "TARGET_INDEX_NAME": "by_v",
        "LOOKUP_TYPE": lookup,
        "SEARCHKEY_EXPRESSIONS": [key]
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(tables, None).unwrap();
    ids(&executor.collect_rows(tables, &[]).unwrap())
}

#[timeout(1000)]
#[test]
fn test_index_scan_never_matches_null_keys() {
    let tables = readings_catalog();
    let int = |n: i64| json!({"TYPE": "VALUE_CONSTANT", "VALUE_TYPE": "INTEGER", "VALUE": n});
    let null = json!({"TYPE": "VALUE_CONSTANT", "VALUE_TYPE": "INTEGER", "ISNULL": true});

    assert_eq!(scan_readings(&tables, "LT", int(5)), vec![2]);
    assert_eq!(scan_readings(&tables, "LTE", int(7)), vec![2, 3]);
    assert_eq!(scan_readings(&tables, "GTE", int(0)), vec![2, 3]);
    assert!(scan_readings(&tables, "EQ", null.clone()).is_empty());
    assert!(scan_readings(&tables, "LT", null).is_empty());

    // Same answer as the predicate path.
    let plan = json!({
        "PLAN_NODE_TYPE": "SEQSCAN",
        "TARGET_TABLE_NAME": "readings",
        "PREDICATE": {"TYPE": "COMPARE_LESSTHAN", "LEFT": column(1), "RIGHT": int(5)}
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, None).unwrap();
    assert_eq!(ids(&executor.collect_rows(&tables, &[]).unwrap()), vec![2]);
}

#[timeout(1000)]
#[test]
fn test_init_failures() {
    let tables = catalog();
    let plan = json!({"PLAN_NODE_TYPE": "SEQSCAN", "TARGET_TABLE_NAME": "missing"});
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    assert_eq!(executor.state(), ExecutorState::Uninitialized);
    assert!(matches!(executor.execute(&tables, &[]), Err(DbError::Initialization(_))));
    assert!(matches!(executor.init(&tables, None), Err(DbError::Initialization(_))));
    assert_eq!(executor.state(), ExecutorState::Uninitialized);

    let plan = json!({
        "PLAN_NODE_TYPE": "INDEXSCAN",
        "TARGET_TABLE_NAME": "items",
        "TARGET_INDEX_NAME": "no_such_index"
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    let err = executor.init(&tables, None).unwrap_err();
    assert!(matches!(err, DbError::Initialization(ref msg) if msg.contains("no_such_index")));
}

#[timeout(1000)]
#[test]
fn test_missing_plan_keys_are_named() {
    let plan = json!({
        "PLAN_NODE_TYPE": "SEQSCAN",
        "TARGET_TABLE_NAME": "items",
        "PREDICATE": {"TYPE": "COMPARE_EQUAL", "LEFT": column(0)}
    });
    let err = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap_err();
    assert_eq!(err.to_string(), "Expression: can't find RIGHT value");

    let plan = json!({"PLAN_NODE_TYPE": "SEQSCAN"});
    let err = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingPlanField { ref key, .. } if key == "TARGET_TABLE_NAME"
    ));
}

#[timeout(1000)]
#[test]
fn test_execute_to_temp_table() {
    let tables = catalog();
    let limits = Arc::new(TempTableLimits::new(64 * 1024 * 1024, 32 * 1024 * 1024));
    let plan = json!({
        "PLAN_NODE_TYPE": "SEQSCAN",
        "ID": 4,
        "TARGET_TABLE_NAME": "items",
        "PREDICATE": flag_is_set(),
        "INLINE_NODES": [project_c1_c2()]
    });
    let mut executor = AnyScanExecutor::load(&plan, &BasicExpressionLoader).unwrap();
    executor.init(&tables, Some(Arc::clone(&limits))).unwrap();

    let output = executor.execute_to_temp(&tables, &[]).unwrap();
    assert_eq!(output.table_type(), "TempTable");
    assert_eq!(output.column_names(), &["c1".to_string(), "c2".to_string()]);
    assert_eq!(output.active_tuple_count(), (ROWS / 2) as usize);
    assert_eq!(output.schema().column_type(0), ValueType::Varchar);
    assert_eq!(output.schema().column_declared_size(0), 16);
    assert!(limits.allocated() > 0);

    let first = output.iter().next().unwrap();
    assert_eq!(first.get_value(0).as_str(), Some("name-1"));
    assert_eq!(first.get_value(1), Value::BigInt(10));
}

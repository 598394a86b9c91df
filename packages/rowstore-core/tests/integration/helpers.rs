//! Shared table builders.

use rowstore_core::context::ExecutorContext;
use rowstore_core::factory::TableFactory;
use rowstore_core::index::{IndexType, TableIndexScheme};
use rowstore_core::schema::TupleSchema;
use rowstore_core::table::Table;
use rowstore_core::types::{Value, ValueType};

pub const ROW_COUNT: i64 = 20;

pub fn mixed_types() -> Vec<ValueType> {
    vec![
        ValueType::TinyInt,
        ValueType::BigInt,
        ValueType::BigInt,
        ValueType::BigInt,
        ValueType::Varchar,
        ValueType::Double,
    ]
}

pub fn mixed_schema() -> TupleSchema {
    let types = mixed_types();
    let sizes: Vec<usize> = types
        .iter()
        .map(|t| t.fixed_width().unwrap_or(20))
        .collect();
    TupleSchema::build_without_inlining(&types, &sizes, &[false, true, true, true, true, true])
        .unwrap()
}

pub fn mixed_names() -> Vec<String> {
    let mut names = vec!["id".to_string()];
    names.extend((1..=5).map(|i| format!("val{:02}", i)));
    names
}

pub fn mixed_row(i: i64) -> Vec<Value> {
    vec![
        Value::TinyInt(i as i8),
        Value::BigInt(i * 10),
        Value::BigInt(i * 100),
        if i % 5 == 0 {
            Value::Null(ValueType::BigInt)
        } else {
            Value::BigInt(-i)
        },
        Value::varchar(&format!("row-{}", i)),
        Value::Double(i as f64 * 0.5),
    ]
}

pub fn persistent_table(name: &str) -> Table {
    TableFactory::get_persistent_table(
        1,
        &ExecutorContext::default(),
        name,
        mixed_schema(),
        mixed_names(),
        Some(TableIndexScheme::new(
            "pk_id",
            IndexType::BalancedTree,
            vec![0],
            true,
        )),
        Vec::new(),
        None,
        false,
        false,
    )
}

pub fn filled_table(name: &str) -> Table {
    let mut table = persistent_table(name);
    for i in 0..ROW_COUNT {
        table.insert_values(&mixed_row(i)).unwrap();
    }
    table
}

pub fn rows_of(table: &Table) -> Vec<Vec<Value>> {
    table.iter().map(|t| t.values()).collect()
}

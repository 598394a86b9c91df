//! Table factory wiring seen from outside the crate.

use ntest::timeout;
use std::sync::Arc;

use rowstore_core::context::ExecutorContext;
use rowstore_core::factory::TableFactory;
use rowstore_core::index::{IndexType, LookupType, TableIndexScheme};
use rowstore_core::table::{TableVariant, TempTableLimits};
use rowstore_core::types::Value;

use super::helpers::{filled_table, mixed_names, mixed_row, mixed_schema, ROW_COUNT};

#[timeout(1000)]
#[test]
fn test_every_variant_shares_the_table_surface() {
    let ctx = ExecutorContext::new(2, "host-b", 7, 3);
    let persistent = TableFactory::get_persistent_table(
        4,
        &ctx,
        "p",
        mixed_schema(),
        mixed_names(),
        None,
        vec![TableIndexScheme::new("ix_val01", IndexType::BalancedTree, vec![1], false)],
        Some(0),
        false,
        false,
    );
    let streamed = TableFactory::get_persistent_table(
        4,
        &ctx,
        "s",
        mixed_schema(),
        mixed_names(),
        None,
        Vec::new(),
        None,
        false,
        true,
    );
    let temp = TableFactory::get_temp_table(4, "t", mixed_schema(), mixed_names(), None);

    for table in [&persistent, &streamed, &temp] {
        assert_eq!(table.column_count(), 6);
        assert_eq!(table.column_name(0), Some("id"));
        assert_eq!(table.column_index("val05"), Some(5));
        assert_eq!(table.database_id(), 4);
    }
    assert!(matches!(persistent.variant(), TableVariant::Persistent(_)));
    assert!(matches!(streamed.variant(), TableVariant::Streamed(_)));
    assert!(matches!(temp.variant(), TableVariant::Temp(_)));
    assert!(persistent.primary_key_index().is_none());
    assert_eq!(persistent.unique_index_count(), 0);
}

#[timeout(1000)]
#[test]
fn test_copied_temp_table_receives_scan_output() {
    let source = filled_table("source");
    let limits = Arc::new(TempTableLimits::new(64 * 1024 * 1024, 32 * 1024 * 1024));
    let mut output = TableFactory::get_copied_temp_table(1, "output", &source, Some(limits.clone()));

    let index = source.index("pk_id").unwrap();
    for row in index.lookup(LookupType::Gte, &[Value::TinyInt(15)]).unwrap() {
        output.insert_tuple(&source.tuple(row).unwrap()).unwrap();
    }

    let ids: Vec<Value> = output.iter().map(|t| t.get_value(0)).collect();
    assert_eq!(ids.len(), (ROW_COUNT - 15) as usize);
    assert_eq!(ids[0], Value::TinyInt(15));
    assert!(limits.allocated() > 0);
    assert_eq!(output.iter().next().unwrap().values(), mixed_row(15));

    drop(output);
    assert_eq!(limits.allocated(), 0);
}

//! Snapshot and restore through the database registry.

use ntest::timeout;
use tempfile::tempdir;

use rowstore_core::config::DbConfig;
use rowstore_core::context::ExecutorContext;
use rowstore_core::database::{ColumnDefinition, Database, TableDefinition};
use rowstore_core::index::{IndexType, TableIndexScheme};
use rowstore_core::types::{Value, ValueType};
use rowstore_core::DbError;

fn accounts() -> TableDefinition {
    TableDefinition {
        name: "accounts".to_string(),
        columns: vec![
            ColumnDefinition {
                name: "id".into(),
                value_type: ValueType::BigInt,
                size: 0,
                nullable: false,
            },
            ColumnDefinition {
                name: "owner".into(),
                value_type: ValueType::Varchar,
                size: 32,
                nullable: true,
            },
            ColumnDefinition {
                name: "notes".into(),
                value_type: ValueType::Varchar,
                size: 500,
                nullable: true,
            },
        ],
        primary_key: Some(TableIndexScheme::new("pk_accounts", IndexType::Hash, vec![0], true)),
        indexes: vec![TableIndexScheme::new(
            "ix_owner",
            IndexType::BalancedTree,
            vec![1],
            false,
        )],
        partition_column: Some(0),
        export_enabled: false,
        export_only: false,
    }
}

fn database(config: DbConfig) -> Database {
    Database::new(1, ExecutorContext::default(), config)
}

#[timeout(5000)]
#[test]
fn test_snapshot_then_restore_into_fresh_database() {
    let dir = tempdir().unwrap();
    let config = DbConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };

    let mut db = database(config.clone());
    db.create_table(accounts()).unwrap();
    let table = db.get_table_mut("accounts").unwrap();
    for i in 0..100i64 {
        let notes = if i % 3 == 0 {
            Value::Null(ValueType::Varchar)
        } else {
            Value::varchar(&"n".repeat(i as usize))
        };
        table
            .insert_values(&[Value::BigInt(i), Value::varchar(&format!("owner{}", i % 7)), notes])
            .unwrap();
    }
    let path = db.snapshot_table("accounts").unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("accounts.tbl.tmp").exists());
    assert!(dir.path().join("accounts.def.json").exists());

    let mut restored = database(config);
    assert_eq!(restored.restore_table("accounts").unwrap(), 100);
    assert_eq!(restored.definition("accounts"), Some(&accounts()));

    let original: Vec<Vec<Value>> = db.get_table("accounts").unwrap().iter().map(|t| t.values()).collect();
    let copy: Vec<Vec<Value>> = restored.get_table("accounts").unwrap().iter().map(|t| t.values()).collect();
    assert_eq!(original, copy);
    assert_eq!(restored.get_table("accounts").unwrap().index("ix_owner").unwrap().size(), 100);
}

#[timeout(1000)]
#[test]
fn test_restore_missing_snapshot_fails() {
    let dir = tempdir().unwrap();
    let mut db = database(DbConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert!(matches!(db.restore_table("nothing"), Err(DbError::IoError(_))));
    assert!(matches!(db.snapshot_table("nothing"), Err(DbError::TableNotFound { .. })));
    assert_eq!(db.table_count(), 0);
}

#[timeout(2000)]
#[test]
fn test_restore_into_populated_table_is_all_or_nothing() {
    let dir = tempdir().unwrap();
    let config = DbConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut db = database(config);
    db.create_table(accounts()).unwrap();
    for i in 0..10i64 {
        db.get_table_mut("accounts")
            .unwrap()
            .insert_values(&[Value::BigInt(i), Value::varchar("o"), Value::varchar("x")])
            .unwrap();
    }
    db.snapshot_table("accounts").unwrap();

    // Restoring on top of the same rows collides with the primary key.
    let err = db.restore_table("accounts").unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));
    assert_eq!(db.get_table("accounts").unwrap().active_tuple_count(), 10);
}

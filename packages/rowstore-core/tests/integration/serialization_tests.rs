//! Table serialization through the buffer and file transports.

use ntest::timeout;
use tempfile::tempdir;

use rowstore_core::factory::TableFactory;
use rowstore_core::schema::TupleSchema;
use rowstore_core::serialize::{
    deserialize_table, serialize_table_to_vec, BufferInput, FileInput, FileOutput, SerializeInput,
};
use rowstore_core::types::{Value, ValueType};
use rowstore_core::DbError;

use super::helpers::{filled_table, mixed_row, persistent_table, rows_of, ROW_COUNT};

/// Offset of the row count: prefix, column count, six 6-byte column entries.
const ROW_COUNT_OFFSET: usize = 4 + 2 + 6 * 6;

#[timeout(1000)]
#[test]
fn test_round_trip_through_buffer() {
    let source = filled_table("source");
    let bytes = serialize_table_to_vec(&source).unwrap();

    let mut target = persistent_table("target");
    let loaded = deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap();

    assert_eq!(loaded, ROW_COUNT as usize);
    assert_eq!(rows_of(&target), rows_of(&source));
    assert_eq!(serialize_table_to_vec(&target).unwrap(), bytes);
    assert!(target.iter().next().unwrap().is_null(3));
}

#[timeout(1000)]
#[test]
fn test_stream_header_layout() {
    let bytes = serialize_table_to_vec(&filled_table("t")).unwrap();

    let declared = i32::from_be_bytes(bytes[0..4].try_into().unwrap());
    assert_eq!(declared as usize, bytes.len() - 4);
    assert_eq!(&bytes[4..6], &[0, 6]);
    // TINYINT, inlined, not nullable, size 1
    assert_eq!(&bytes[6..12], &[3, 0x01, 0, 0, 0, 1]);
    // VARCHAR(20) kept out of line, nullable
    assert_eq!(&bytes[30..36], &[9, 0x02, 0, 0, 0, 20]);
    let rows = i32::from_be_bytes(bytes[ROW_COUNT_OFFSET..ROW_COUNT_OFFSET + 4].try_into().unwrap());
    assert_eq!(rows as i64, ROW_COUNT);
}

#[timeout(2000)]
#[test]
fn test_file_transport_matches_buffer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tbl");
    let source = filled_table("t");

    let mut out = FileOutput::create(&path).unwrap();
    let written = source.serialize_to(&mut out).unwrap();
    assert_eq!(out.finish().unwrap(), written);

    let file_bytes = std::fs::read(&path).unwrap();
    assert_eq!(file_bytes, serialize_table_to_vec(&source).unwrap());

    let mut target = persistent_table("t");
    let mut input = FileInput::open(&path).unwrap();
    assert_eq!(deserialize_table(&mut target, &mut input).unwrap(), ROW_COUNT as usize);
    assert_eq!(input.remaining(), 0);
    assert_eq!(rows_of(&target), rows_of(&source));
}

#[cfg(feature = "persist")]
#[timeout(2000)]
#[test]
fn test_mapped_file_load() {
    use rowstore_core::serialize::MappedFile;

    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tbl");
    std::fs::write(&path, serialize_table_to_vec(&filled_table("t")).unwrap()).unwrap();

    let mapped = MappedFile::open(&path).unwrap();
    let mut target = persistent_table("t");
    assert_eq!(
        deserialize_table(&mut target, &mut mapped.input()).unwrap(),
        ROW_COUNT as usize
    );
}

#[timeout(1000)]
#[test]
fn test_null_and_empty_strings_survive() {
    let schema = TupleSchema::build(&[ValueType::Varchar], &[100], &[true]).unwrap();
    let names = vec![String::new()];
    let mut source = TableFactory::get_temp_table(1, "strings", schema.clone(), names.clone(), None);
    source.insert_values(&[Value::Null(ValueType::Varchar)]).unwrap();
    source.insert_values(&[Value::varchar("")]).unwrap();
    source.insert_values(&[Value::varchar("text")]).unwrap();

    let bytes = serialize_table_to_vec(&source).unwrap();
    let mut target = TableFactory::get_temp_table(1, "strings", schema, names, None);
    deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap();

    let values: Vec<Value> = target.iter().map(|t| t.get_value(0)).collect();
    assert!(values[0].is_null());
    assert_eq!(values[1].as_str(), Some(""));
    assert_eq!(values[2].as_str(), Some("text"));
}

#[timeout(1000)]
#[test]
fn test_schema_mismatch_rejected() {
    let bytes = serialize_table_to_vec(&filled_table("t")).unwrap();
    let schema = TupleSchema::build(&[ValueType::Integer], &[4], &[true]).unwrap();
    let mut other = TableFactory::get_temp_table(1, "other", schema, vec!["a".into()], None);

    let err = deserialize_table(&mut other, &mut BufferInput::new(&bytes)).unwrap_err();
    assert!(matches!(err, DbError::SchemaMismatch(_)));
    assert_eq!(other.active_tuple_count(), 0);
}

#[timeout(1000)]
#[test]
fn test_truncated_stream_leaves_table_unchanged() {
    let bytes = serialize_table_to_vec(&filled_table("t")).unwrap();
    let mut target = persistent_table("t");
    target.insert_values(&mixed_row(100)).unwrap();

    let cut = &bytes[..bytes.len() - 7];
    let err = deserialize_table(&mut target, &mut BufferInput::new(cut)).unwrap_err();
    assert!(matches!(err, DbError::Truncated { .. }));

    // A consistent prefix over a short body fails while reading rows.
    let mut short = bytes[..bytes.len() - 7].to_vec();
    let frame_len = ((short.len() - 4) as i32).to_be_bytes();
    short[0..4].copy_from_slice(&frame_len);
    let err = deserialize_table(&mut target, &mut BufferInput::new(&short)).unwrap_err();
    assert!(matches!(err, DbError::Truncated { .. }));

    assert_eq!(target.active_tuple_count(), 1);
    assert_eq!(target.indexes()[0].size(), 1);
}

#[timeout(1000)]
#[test]
fn test_impossible_row_count_rejected() {
    let mut bytes = serialize_table_to_vec(&filled_table("t")).unwrap();
    bytes[ROW_COUNT_OFFSET..ROW_COUNT_OFFSET + 4].copy_from_slice(&1_000_000i32.to_be_bytes());
    let mut target = persistent_table("t");
    let err = deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap_err();
    assert!(matches!(err, DbError::Deserialization(_)));

    bytes[ROW_COUNT_OFFSET..ROW_COUNT_OFFSET + 4].copy_from_slice(&(-1i32).to_be_bytes());
    let err = deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap_err();
    assert!(matches!(err, DbError::Deserialization(_)));
    assert_eq!(target.active_tuple_count(), 0);
}

#[timeout(1000)]
#[test]
fn test_trailing_bytes_inside_frame_rejected() {
    let mut bytes = serialize_table_to_vec(&filled_table("t")).unwrap();
    bytes.extend_from_slice(&[0, 0, 0]);
    let frame_len = ((bytes.len() - 4) as i32).to_be_bytes();
    bytes[0..4].copy_from_slice(&frame_len);

    let mut target = persistent_table("t");
    let err = deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap_err();
    assert!(matches!(err, DbError::Deserialization(ref msg) if msg.contains("trailing")));
    assert_eq!(target.active_tuple_count(), 0);
}

#[timeout(1000)]
#[test]
fn test_conflicting_row_rolls_back_whole_load() {
    let bytes = serialize_table_to_vec(&filled_table("t")).unwrap();
    let mut target = persistent_table("t");
    target.insert_values(&mixed_row(10)).unwrap();

    let err = deserialize_table(&mut target, &mut BufferInput::new(&bytes)).unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));
    assert_eq!(target.active_tuple_count(), 1);
    assert_eq!(target.indexes()[0].size(), 1);
    assert_eq!(rows_of(&target), vec![mixed_row(10)]);
}

#[timeout(1000)]
#[test]
fn test_streams_can_be_concatenated() {
    let first = filled_table("a");
    let second = TableFactory::get_copied_temp_table(1, "b", &first, None);

    let mut bytes = serialize_table_to_vec(&first).unwrap();
    bytes.extend(serialize_table_to_vec(&second).unwrap());

    let mut input = BufferInput::new(&bytes);
    let mut a = persistent_table("a");
    let mut b = TableFactory::get_temp_table(
        1,
        "b",
        first.schema().clone(),
        first.column_names().to_vec(),
        None,
    );
    assert_eq!(deserialize_table(&mut a, &mut input).unwrap(), ROW_COUNT as usize);
    assert_eq!(deserialize_table(&mut b, &mut input).unwrap(), 0);
    assert_eq!(input.remaining(), 0);
}

//! End-to-end engine tests: tables, appends, queries, and triggers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_common::types::Timestamp;
use strata_common::RegisteredThread;
use strata_engine::{ColumnType, RecordBatch, Schema, Store, StoreOptions, Table, Value};
use strata_storage::StorageMode;

const MAX_RECORDS: u64 = 2560;
const DATA_SIZE: usize = 64;

/// The eight-column schema used across the query tests.
fn wide_schema() -> Schema {
    Schema::builder()
        .add_column(ColumnType::Bool, "a")
        .unwrap()
        .add_column(ColumnType::Char, "b")
        .unwrap()
        .add_column(ColumnType::Short, "c")
        .unwrap()
        .add_column(ColumnType::Int, "d")
        .unwrap()
        .add_column(ColumnType::Long, "e")
        .unwrap()
        .add_column(ColumnType::Float, "f")
        .unwrap()
        .add_column(ColumnType::Double, "g")
        .unwrap()
        .add_column(ColumnType::String(16), "h")
        .unwrap()
        .build()
}

/// A schema whose records are exactly `DATA_SIZE` bytes.
fn blob_schema() -> Schema {
    Schema::builder()
        .add_column(ColumnType::String(DATA_SIZE - 8), "payload")
        .unwrap()
        .build()
}

#[allow(clippy::too_many_arguments)]
fn record(
    schema: &Schema,
    a: bool,
    b: i8,
    c: i16,
    d: i32,
    e: i64,
    f: f32,
    g: f64,
    h: &str,
) -> Vec<u8> {
    schema
        .encode(
            Timestamp::now(),
            &[
                Value::Bool(a),
                Value::Char(b),
                Value::Short(c),
                Value::Int(d),
                Value::Long(e),
                Value::Float(f),
                Value::Double(g),
                Value::Str(h.to_string()),
            ],
        )
        .unwrap()
}

fn wide_table(store: &Store, name: &str) -> Arc<Table> {
    store
        .add_table(name, wide_schema(), StorageMode::InMemory)
        .unwrap();
    store.get_table(name).unwrap()
}

/// Appends the eight records whose `e` column walks powers of ten.
fn append_power_records(table: &Table) {
    let s = table.schema();
    table.append(&record(s, false, b'0' as i8, 0, 0, 0, 0.0, 0.01, "abc")).unwrap();
    table.append(&record(s, true, b'1' as i8, 10, 2, 1, 0.1, 0.02, "defg")).unwrap();
    table.append(&record(s, false, b'2' as i8, 20, 4, 10, 0.2, 0.03, "hijkl")).unwrap();
    table.append(&record(s, true, b'3' as i8, 30, 6, 100, 0.3, 0.04, "mnopqr")).unwrap();
    table.append(&record(s, false, b'4' as i8, 40, 8, 1000, 0.4, 0.05, "stuvwx")).unwrap();
    table.append(&record(s, true, b'5' as i8, 50, 10, 10000, 0.5, 0.06, "yyy")).unwrap();
    table.append(&record(s, false, b'6' as i8, 60, 12, 100000, 0.6, 0.07, "zzz")).unwrap();
    table.append(&record(s, true, b'7' as i8, 70, 14, 1000000, 0.7, 0.08, "zzz")).unwrap();
}

#[test]
fn test_append_and_get() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::in_memory();
    store
        .add_table("blob", blob_schema(), StorageMode::InMemory)
        .unwrap();
    let table = store.get_table("blob").unwrap();
    let record_size = table.record_size() as u64;
    assert_eq!(record_size, DATA_SIZE as u64);

    let mut offsets = Vec::new();
    for i in 0..MAX_RECORDS {
        let mut data = vec![(i % 256) as u8; DATA_SIZE];
        // Leading timestamp stays server-stamped.
        data[..8].copy_from_slice(&[0u8; 8]);
        offsets.push(table.append(&data).unwrap());
    }

    for (i, &offset) in offsets.iter().enumerate() {
        assert_eq!(offset, i as u64 * record_size);
        let view = table.read(offset).unwrap();
        let expected = (i % 256) as u8;
        for &byte in &view.bytes()[8..] {
            assert_eq!(byte, expected);
        }
    }
    assert_eq!(table.num_records(), MAX_RECORDS);
}

#[test]
fn test_add_table() {
    let store = Store::in_memory();
    let id = store
        .add_table("my_table", wide_schema(), StorageMode::InMemory)
        .unwrap();
    assert_eq!(id, store.table_id("my_table").unwrap());
}

#[test]
fn test_remove_table() {
    let store = Store::in_memory();
    let id = store
        .add_table("my_table", wide_schema(), StorageMode::InMemory)
        .unwrap();
    store
        .add_table("my_table", wide_schema(), StorageMode::InMemory)
        .unwrap_err();
    store.remove_table_by_id(id).unwrap();
    let err = store.remove_table("my_table").unwrap_err();
    assert_eq!(err.to_string(), "No such table my_table");
}

#[test]
fn test_adhoc_filter_on_long_column() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::in_memory();
    let table = wide_table(&store, "query");
    append_power_records(&table);

    let mut scan = table.execute_filter("e >= 1000").unwrap();
    let mut matched = Vec::new();
    while scan.has_more() {
        let view = scan.next().unwrap();
        matched.push(table.schema().value(view.bytes(), 5));
    }
    assert_eq!(
        matched,
        vec![
            Value::Long(1000),
            Value::Long(10000),
            Value::Long(100000),
            Value::Long(1000000)
        ]
    );
}

#[test]
fn test_adhoc_filter_matches_exact_predicate_set() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::in_memory();
    let table = wide_table(&store, "exact");
    append_power_records(&table);

    let mut scan = table
        .execute_filter("a == true && e < 10000")
        .unwrap();
    let mut count = 0;
    while let Some(view) = scan.next() {
        assert_eq!(table.schema().value(view.bytes(), 1), Value::Bool(true));
        count += 1;
    }
    // e in {1, 100} for the `a == true` rows below 10000.
    assert_eq!(count, 2);
}

#[test]
fn test_indexed_and_unindexed_agree() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::in_memory();
    let plain = wide_table(&store, "plain");
    let indexed = wide_table(&store, "indexed");
    indexed.add_index("e", 100.0).unwrap();
    indexed.add_index("d", 1.0).unwrap();

    append_power_records(&plain);
    append_power_records(&indexed);

    for expr in ["e >= 1000", "d == 8", "e > 50 && d <= 12", "e < 5 || d > 10"] {
        let mut a = plain.execute_filter(expr).unwrap();
        let mut b = indexed.execute_filter(expr).unwrap();
        let mut left = Vec::new();
        let mut right = Vec::new();
        while let Some(view) = a.next() {
            left.push(plain.schema().value(view.bytes(), 5));
        }
        while let Some(view) = b.next() {
            right.push(indexed.schema().value(view.bytes(), 5));
        }
        right.sort_by_key(|v| match v {
            Value::Long(e) => *e,
            _ => 0,
        });
        left.sort_by_key(|v| match v {
            Value::Long(e) => *e,
            _ => 0,
        });
        assert_eq!(left, right, "plans disagree for {expr}");
    }
}

#[test]
fn test_append_batch_returns_first_offset() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::in_memory();
    let table = wide_table(&store, "batch");
    let s = table.schema();

    let mut builder = RecordBatch::builder(table.record_size());
    builder
        .add_record(&record(s, false, 0, 0, 0, 0, 0.0, 0.01, "abc"))
        .unwrap();
    builder
        .add_record(&record(s, true, 1, 10, 2, 1, 0.1, 0.02, "defg"))
        .unwrap();
    let batch = builder.build();

    let first = table.append_batch(&batch).unwrap();
    assert_eq!(first, 0);
    assert_eq!(table.num_records(), 2);

    let second = table.append_batch(&batch).unwrap();
    assert_eq!(second, 2 * table.record_size() as u64);
    assert_eq!(table.num_records(), 4);
}

#[test]
fn test_concurrent_appends() {
    let _guard = RegisteredThread::new().unwrap();
    const WRITERS: usize = 2;
    const PER_WRITER: u64 = 10_000;

    let store = Store::in_memory();
    let table = wide_table(&store, "concurrent");
    let record_size = table.record_size() as u64;

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                let _guard = RegisteredThread::new().unwrap();
                let s = table.schema();
                for i in 0..PER_WRITER {
                    let bytes =
                        record(s, w == 0, w as i8, 0, i as i32, i as i64, 0.0, 0.0, "x");
                    table.append(&bytes).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = WRITERS as u64 * PER_WRITER;
    assert_eq!(table.num_records(), total);
    for i in 0..total {
        let view = table.read(i * record_size).unwrap();
        assert_eq!(view.len(), record_size as usize);
        assert!(!table.schema().timestamp_of(view.bytes()).is_zero());
    }
}

#[test]
fn test_trigger_emits_alert_after_lateness() {
    let _guard = RegisteredThread::new().unwrap();
    let store = Store::new(StoreOptions {
        trigger_lateness: Duration::from_millis(200),
        trigger_tick: Duration::from_millis(50),
        ..StoreOptions::default()
    });
    let table = wide_table(&store, "alerting");
    table.add_filter("big_d", "d > 5").unwrap();
    table.add_trigger("many_big_d", "big_d", "count > 3").unwrap();

    // Pin every record to the current bucket's start so the batch can
    // never straddle a bucket boundary.
    let bucket_start = Timestamp::now().bucket().start();
    let encode = |d: i32| {
        table
            .schema()
            .encode(
                bucket_start,
                &[
                    Value::Bool(true),
                    Value::Char(0),
                    Value::Short(0),
                    Value::Int(d),
                    Value::Long(0),
                    Value::Float(0.0),
                    Value::Double(0.0),
                    Value::Str("q".to_string()),
                ],
            )
            .unwrap()
    };
    for i in 0..4 {
        table.append(&encode(6 + i)).unwrap();
    }
    table.append(&encode(1)).unwrap();
    table.append(&encode(2)).unwrap();

    // The bucket completes at its 1-second boundary, then the lateness
    // threshold has to pass before the worker evaluates it.
    let deadline = Instant::now() + Duration::from_secs(5);
    while table.num_alerts() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }

    let mut alerts = table.get_alerts(Timestamp::ZERO, Timestamp::MAX);
    assert!(alerts.has_more(), "no alert emitted within the deadline");
    let alert = alerts.next().unwrap();
    assert_eq!(alert.trigger, "many_big_d");
    assert!(alert.value >= 4.0);
    let line = alert.to_string();
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "many_big_d");
}

#[test]
fn test_durable_table_round_trip() {
    let _guard = RegisteredThread::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(StoreOptions {
        data_dir: Some(dir.path().to_path_buf()),
        ..StoreOptions::default()
    });
    store
        .add_table("durable", wide_schema(), StorageMode::DurableRelaxed)
        .unwrap();
    let table = store.get_table("durable").unwrap();
    append_power_records(&table);
    assert_eq!(table.num_records(), 8);
    assert!(dir.path().join("durable").join("segment-000000.dat").exists());
}

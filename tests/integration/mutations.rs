//! Batch mutation engine: inserts with nested associations and key
//! backfill, grouped updates, deletes with per-row constraint fallback.

mod common;

use common::{all_access, query_one, seed_people, seed_stores_and_orders, setup};
use quarry::{
    Criteria, DeleteInput, InsertInput, QueryFilter, QueryInput, Record, RecordErrorKind, Session,
    UpdateInput, Value,
};

#[test]
fn batch_insert_backfills_generated_keys() {
    let (_dir, engine, _provider) = setup();

    let records = vec![
        Record::new().with_value("first_name", "Ada").with_value("age", 20),
        Record::new().with_value("first_name", "Grace").with_value("age", 30),
        Record::new().with_value("first_name", "Alan").with_value("age", 40),
    ];
    let output = engine
        .insert(&Session::new(), InsertInput::new("person", records), None)
        .unwrap();

    assert_eq!(output.success_count(), 3);
    let keys: Vec<i64> = output
        .records
        .iter()
        .map(|r| r.as_ref().unwrap().value_int("id").unwrap())
        .collect();
    assert_eq!(keys, vec![1, 2, 3]);
}

#[test]
fn mixed_column_sets_share_statements_per_shape() {
    let (_dir, engine, engine_provider) = setup();

    let records = vec![
        Record::new().with_value("first_name", "A").with_value("age", 1),
        Record::new().with_value("first_name", "B"),
        Record::new().with_value("first_name", "C").with_value("age", 3),
    ];
    let output = engine
        .insert(&Session::new(), InsertInput::new("person", records), None)
        .unwrap();
    assert_eq!(output.success_count(), 3);
    // Two distinct column sets mean exactly two physical statements.
    assert_eq!(engine.stats_snapshot().batches_run, 2);
    assert_eq!(
        query_one(&engine_provider, "SELECT COUNT(*) FROM \"person\""),
        Value::Int(3)
    );
}

#[test]
fn nested_association_tree_inserts_depth_first() {
    let (_dir, engine, provider) = setup();
    common::exec(
        &provider,
        "INSERT INTO \"store\" (id, name) VALUES (1, 'store-1')",
        &[],
    );

    let order = Record::new()
        .with_value("store_id", 1)
        .with_value("total", 99.5)
        .with_associated_records(
            "lines",
            vec![
                Record::new()
                    .with_value("sku", "apple")
                    .with_value("quantity", 2)
                    .with_associated_records(
                        "notes",
                        vec![
                            Record::new().with_value("note", "bruised"),
                            Record::new().with_value("note", "green"),
                        ],
                    ),
                Record::new()
                    .with_value("sku", "pear")
                    .with_value("quantity", 1)
                    .with_associated_records(
                        "notes",
                        vec![Record::new().with_value("note", "ripe")],
                    ),
            ],
        );

    let output = engine
        .insert(&all_access(), InsertInput::new("order", vec![order]), None)
        .unwrap();
    assert_eq!(output.success_count(), 1);

    let order = output.records[0].as_ref().unwrap();
    let order_id = order.value_int("id").expect("order key assigned");

    let lines = &order.associations["lines"];
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(line.value_int("id").is_some(), "line key assigned");
        assert_eq!(line.value_int("order_id"), Some(order_id));
        for note in &line.associations["notes"] {
            assert!(note.value_int("id").is_some(), "note key assigned");
            assert_eq!(note.value_int("order_line_id"), line.value_int("id"));
        }
    }

    assert_eq!(query_one(&provider, "SELECT COUNT(*) FROM \"order\""), Value::Int(1));
    assert_eq!(
        query_one(&provider, "SELECT COUNT(*) FROM \"order_line\""),
        Value::Int(2)
    );
    assert_eq!(
        query_one(&provider, "SELECT COUNT(*) FROM \"line_note\""),
        Value::Int(3)
    );
}

#[test]
fn one_bad_record_does_not_abort_its_batch() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    // id 3 collides; its siblings still insert.
    let records = vec![
        Record::new().with_value("id", 100).with_value("first_name", "New"),
        Record::new().with_value("id", 3).with_value("first_name", "Dup"),
        Record::new().with_value("id", 101).with_value("first_name", "Also"),
    ];
    let output = engine
        .insert(&Session::new(), InsertInput::new("person", records), None)
        .unwrap();

    assert_eq!(output.success_count(), 2);
    let failure = output.records[1].as_ref().unwrap_err();
    assert_eq!(failure.error.kind, RecordErrorKind::Constraint);
    assert_eq!(
        query_one(&provider, "SELECT COUNT(*) FROM \"person\""),
        Value::Int(7)
    );
}

#[test]
fn unknown_field_is_a_per_record_error() {
    let (_dir, engine, _provider) = setup();

    let records = vec![
        Record::new().with_value("first_name", "Ok"),
        Record::new().with_value("no_such_field", 1),
    ];
    let output = engine
        .insert(&Session::new(), InsertInput::new("person", records), None)
        .unwrap();
    assert_eq!(output.success_count(), 1);
    assert_eq!(
        output.records[1].as_ref().unwrap_err().error.kind,
        RecordErrorKind::Invalid
    );
}

#[test]
fn write_lock_rejects_records_per_record() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let records = vec![
        Record::new().with_value("store_id", 1).with_value("total", 5.0),
        Record::new().with_value("store_id", 2).with_value("total", 6.0),
    ];
    let output = engine
        .insert(
            &common::store_session(1),
            InsertInput::new("order", records),
            None,
        )
        .unwrap();

    assert_eq!(output.success_count(), 1);
    assert_eq!(
        output.records[1].as_ref().unwrap_err().error.kind,
        RecordErrorKind::AccessDenied
    );
}

#[test]
fn updates_group_by_column_set_and_shared_values() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);
    engine.reset_stats();

    let records = vec![
        // Three records set the same value: one shared statement.
        Record::new().with_value("id", 1).with_value("last_name", "Shared"),
        Record::new().with_value("id", 2).with_value("last_name", "Shared"),
        Record::new().with_value("id", 3).with_value("last_name", "Shared"),
        // Two more share columns but not values: one batched statement.
        Record::new().with_value("id", 4).with_value("last_name", "Solo"),
        Record::new().with_value("id", 5).with_value("last_name", "Other"),
    ];
    let output = engine
        .update(&Session::new(), UpdateInput::new("person", records), None)
        .unwrap();

    assert_eq!(output.success_count(), 5);
    assert_eq!(engine.stats_snapshot().batches_run, 2);
    assert_eq!(
        query_one(
            &provider,
            "SELECT COUNT(*) FROM \"person\" WHERE last_name = 'Shared'"
        ),
        Value::Int(3)
    );
    assert_eq!(
        query_one(
            &provider,
            "SELECT last_name FROM \"person\" WHERE id = 5"
        ),
        Value::Text("Other".into())
    );
}

#[test]
fn update_without_primary_key_fails_that_record_only() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let records = vec![
        Record::new().with_value("last_name", "Nowhere"),
        Record::new().with_value("id", 1).with_value("last_name", "Moved"),
    ];
    let output = engine
        .update(&Session::new(), UpdateInput::new("person", records), None)
        .unwrap();

    assert_eq!(output.success_count(), 1);
    assert_eq!(
        output.records[0].as_ref().unwrap_err().error.kind,
        RecordErrorKind::Invalid
    );
    assert_eq!(
        query_one(&provider, "SELECT last_name FROM \"person\" WHERE id = 1"),
        Value::Text("Moved".into())
    );
}

#[test]
fn update_stamps_modify_date_fields() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let records = vec![Record::new().with_value("id", 1).with_value("total", 11.0)];
    let output = engine
        .update(&all_access(), UpdateInput::new("order", records), None)
        .unwrap();
    assert_eq!(output.success_count(), 1);
    assert!(matches!(
        output.records[0].as_ref().unwrap().value("modified_at"),
        Some(Value::Timestamp(_))
    ));
    assert_ne!(
        query_one(&provider, "SELECT modified_at FROM \"order\" WHERE id = 1"),
        Value::Null
    );
}

#[test]
fn delete_reports_blocked_rows_and_keeps_them() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    // Stores 1 and 2 are referenced by orders; 3, 4, 5 are free.
    let output = engine
        .delete(
            &Session::new(),
            DeleteInput::new("store", vec![1, 2, 3, 4, 5]),
            None,
        )
        .unwrap();

    assert_eq!(output.deleted_count, 3);
    assert_eq!(output.failures.len(), 2);
    let mut blocked: Vec<i64> = output
        .failures
        .iter()
        .filter_map(|f| f.primary_key.as_int())
        .collect();
    blocked.sort_unstable();
    assert_eq!(blocked, vec![1, 2]);
    for failure in &output.failures {
        assert_eq!(failure.error.kind, RecordErrorKind::Constraint);
    }
    assert_eq!(
        query_one(&provider, "SELECT COUNT(*) FROM \"store\""),
        Value::Int(2)
    );
}

#[test]
fn deleting_an_absent_key_is_a_no_op() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let output = engine
        .delete(&Session::new(), DeleteInput::new("person", vec![4, 5, 999]), None)
        .unwrap();
    assert_eq!(output.deleted_count, 2);
    assert!(output.failures.is_empty());
    assert_eq!(
        query_one(&provider, "SELECT COUNT(*) FROM \"person\""),
        Value::Int(3)
    );
}

#[test]
fn statistics_count_queries_and_batches() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);
    engine.reset_stats();

    engine
        .query(&Session::new(), &QueryInput::new("person"), None)
        .unwrap();
    assert_eq!(engine.stats_snapshot().queries_run, 1);

    engine
        .query(
            &Session::new(),
            &QueryInput::new("person").with_filter(
                QueryFilter::new().with_criteria(Criteria::is_in("id", vec![1, 2])),
            ),
            None,
        )
        .unwrap();
    assert_eq!(engine.stats_snapshot().queries_run, 2);

    engine
        .insert(
            &Session::new(),
            InsertInput::new("person", vec![Record::new().with_value("first_name", "X")]),
            None,
        )
        .unwrap();
    let snapshot = engine.stats_snapshot();
    assert_eq!(snapshot.queries_run, 2);
    assert_eq!(snapshot.batches_run, 1);

    engine.reset_stats();
    assert_eq!(engine.stats_snapshot().queries_run, 0);
}

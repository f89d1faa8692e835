//! Row-security lock injection: scoped sessions, all-access, missing keys,
//! locks on joined tables, and write-only locks.

mod common;

use common::{all_access, ids, seed_order_lines, seed_stores_and_orders, setup, store_session};
use quarry::{
    Aggregate, AggregateInput, CountInput, QueryInput, Session,
};

#[test]
fn store_scoped_session_sees_only_its_orders() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let output = engine
        .query(&store_session(1), &QueryInput::new("order"), None)
        .unwrap();
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![1, 2, 3]);
}

#[test]
fn missing_key_means_no_access_not_an_error() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let output = engine
        .query(&Session::new(), &QueryInput::new("order"), None)
        .unwrap();
    assert!(output.records.is_empty());
}

#[test]
fn explicitly_empty_key_set_is_also_no_access() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let session = Session::new().with_empty_security_key("store");
    let output = engine
        .query(&session, &QueryInput::new("order"), None)
        .unwrap();
    assert!(output.records.is_empty());
}

#[test]
fn all_access_sentinel_lifts_the_restriction() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let output = engine
        .query(&all_access(), &QueryInput::new("order"), None)
        .unwrap();
    assert_eq!(output.records.len(), 8);
}

#[test]
fn multiple_key_values_widen_access() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let session = Session::new()
        .with_security_key_value("store", 1)
        .with_security_key_value("store", 2);
    let output = engine
        .query(&session, &QueryInput::new("order"), None)
        .unwrap();
    assert_eq!(output.records.len(), 8);
}

#[test]
fn chained_lock_restricts_through_a_joined_table() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);
    seed_order_lines(&provider);

    // order_line's key lives on order; the injector joins it in silently.
    let output = engine
        .query(&store_session(1), &QueryInput::new("order_line"), None)
        .unwrap();
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![1, 2]);

    let output = engine
        .query(&store_session(2), &QueryInput::new("order_line"), None)
        .unwrap();
    assert_eq!(ids(&output.records), vec![3]);
}

#[test]
fn write_only_lock_never_restricts_reads() {
    let (_dir, engine, provider) = setup();
    common::exec(
        &provider,
        "INSERT INTO \"audit_log\" (id, store_id, message) VALUES (1, 1, 'a'), (2, 2, 'b')",
        &[],
    );

    // No session keys at all: a WRITE-scope lock must not filter a query.
    let output = engine
        .query(&Session::new(), &QueryInput::new("audit_log"), None)
        .unwrap();
    assert_eq!(output.records.len(), 2);
}

#[test]
fn counts_and_aggregates_respect_locks() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let count = engine
        .count(&store_session(1), &CountInput::new("order"), None)
        .unwrap();
    assert_eq!(count.count, 3);

    let aggregate = engine
        .aggregate(
            &store_session(1),
            &AggregateInput::new("order").with_aggregate(Aggregate::sum("total")),
            None,
        )
        .unwrap();
    assert_eq!(
        aggregate.results[0].aggregate(&Aggregate::sum("total")),
        Some(&quarry::Value::Float(60.0))
    );
}

#[test]
fn no_access_cannot_be_told_from_no_data() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    // Store 3 exists but has no orders; a key for it and a missing key both
    // produce the same empty result.
    let with_key = engine
        .query(&store_session(3), &QueryInput::new("order"), None)
        .unwrap();
    let without_key = engine
        .query(&Session::new(), &QueryInput::new("order"), None)
        .unwrap();
    assert_eq!(with_key.records.len(), 0);
    assert_eq!(without_key.records.len(), 0);
}

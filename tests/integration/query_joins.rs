//! Join graph resolution end to end: explicit, implicit, ambiguous,
//! multi-hop and flipped joins.

mod common;

use common::{all_access, ids, seed_order_lines, seed_people, seed_stores_and_orders, setup};
use quarry::{
    Criteria, EngineError, QueryFilter, QueryInput, QueryJoin, Session, Value,
};

#[test]
fn selected_join_exposes_prefixed_fields() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = QueryInput::new("order")
        .with_join(QueryJoin::new("store").select())
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 1)));
    let output = engine.query(&all_access(), &input, None).unwrap();

    let record = &output.records[0];
    assert_eq!(record.value_int("id"), Some(1));
    assert_eq!(record.value_text("store.name"), Some("store-1"));
}

#[test]
fn qualified_filter_field_joins_implicitly() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    // No explicit join: the qualified criteria pulls `order` in.
    let input = QueryInput::new("store")
        .with_filter(QueryFilter::new().with_criteria(Criteria::gte("order.total", 70.0)));
    let output = engine.query(&all_access(), &input, None).unwrap();

    let mut got = ids(&output.records);
    got.sort_unstable();
    got.dedup();
    assert_eq!(got, vec![2]);
}

#[test]
fn ambiguous_join_requires_a_qualifier() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person").with_join(QueryJoin::new("store"));
    let err = engine.query(&Session::new(), &input, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::AmbiguousJoin { candidates: 2, .. }
    ));
}

#[test]
fn named_joins_with_aliases_disambiguate() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);
    common::exec(
        &provider,
        "INSERT INTO \"person\" (id, first_name, age, home_store_id, work_store_id) \
         VALUES (1, 'Ada', 20, 1, 2)",
        &[],
    );

    let input = QueryInput::new("person")
        .with_join(
            QueryJoin::new("store")
                .with_join_name("home_store")
                .with_alias("home")
                .select(),
        )
        .with_join(
            QueryJoin::new("store")
                .with_join_name("work_store")
                .with_alias("work")
                .select(),
        )
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("home.name", "store-1")));
    let output = engine.query(&Session::new(), &input, None).unwrap();

    let record = &output.records[0];
    assert_eq!(record.value_text("home.name"), Some("store-1"));
    assert_eq!(record.value_text("work.name"), Some("store-2"));
}

#[test]
fn multi_hop_exposed_join_reaches_distant_tables() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);
    seed_order_lines(&provider);

    // store -> order -> order_line resolves through the exposed chain; the
    // intermediate table never shows up in the output.
    let input = QueryInput::new("store")
        .with_join(QueryJoin::new("order_line").select())
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("order_line.sku", "plum")));
    let output = engine.query(&all_access(), &input, None).unwrap();

    assert_eq!(output.records.len(), 1);
    let record = &output.records[0];
    assert_eq!(record.value_int("id"), Some(2));
    assert_eq!(record.value_int("order_line.quantity"), Some(7));
    assert!(record.value("order.id").is_none(), "intermediate hop is not selected");
}

#[test]
fn duplicate_alias_is_rejected() {
    let (_dir, engine, _provider) = setup();

    let input = QueryInput::new("order")
        .with_join(QueryJoin::new("store"))
        .with_join(QueryJoin::new("store"));
    let err = engine.query(&all_access(), &input, None).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateAlias { alias } if alias == "store"));
}

#[test]
fn left_join_keeps_unmatched_main_rows() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = QueryInput::new("store")
        .with_join(
            QueryJoin::new("order")
                .with_kind(quarry::JoinKind::Left)
                .select(),
        )
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 5)));
    let output = engine.query(&all_access(), &input, None).unwrap();

    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].value("order.id"), Some(&Value::Null));
}

#[test]
fn count_with_fanning_join_counts_distinct_main_rows() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    // Store 2 has five orders; the count still sees one store.
    let input = quarry::CountInput::new("store")
        .with_filter(QueryFilter::new().with_criteria(Criteria::gte("order.total", 40.0)));
    let output = engine.count(&all_access(), &input, None).unwrap();
    assert_eq!(output.count, 1);
}

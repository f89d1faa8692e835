//! Aggregate and group-by behavior, including the zero-match asymmetry.

mod common;

use common::{all_access, seed_stores_and_orders, setup};
use quarry::{
    Aggregate, AggregateInput, Criteria, GroupBy, OrderBy, QueryFilter, Value,
};

#[test]
fn no_group_by_and_no_matches_yields_one_zero_filled_row() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_aggregate(Aggregate::sum("total"))
        .with_aggregate(Aggregate::max("total"))
        .with_filter(QueryFilter::new().with_criteria(Criteria::gt("total", 1000.0)));
    let output = engine.aggregate(&all_access(), &input, None).unwrap();

    assert_eq!(output.results.len(), 1);
    let result = &output.results[0];
    assert_eq!(result.aggregate(&Aggregate::count("id")), Some(&Value::Int(0)));
    assert_eq!(result.aggregate(&Aggregate::sum("total")), Some(&Value::Null));
    assert_eq!(result.aggregate(&Aggregate::max("total")), Some(&Value::Null));
}

#[test]
fn group_by_with_no_matches_yields_zero_rows() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_group_by(GroupBy::new("store_id"))
        .with_filter(QueryFilter::new().with_criteria(Criteria::gt("total", 1000.0)));
    let output = engine.aggregate(&all_access(), &input, None).unwrap();
    assert!(output.results.is_empty());
}

#[test]
fn aggregate_operators_compute_expected_values() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_aggregate(Aggregate::sum("total"))
        .with_aggregate(Aggregate::avg("total"))
        .with_aggregate(Aggregate::min("total"))
        .with_aggregate(Aggregate::max("total"));
    let output = engine.aggregate(&all_access(), &input, None).unwrap();

    let result = &output.results[0];
    assert_eq!(result.aggregate(&Aggregate::count("id")), Some(&Value::Int(8)));
    assert_eq!(result.aggregate(&Aggregate::sum("total")), Some(&Value::Float(360.0)));
    assert_eq!(result.aggregate(&Aggregate::avg("total")), Some(&Value::Float(45.0)));
    assert_eq!(result.aggregate(&Aggregate::min("total")), Some(&Value::Float(10.0)));
    assert_eq!(result.aggregate(&Aggregate::max("total")), Some(&Value::Float(80.0)));
}

#[test]
fn group_by_produces_one_row_per_distinct_value() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_group_by(GroupBy::new("store_id"))
        .with_filter(QueryFilter::new().with_order_by(OrderBy::asc("store_id")));
    let output = engine.aggregate(&all_access(), &input, None).unwrap();

    assert_eq!(output.results.len(), 2);
    assert_eq!(output.results[0].group_by("store_id"), Some(&Value::Int(1)));
    assert_eq!(
        output.results[0].aggregate(&Aggregate::count("id")),
        Some(&Value::Int(3))
    );
    assert_eq!(output.results[1].group_by("store_id"), Some(&Value::Int(2)));
    assert_eq!(
        output.results[1].aggregate(&Aggregate::count("id")),
        Some(&Value::Int(5))
    );
}

#[test]
fn order_by_an_unselected_aggregate() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);

    // Order store groups by SUM(total) descending without selecting it.
    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_group_by(GroupBy::new("store_id"))
        .with_filter(
            QueryFilter::new().with_order_by(OrderBy::aggregate(Aggregate::sum("total"), false)),
        );
    let output = engine.aggregate(&all_access(), &input, None).unwrap();

    assert_eq!(output.results.len(), 2);
    // Store 2 carries the larger sum and comes first.
    assert_eq!(output.results[0].group_by("store_id"), Some(&Value::Int(2)));
    // The ordering aggregate was stripped from the mapped result.
    assert_eq!(output.results[0].aggregate(&Aggregate::sum("total")), None);
    assert_eq!(output.results[0].aggregates.len(), 1);
}

#[test]
fn multiple_group_bys_group_by_distinct_tuples() {
    let (_dir, engine, provider) = setup();
    seed_stores_and_orders(&provider);
    // Duplicate totals inside one store collapse into one tuple.
    common::exec(
        &provider,
        "INSERT INTO \"order\" (id, store_id, total) VALUES (9, 1, 10.0)",
        &[],
    );

    let input = AggregateInput::new("order")
        .with_aggregate(Aggregate::count("id"))
        .with_group_by(GroupBy::new("store_id"))
        .with_group_by(GroupBy::new("total"))
        .with_filter(
            QueryFilter::new()
                .with_order_by(OrderBy::asc("store_id"))
                .with_order_by(OrderBy::asc("total")),
        );
    let output = engine.aggregate(&all_access(), &input, None).unwrap();

    // Nine orders, eight distinct (store_id, total) tuples.
    assert_eq!(output.results.len(), 8);
    let first = &output.results[0];
    assert_eq!(first.group_by("store_id"), Some(&Value::Int(1)));
    assert_eq!(first.group_by("total"), Some(&Value::Float(10.0)));
    assert_eq!(first.aggregate(&Aggregate::count("id")), Some(&Value::Int(2)));
}

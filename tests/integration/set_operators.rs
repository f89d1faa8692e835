//! Set-operator filters: UNION, UNION ALL, INTERSECT, EXCEPT.

mod common;

use common::{ids, seed_people, setup};
use quarry::{
    Criteria, EngineError, OrderBy, QueryFilter, QueryInput, Session, SetOperator,
};

fn arm(ids: Vec<i64>) -> QueryFilter {
    QueryFilter::new().with_criteria(Criteria::is_in("id", ids))
}

fn run(engine: &quarry::Engine, filter: QueryFilter) -> Vec<i64> {
    let input = QueryInput::new("person").with_filter(filter);
    ids(&engine.query(&Session::new(), &input, None).unwrap().records)
}

#[test]
fn union_deduplicates_and_orders() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Union)
        .with_sub_filter(arm(vec![1, 2]))
        .with_sub_filter(arm(vec![2, 3]))
        .with_order_by(OrderBy::desc("id"));
    assert_eq!(run(&engine, filter), vec![3, 2, 1]);
}

#[test]
fn union_all_keeps_duplicates() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::UnionAll)
        .with_sub_filter(arm(vec![1, 2]))
        .with_sub_filter(arm(vec![2, 3]))
        .with_order_by(OrderBy::desc("id"));
    assert_eq!(run(&engine, filter), vec![3, 2, 2, 1]);
}

#[test]
fn intersect_keeps_common_rows() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Intersect)
        .with_sub_filter(arm(vec![1, 2]))
        .with_sub_filter(arm(vec![2, 3]))
        .with_order_by(OrderBy::desc("id"));
    assert_eq!(run(&engine, filter), vec![2]);
}

#[test]
fn except_subtracts_later_arms() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Except)
        .with_sub_filter(arm(vec![1, 2, 3]))
        .with_sub_filter(arm(vec![2]))
        .with_order_by(OrderBy::asc("id"));
    assert_eq!(run(&engine, filter), vec![1, 3]);
}

#[test]
fn top_level_pagination_applies_after_the_set_operation() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Union)
        .with_sub_filter(arm(vec![1, 2]))
        .with_sub_filter(arm(vec![2, 3]))
        .with_order_by(OrderBy::desc("id"))
        .with_limit(2);
    assert_eq!(run(&engine, filter), vec![3, 2]);
}

#[test]
fn counting_a_set_operation_wraps_it() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Union)
        .with_sub_filter(arm(vec![1, 2]))
        .with_sub_filter(arm(vec![2, 3]));
    let input = quarry::CountInput::new("person").with_filter(filter);
    let output = engine.count(&Session::new(), &input, None).unwrap();
    assert_eq!(output.count, 3);
}

#[test]
fn set_operator_filters_reject_their_own_criteria() {
    let (_dir, engine, _provider) = setup();

    let filter = QueryFilter::new()
        .with_set_operator(SetOperator::Union)
        .with_criteria(Criteria::eq("id", 1))
        .with_sub_filter(arm(vec![1]));
    let input = QueryInput::new("person").with_filter(filter);
    let err = engine.query(&Session::new(), &input, None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidFilter { .. }));
}

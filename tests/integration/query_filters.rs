//! Filter tree compilation and execution against the reference backend.

mod common;

use common::{ids, seed_people, setup};
use quarry::{
    Criteria, CriteriaOperator, OrderBy, QueryFilter, QueryInput, Session, Value,
};

#[test]
fn in_list_matches_exactly_those_rows() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::is_in("id", vec![2, 4])));
    let output = engine.query(&Session::new(), &input, None).unwrap();

    assert_eq!(output.records.len(), 2);
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![2, 4]);
}

#[test]
fn empty_in_list_yields_no_rows() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::is_in("id", Vec::<i64>::new())));
    let output = engine.query(&Session::new(), &input, None).unwrap();
    assert!(output.records.is_empty());
}

#[test]
fn empty_not_in_list_yields_every_row() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::not_in("id", Vec::<i64>::new())));
    let output = engine.query(&Session::new(), &input, None).unwrap();
    assert_eq!(output.records.len(), 5);
}

#[test]
fn nested_boolean_tree_preserves_precedence() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    // age >= 30 AND (first_name = 'Grace' OR first_name = 'Alan')
    let filter = QueryFilter::new()
        .with_criteria(Criteria::gte("age", 30))
        .with_sub_filter(
            QueryFilter::any()
                .with_criteria(Criteria::eq("first_name", "Grace"))
                .with_criteria(Criteria::eq("first_name", "Alan")),
        );
    let output = engine
        .query(&Session::new(), &QueryInput::new("person").with_filter(filter), None)
        .unwrap();

    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![2, 5]);
}

#[test]
fn between_and_text_operators() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let between = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::between("age", 30, 50)));
    assert_eq!(
        ids(&engine.query(&Session::new(), &between, None).unwrap().records).len(),
        3
    );

    let starts = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::starts_with("first_name", "A")));
    let output = engine.query(&Session::new(), &starts, None).unwrap();
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![1, 5]);

    let contains = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::contains("last_name", "ov")));
    let output = engine.query(&Session::new(), &contains, None).unwrap();
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![1, 4]);
}

#[test]
fn blank_tests_catch_null_text() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let blank = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::is_blank("last_name")));
    assert_eq!(
        ids(&engine.query(&Session::new(), &blank, None).unwrap().records),
        vec![5]
    );

    let not_blank = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::is_not_blank("last_name")));
    assert_eq!(
        engine.query(&Session::new(), &not_blank, None).unwrap().records.len(),
        4
    );
}

#[test]
fn column_to_column_comparison() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    // Everyone's age exceeds their id in the fixture; shrink one to check.
    common::exec(&provider, "UPDATE \"person\" SET age = 1 WHERE id = 3", &[]);
    let input = QueryInput::new("person").with_filter(
        QueryFilter::new().with_criteria(Criteria::vs_field(
            "age",
            CriteriaOperator::GreaterThan,
            "id",
        )),
    );
    let output = engine.query(&Session::new(), &input, None).unwrap();
    let mut got = ids(&output.records);
    got.sort_unstable();
    assert_eq!(got, vec![1, 2, 4, 5]);
}

#[test]
fn ordering_and_pagination() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person").with_filter(
        QueryFilter::new()
            .with_order_by(OrderBy::desc("age"))
            .with_limit(2)
            .with_skip(1),
    );
    let output = engine.query(&Session::new(), &input, None).unwrap();
    assert_eq!(ids(&output.records), vec![4, 3]);
}

#[test]
fn field_name_restriction_trims_records() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person")
        .with_field_names_to_include(["id", "first_name"])
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 1)));
    let output = engine.query(&Session::new(), &input, None).unwrap();
    let record = &output.records[0];
    assert_eq!(record.values.len(), 2);
    assert_eq!(record.value_text("first_name"), Some("Ada"));
    assert_eq!(record.value("age"), None);
}

#[test]
fn unknown_field_is_a_resolution_error() {
    let (_dir, engine, _provider) = setup();
    let input = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("nonexistent", 1)));
    let err = engine.query(&Session::new(), &input, None).unwrap_err();
    assert!(matches!(err, quarry::EngineError::UnknownField { .. }));
}

#[test]
fn typed_values_round_trip() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let input = QueryInput::new("person")
        .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 5)));
    let record = engine
        .query(&Session::new(), &input, None)
        .unwrap()
        .records
        .remove(0);
    assert_eq!(record.value("age"), Some(&Value::Int(60)));
    assert_eq!(record.value("last_name"), Some(&Value::Null));
}

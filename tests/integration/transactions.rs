//! Transaction coordinator: read-your-own-writes scope, commit, rollback,
//! and drop behavior.

mod common;

use common::{seed_people, setup};
use quarry::{Criteria, InsertInput, QueryFilter, QueryInput, Record, Session};

fn count_people(engine: &quarry::Engine, tx: Option<&quarry::Transaction>) -> usize {
    engine
        .query(&Session::new(), &QueryInput::new("person"), tx)
        .unwrap()
        .records
        .len()
}

#[test]
fn uncommitted_writes_are_visible_only_inside_the_transaction() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let tx = engine.open_transaction().unwrap();
    engine
        .insert(
            &Session::new(),
            InsertInput::new("person", vec![Record::new().with_value("first_name", "Tx")]),
            Some(&tx),
        )
        .unwrap();

    assert_eq!(count_people(&engine, Some(&tx)), 6, "same handle sees the write");
    assert_eq!(count_people(&engine, None), 5, "auto-commit reader does not");

    tx.commit().unwrap();
    assert_eq!(count_people(&engine, None), 6, "committed write is visible");
}

#[test]
fn rollback_discards_the_unit_of_work() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let tx = engine.open_transaction().unwrap();
    engine
        .insert(
            &Session::new(),
            InsertInput::new("person", vec![Record::new().with_value("first_name", "Gone")]),
            Some(&tx),
        )
        .unwrap();
    tx.rollback().unwrap();

    assert_eq!(count_people(&engine, None), 5);
}

#[test]
fn dropping_an_active_transaction_rolls_back() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    {
        let tx = engine.open_transaction().unwrap();
        engine
            .insert(
                &Session::new(),
                InsertInput::new("person", vec![Record::new().with_value("first_name", "Drop")]),
                Some(&tx),
            )
            .unwrap();
        // No commit: the drop rolls the work back.
    }

    assert_eq!(count_people(&engine, None), 5);
}

#[test]
fn a_second_transaction_is_an_independent_unit_of_work() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let writer = engine.open_transaction().unwrap();
    engine
        .insert(
            &Session::new(),
            InsertInput::new("person", vec![Record::new().with_value("first_name", "W")]),
            Some(&writer),
        )
        .unwrap();

    // A reader opened afterwards shares none of the writer's state.
    let reader = engine.open_transaction().unwrap();
    assert_eq!(count_people(&engine, Some(&reader)), 5);

    writer.commit().unwrap();
    reader.rollback().unwrap();
    assert_eq!(count_people(&engine, None), 6);
}

#[test]
fn mutations_in_a_transaction_update_inside_it() {
    let (_dir, engine, provider) = setup();
    seed_people(&provider);

    let tx = engine.open_transaction().unwrap();
    engine
        .update(
            &Session::new(),
            quarry::UpdateInput::new(
                "person",
                vec![Record::new().with_value("id", 1).with_value("first_name", "Renamed")],
            ),
            Some(&tx),
        )
        .unwrap();

    let inside = engine
        .query(
            &Session::new(),
            &QueryInput::new("person")
                .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 1))),
            Some(&tx),
        )
        .unwrap();
    assert_eq!(inside.records[0].value_text("first_name"), Some("Renamed"));

    let outside = engine
        .query(
            &Session::new(),
            &QueryInput::new("person")
                .with_filter(QueryFilter::new().with_criteria(Criteria::eq("id", 1))),
            None,
        )
        .unwrap();
    assert_eq!(outside.records[0].value_text("first_name"), Some("Ada"));

    tx.rollback().unwrap();
}

use nitrite_engine::collection::NitriteId;
use nitrite_engine::doc;
use nitrite_engine::errors::FilterErrorKind;
use nitrite_engine::filter::field;
use nitrite_engine::index::{full_text_index, non_unique_index};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, run_test};
use std::collections::HashSet;

fn ids(cursor: nitrite_engine::common::DocumentCursor) -> HashSet<NitriteId> {
    cursor
        .filter_map(|document| document.ok().and_then(|d| d.existing_id()))
        .collect()
}

#[test]
fn test_text_search_terms_and_wildcards() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["body"], &full_text_index())?;
            let first = coll.insert(doc! { body: "a quick brown fox" })?.affected_nitrite_ids()[0];
            let second = coll.insert(doc! { body: "quick hello world" })?.affected_nitrite_ids()[0];

            assert_eq!(ids(coll.find(field("body").text("quick"))?), HashSet::from([first, second]));
            assert_eq!(ids(coll.find(field("body").text("*fox"))?), HashSet::from([first]));
            assert_eq!(ids(coll.find(field("body").text("hel*"))?), HashSet::from([second]));
            assert_eq!(ids(coll.find(field("body").text("*row*"))?), HashSet::from([first]));
            assert!(ids(coll.find(field("body").text("cat"))?).is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_text_search_is_case_insensitive_and_skips_stop_words() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["body"], &full_text_index())?;
            coll.insert(doc! { body: "The Quick Brown Fox" })?;

            assert_eq!(coll.find(field("body").text("QUICK"))?.size(), 1);
            assert_eq!(coll.find(field("body").text("the"))?.size(), 0);
            // any term of a multi word query matches
            assert_eq!(coll.find(field("body").text("lazy fox"))?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_text_search_requires_index() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert(doc! { body: "quick" })?;

            let err = coll.find(field("body").text("quick")).err();
            assert!(err.is_some_and(|e| e.is_filter(FilterErrorKind::FieldNotIndexedForTextSearch)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_wildcards_are_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["body"], &full_text_index())?;
            coll.insert(doc! { body: "quick" })?;

            let multi = coll.find(field("body").text("qu* fox")).err();
            assert!(multi.is_some_and(|e| e.is_filter(FilterErrorKind::MultiWordWildcard)));
            let bare = coll.find(field("body").text("*")).err();
            assert!(bare.is_some_and(|e| e.is_filter(FilterErrorKind::InvalidWildcard)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_text_with_comparable_filter() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["body"], &full_text_index())?;
            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.insert_many(vec![
                doc! { body: "quick fox", age: 10 },
                doc! { body: "quick dog", age: 20 },
                doc! { body: "slow dog", age: 20 },
            ])?;

            let mut cursor = coll.find(field("body").text("quick").and(field("age").eq(20)))?;
            let document = cursor.first().expect("one match")?;
            assert_eq!(document.get("body")?, "quick dog".into());
            assert_eq!(cursor.size(), 1);

            let either = coll.find(field("body").text("fox").or(field("age").eq(20)))?;
            assert_eq!(either.count(), 3);
            Ok(())
        },
        cleanup,
    )
}

use nitrite_engine::collection::{Document, NitriteCollection, NitriteId};
use nitrite_engine::common::Value;
use nitrite_engine::doc;
use nitrite_engine::errors::{FilterErrorKind, NitriteResult};
use nitrite_engine::filter::{all, and, by_id, field, or, Filter};
use nitrite_engine::index::{non_unique_index, unique_index};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};
use std::collections::BTreeSet;

fn ids(coll: &NitriteCollection, filter: Filter) -> NitriteResult<BTreeSet<NitriteId>> {
    coll.find(filter)?
        .map(|document| document.map(|d| d.existing_id().expect("stored id")))
        .collect()
}

fn names(documents: Vec<Document>) -> Vec<String> {
    documents
        .iter()
        .map(|d| d.get("name").ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default())
        .collect()
}

#[test]
fn test_range_query_agrees_across_plans() {
    run_test(
        create_test_context,
        |ctx| {
            let scanned = ctx.collection();
            let indexed = ctx.open("indexed")?;
            indexed.create_index(vec!["name"], &unique_index())?;
            indexed.create_index(vec!["age"], &non_unique_index())?;

            for coll in [&scanned, &indexed] {
                coll.insert(doc! { name: "a", age: 30 })?;
                coll.insert(doc! { name: "b", age: 25 })?;
            }

            let filter = || and(vec![field("age").gte(20), field("age").lt(35)]);
            let mut by_scan = scanned.find(filter())?;
            let mut by_index = indexed.find(filter())?;
            assert!(!by_scan.find_plan().uses_index());
            assert!(by_index.find_plan().uses_index());

            let from_scan: Vec<Document> = by_scan.by_ref().collect::<Result<_, _>>()?;
            let from_index: Vec<Document> = by_index.by_ref().collect::<Result<_, _>>()?;
            let mut scan_names = names(from_scan);
            let mut index_names = names(from_index);
            scan_names.sort();
            index_names.sort();
            assert_eq!(scan_names, vec!["a", "b"]);
            assert_eq!(scan_names, index_names);

            let narrow = and(vec![field("age").gte(26), field("age").lt(35)]);
            let hits: Vec<Document> = indexed.find(narrow)?.collect::<Result<_, _>>()?;
            assert_eq!(names(hits), vec!["a"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_or_over_indexes_is_a_union() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;

            let filter = or(vec![field("first_name").eq("fn1"), field("age").gt(26)]);
            let cursor = coll.find(filter.clone())?;
            assert_eq!(cursor.find_plan().sub_plans().len(), 2);
            // fn1 matches both operands but is returned once
            assert_eq!(cursor.count(), 2);

            // one operand without an index turns the whole query into a scan
            let mixed = or(vec![field("first_name").eq("fn1"), field("last_name").eq("ln2")]);
            let cursor = coll.find(mixed)?;
            assert!(cursor.find_plan().sub_plans().is_empty());
            assert!(!cursor.find_plan().uses_index());
            assert_eq!(cursor.count(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_id_lookup_uses_no_index() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let result = coll.insert_many(create_test_docs())?;
            let id = result.affected_nitrite_ids()[1];

            let mut cursor = coll.find(by_id(id))?;
            assert_eq!(cursor.find_plan().by_id(), Some(id));
            assert_eq!(cursor.first().expect("found")?.existing_id(), Some(id));

            // the second document is 25
            let combined = coll.find(by_id(id).and(field("age").eq(30)))?;
            assert_eq!(combined.count(), 0);
            assert!(coll.find(by_id(NitriteId::new()))?.next().is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_comparison_filters() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let ids_by_name: Vec<NitriteId> = coll
                .insert_many(create_test_docs())?
                .affected_nitrite_ids()
                .to_vec();
            let [first, second, third] = [ids_by_name[0], ids_by_name[1], ids_by_name[2]];

            assert_eq!(ids(&coll, all())?.len(), 3);
            assert_eq!(ids(&coll, field("age").ne(30))?, BTreeSet::from([second, third]));
            assert_eq!(ids(&coll, field("age").lte(30))?, BTreeSet::from([first, second]));
            assert_eq!(ids(&coll, field("age").in_array(vec![25, 41]))?, BTreeSet::from([second, third]));
            assert_eq!(ids(&coll, field("age").not_in_array(vec![25, 41]))?, BTreeSet::from([first]));
            assert_eq!(ids(&coll, field("first_name").regex("^fn[12]$"))?, BTreeSet::from([first, second]));
            assert_eq!(ids(&coll, field("age").gt(26).not())?, BTreeSet::from([second]));
            assert_eq!(ids(&coll, field("tags").eq("red"))?, BTreeSet::from([first, third]));
            assert!(ids(&coll, field("missing").eq(1))?.is_empty());
            assert_eq!(ids(&coll, field("missing").eq(Value::Null))?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_element_match() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let a = coll.insert(doc! { name: "a", scores: [{ subject: "math", score: 90 }, { subject: "art", score: 40 }] })?;
            coll.insert(doc! { name: "b", scores: [{ subject: "math", score: 50 }] })?;
            coll.insert(doc! { name: "c", scores: 95 })?;
            coll.insert(doc! { name: "d", marks: [3, 8, 12] })?;

            let nested = field("scores").elem_match(field("subject").eq("math").and(field("score").gt(80)));
            assert_eq!(ids(&coll, nested)?, BTreeSet::from([a.affected_nitrite_ids()[0]]));

            let scalar = coll.find(field("marks").elem_match(field("$").gt(10)))?;
            assert_eq!(scalar.count(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_incomparable_values_are_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            let bound = doc! { a: 1 };
            let result = coll
                .find(field("age").gt(bound))
                .and_then(|cursor| cursor.collect::<NitriteResult<Vec<Document>>>());
            let err = result.err();
            assert!(err.is_some_and(|e| e.is_filter(FilterErrorKind::NotComparable)));
            Ok(())
        },
        cleanup,
    )
}

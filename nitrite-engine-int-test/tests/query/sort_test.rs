use icu_collator::options::CollatorOptions;
use nitrite_engine::collection::{order_by, Document, FindOptions};
use nitrite_engine::common::{NullOrder, SortOrder, Value};
use nitrite_engine::doc;
use nitrite_engine::errors::NitriteResult;
use nitrite_engine::filter::{all, field};
use nitrite_engine::index::non_unique_index;
use nitrite_engine_int_test::test_util::{cleanup, create_random_docs, create_test_context, run_test};

fn column(documents: &[Document], name: &str) -> Vec<Value> {
    documents
        .iter()
        .map(|document| document.get(name).unwrap_or(Value::Null))
        .collect()
}

#[test]
fn test_index_order_matches_blocking_sort() {
    run_test(
        create_test_context,
        |ctx| {
            let scanned = ctx.collection();
            let indexed = ctx.open("sorted")?;
            indexed.create_index(vec!["age", "first_name"], &non_unique_index())?;

            let documents = create_random_docs(60);
            scanned.insert_many(documents.clone())?;
            indexed.insert_many(documents)?;

            for order in [SortOrder::Ascending, SortOrder::Descending] {
                let options = order_by("age", order)
                    .sort_by("first_name", SortOrder::Ascending)
                    .skip(5)
                    .limit(20);
                let filter = || field("age").gte(10);

                let mut from_index = indexed.find_with_options(filter(), &options)?;
                let mut from_scan = scanned.find_with_options(filter(), &options)?;
                assert_eq!(from_index.find_plan().index_sort_prefix().len(), 2);
                assert!(from_index.find_plan().blocking_sort_order().is_empty());
                assert_eq!(from_scan.find_plan().blocking_sort_order().len(), 2);

                let from_index: Vec<Document> = from_index.by_ref().collect::<NitriteResult<_>>()?;
                let from_scan: Vec<Document> = from_scan.by_ref().collect::<NitriteResult<_>>()?;
                assert_eq!(from_index.len(), 20);
                assert_eq!(column(&from_index, "age"), column(&from_scan, "age"));
                assert_eq!(column(&from_index, "first_name"), column(&from_scan, "first_name"));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_partial_sort_prefix() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.insert(doc! { age: 2, name: "b" })?;
            coll.insert(doc! { age: 1, name: "z" })?;
            coll.insert(doc! { age: 2, name: "a" })?;

            let options = order_by("age", SortOrder::Descending).sort_by("name", SortOrder::Ascending);
            let mut cursor = coll.find_with_options(field("age").gt(0), &options)?;
            assert_eq!(cursor.find_plan().index_sort_prefix().len(), 1);
            assert_eq!(cursor.find_plan().blocking_sort_order().len(), 1);

            let documents: Vec<Document> = cursor.by_ref().collect::<NitriteResult<_>>()?;
            assert_eq!(
                column(&documents, "name"),
                vec![Value::from("a"), Value::from("b"), Value::from("z")]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_null_order() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["rank"], &non_unique_index())?;
            coll.insert(doc! { name: "two", rank: 2 })?;
            coll.insert(doc! { name: "none" })?;
            coll.insert(doc! { name: "one", rank: 1 })?;

            let names = |options: FindOptions| -> NitriteResult<Vec<Value>> {
                let documents: Vec<Document> = coll.find_with_options(all(), &options)?.collect::<NitriteResult<_>>()?;
                Ok(column(&documents, "name"))
            };

            let first = names(order_by("rank", SortOrder::Ascending))?;
            assert_eq!(first, vec![Value::from("none"), Value::from("one"), Value::from("two")]);

            let last = names(order_by("rank", SortOrder::Ascending).null_order(NullOrder::Last))?;
            assert_eq!(last, vec![Value::from("one"), Value::from("two"), Value::from("none")]);

            let descending = names(order_by("rank", SortOrder::Descending))?;
            assert_eq!(descending, vec![Value::from("two"), Value::from("one"), Value::from("none")]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_collator_sort() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["fruit"], &non_unique_index())?;
            for fruit in ["cherry", "Banana", "apple"] {
                coll.insert(doc! { fruit: fruit })?;
            }

            let by_code_point: Vec<Document> = coll
                .find_with_options(all(), &order_by("fruit", SortOrder::Ascending))?
                .collect::<NitriteResult<_>>()?;
            assert_eq!(
                column(&by_code_point, "fruit"),
                vec![Value::from("Banana"), Value::from("apple"), Value::from("cherry")]
            );

            let options = order_by("fruit", SortOrder::Ascending).collator_options(CollatorOptions::default());
            let mut cursor = coll.find_with_options(all(), &options)?;
            assert!(cursor.find_plan().index_sort_prefix().is_empty());
            let collated: Vec<Document> = cursor.by_ref().collect::<NitriteResult<_>>()?;
            assert_eq!(
                column(&collated, "fruit"),
                vec![Value::from("apple"), Value::from("Banana"), Value::from("cherry")]
            );
            Ok(())
        },
        cleanup,
    )
}

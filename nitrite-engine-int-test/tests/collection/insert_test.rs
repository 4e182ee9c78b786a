use nitrite_engine::collection::Document;
use nitrite_engine::common::Value;
use nitrite_engine::doc;
use nitrite_engine::errors::{ErrorKind, IndexingErrorKind};
use nitrite_engine::filter::{all, field};
use nitrite_engine::index::{full_text_index, non_unique_index, unique_index};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};

#[test]
fn test_insert_assigns_ids_and_metadata() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let result = coll.insert_many(create_test_docs())?;
            assert_eq!(result.affected_count(), 3);
            assert_eq!(coll.size()?, 3);

            for id in result.affected_nitrite_ids() {
                let document = coll.get_by_id(id)?.expect("inserted document");
                assert_eq!(document.existing_id(), Some(*id));
                assert_eq!(document.revision(), 1);
                assert!(document.last_modified_since_epoch() > 0);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_violation_leaves_store_unchanged() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["name"], &unique_index())?;
            coll.insert(doc! { name: "a", age: 30 })?;
            coll.insert(doc! { name: "b", age: 25 })?;

            let err = coll.insert(doc! { name: "a", age: 40 }).err();
            assert!(err.is_some_and(|e| e.is_unique_violation()));

            let found: Vec<Document> = coll
                .find(field("name").eq("a"))?
                .collect::<Result<_, _>>()?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].get("age")?, Value::from(30));
            assert_eq!(coll.size()?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_batch_rolls_back_every_index() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["city"], &non_unique_index())?;
            coll.create_index(vec!["name"], &unique_index())?;
            coll.insert(doc! { name: "taken", city: "x" })?;

            let batch = vec![
                doc! { name: "n1", city: "y" },
                doc! { name: "n2", city: "y" },
                doc! { name: "taken", city: "y" },
            ];
            let err = coll.insert_many(batch).err();
            assert!(err.is_some_and(|e| e.is_unique_violation()));

            assert_eq!(coll.size()?, 1);
            assert_eq!(coll.find(field("city").eq("y"))?.size(), 0);
            assert_eq!(coll.find(field("name").eq("n1"))?.size(), 0);

            // keys freed by the rollback are usable again
            coll.insert(doc! { name: "n1", city: "y" })?;
            assert_eq!(coll.find(field("city").eq("y"))?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_id_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let mut document = doc! { name: "a" };
            document.id();
            coll.insert(document.clone())?;

            let err = coll.insert(document).err();
            assert!(err.is_some_and(|e| e.kind() == &ErrorKind::UniqueConstraintViolation));
            assert_eq!(coll.size()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_non_string_value_in_text_index_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["body"], &full_text_index())?;
            let err = coll.insert(doc! { body: 42 }).err();
            assert!(err.is_some_and(|e| e.is_indexing(IndexingErrorKind::NonStringValue)));
            assert_eq!(coll.find(all())?.size(), 0);
            Ok(())
        },
        cleanup,
    )
}

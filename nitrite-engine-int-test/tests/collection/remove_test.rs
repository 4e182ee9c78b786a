use nitrite_engine::doc;
use nitrite_engine::filter::{all, field};
use nitrite_engine::index::unique_index;
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};

#[test]
fn test_remove_by_filter() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.insert_many(create_test_docs())?;

            let result = coll.remove(field("last_name").eq("ln2"), false)?;
            assert_eq!(result.affected_count(), 2);
            assert_eq!(coll.size()?, 1);
            assert_eq!(coll.find(field("first_name").eq("fn2"))?.size(), 0);

            coll.insert(doc! { first_name: "fn2" })?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_just_once() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            assert_eq!(coll.remove(all(), true)?.affected_count(), 1);
            assert_eq!(coll.size()?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_document() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            let document = coll.find(field("first_name").eq("fn3"))?.first().expect("fn3")?;

            assert_eq!(coll.remove_document(&document)?.affected_count(), 1);
            assert_eq!(coll.remove_document(&document)?.affected_count(), 0);
            assert!(coll.remove_document(&doc! { first_name: "x" }).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_clear_keeps_index_definitions() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.insert_many(create_test_docs())?;
            coll.clear()?;

            assert_eq!(coll.size()?, 0);
            assert!(coll.has_index(vec!["first_name"])?);
            coll.insert_many(create_test_docs())?;
            assert_eq!(coll.find(field("first_name").eq("fn1"))?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

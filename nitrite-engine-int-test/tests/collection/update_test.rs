use nitrite_engine::collection::{insert_if_absent, just_once, NitriteId};
use nitrite_engine::common::Value;
use nitrite_engine::doc;
use nitrite_engine::filter::{all, field};
use nitrite_engine::index::{non_unique_index, unique_index};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};

#[test]
fn test_update_merges_and_reindexes() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["last_name"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;

            let result = coll.update(field("last_name").eq("ln2"), &doc! { last_name: "ln9", seen: true })?;
            assert_eq!(result.affected_count(), 2);
            assert_eq!(coll.find(field("last_name").eq("ln2"))?.size(), 0);

            let mut cursor = coll.find(field("last_name").eq("ln9"))?;
            assert!(cursor.find_plan().uses_index());
            for document in cursor.by_ref() {
                let document = document?;
                assert_eq!(document.get("seen")?, Value::from(true));
                assert_eq!(document.revision(), 2);
            }
            assert_eq!(cursor.size(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_just_once_and_upsert() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;

            let once = coll.update_with_options(all(), &doc! { flag: 1 }, &just_once())?;
            assert_eq!(once.affected_count(), 1);
            assert_eq!(coll.find(field("flag").eq(1))?.size(), 1);

            let upsert = coll.update_with_options(
                field("first_name").eq("fn9"),
                &doc! { first_name: "fn9" },
                &insert_if_absent(),
            )?;
            assert_eq!(upsert.affected_count(), 1);
            assert_eq!(coll.size()?, 4);

            let none = coll.update(field("first_name").eq("missing"), &doc! { flag: 2 })?;
            assert_eq!(none.affected_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_conflicting_update_restores_document() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.insert_many(create_test_docs())?;

            let err = coll.update(field("first_name").eq("fn2"), &doc! { first_name: "fn1" }).err();
            assert!(err.is_some_and(|e| e.is_unique_violation()));

            let mut original = coll.find(field("first_name").eq("fn2"))?;
            let document = original.first().expect("fn2 still present")?;
            assert_eq!(document.revision(), 1);
            assert_eq!(coll.find(field("first_name").eq("fn1"))?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_by_id() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let ids = coll.insert_many(create_test_docs())?;
            let id = ids.affected_nitrite_ids()[0];

            coll.update_by_id(&id, &doc! { age: 31 }, false)?;
            let document = coll.get_by_id(&id)?.expect("updated document");
            assert_eq!(document.get("age")?, Value::from(31));

            let fresh = NitriteId::new();
            assert_eq!(coll.update_by_id(&fresh, &doc! { age: 1 }, false)?.affected_count(), 0);
            assert_eq!(coll.update_by_id(&fresh, &doc! { age: 1 }, true)?.affected_count(), 1);
            assert!(coll.get_by_id(&fresh)?.is_some());
            Ok(())
        },
        cleanup,
    )
}

use nitrite_engine::common::Value;
use nitrite_engine::doc;
use nitrite_engine::errors::IndexingErrorKind;
use nitrite_engine::filter::field;
use nitrite_engine::index::{non_unique_index, unique_index, IndexKind};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};

#[test]
fn test_create_check_index() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name", "last_name"], &unique_index())?;

            assert!(coll.has_index(vec!["first_name", "last_name"])?);
            assert!(!coll.has_index(vec!["last_name", "first_name"])?);
            assert!(!coll.has_index(vec!["last_name"])?);

            coll.create_index(vec!["last_name"], &non_unique_index())?;
            assert!(coll.has_index(vec!["last_name"])?);

            let result = coll.insert_many(create_test_docs())?;
            assert_eq!(result.affected_count(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_built_over_existing_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            coll.create_index(vec!["last_name"], &non_unique_index())?;

            let mut cursor = coll.find(field("last_name").eq("ln2"))?;
            assert!(cursor.find_plan().uses_index());
            assert_eq!(cursor.size(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_index_over_duplicates_fails() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            let err = coll.create_index(vec!["last_name"], &unique_index()).err();
            assert!(err.is_some_and(|e| e.is_unique_violation()));

            // the unbuilt index is gone and writes go through
            assert!(!coll.has_index(vec!["last_name"])?);
            assert!(coll.list_indexes()?.is_empty());
            coll.insert(doc! { first_name: "zzz" })?;
            coll.insert(doc! { last_name: "ln2" })?;
            assert_eq!(coll.find(field("last_name").eq("ln2"))?.size(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_list_indexes() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            assert!(coll.list_indexes()?.is_empty());

            coll.create_index(vec!["first_name", "last_name"], &unique_index())?;
            coll.create_index(vec!["age"], &non_unique_index())?;
            let indexes = coll.list_indexes()?;
            assert_eq!(indexes.len(), 2);
            assert!(indexes
                .iter()
                .any(|index| index.index_kind() == IndexKind::NonUnique
                    && index.index_fields().field_names() == ["age"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_admin_errors() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["age"], &non_unique_index())?;

            let exists = coll.create_index(vec!["age"], &unique_index()).err();
            assert!(exists.is_some_and(|e| e.is_indexing(IndexingErrorKind::AlreadyExists)));

            let missing = coll.drop_index(vec!["name"]).err();
            assert!(missing.is_some_and(|e| e.is_indexing(IndexingErrorKind::NotIndexed)));

            let rebuild = coll.rebuild_index(vec!["name"], false).err();
            assert!(rebuild.is_some_and(|e| e.is_indexing(IndexingErrorKind::NotIndexed)));

            assert!(coll.create_index(vec![], &unique_index()).is_err());
            assert!(coll.create_index(vec![""], &unique_index()).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_index_falls_back_to_scan() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;
            assert!(coll.find(field("age").gt(26))?.find_plan().uses_index());

            coll.drop_index(vec!["age"])?;
            let mut cursor = coll.find(field("age").gt(26))?;
            assert!(!cursor.find_plan().uses_index());
            assert_eq!(cursor.size(), 2);

            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.drop_all_indexes()?;
            assert!(coll.list_indexes()?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rebuild_index_matches_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["age"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;
            coll.rebuild_index(vec!["age"], false)?;

            let ages: Vec<Value> = coll
                .find(field("age").gte(0))?
                .map(|document| document.and_then(|d| d.get("age")))
                .collect::<Result<_, _>>()?;
            assert_eq!(ages, vec![Value::from(25), Value::from(30), Value::from(41)]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compound_index_serves_prefix_queries() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["last_name", "age"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;

            let mut cursor = coll.find(field("last_name").eq("ln2").and(field("age").gt(30)))?;
            assert!(cursor.find_plan().uses_index());
            assert_eq!(cursor.find_plan().index_scan_filters().len(), 2);
            let document = cursor.first().expect("one match")?;
            assert_eq!(document.get("first_name")?, Value::from("fn3"));

            // no filter on the leading field: the index cannot be used
            let by_age = coll.find(field("age").gt(30))?;
            assert!(!by_age.find_plan().uses_index());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_multikey_index_on_array_field() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["tags"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;
            coll.insert(doc! { tags: [] })?;

            let mut red = coll.find(field("tags").eq("red"))?;
            assert!(red.find_plan().uses_index());
            assert_eq!(red.size(), 2);
            assert_eq!(coll.find(field("tags").in_array(vec!["green", "blue"]))?.size(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_created_through_one_handle_serves_every_handle() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let other = ctx.open("test")?;
            coll.create_index(vec!["last_name"], &unique_index())?;
            assert!(other.has_index(vec!["last_name"])?);

            other.insert(doc! { last_name: "ln7" })?;
            let err = coll.insert(doc! { last_name: "ln7" }).err();
            assert!(err.is_some_and(|e| e.is_unique_violation()));

            let mut cursor = coll.find(field("last_name").eq("ln7"))?;
            assert!(cursor.find_plan().uses_index());
            assert_eq!(cursor.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compound_index_files_empty_array_under_null() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name", "tags"], &non_unique_index())?;
            coll.insert_many(create_test_docs())?;
            coll.insert(doc! { first_name: "fn9", tags: [] })?;

            let mut by_name = coll.find(field("first_name").eq("fn9"))?;
            assert!(by_name.find_plan().uses_index());
            assert_eq!(by_name.size(), 1);

            let no_tags = field("first_name").eq("fn9").and(field("tags").eq(Value::Null));
            assert_eq!(coll.find(no_tags)?.size(), 1);
            let not_red = field("first_name").eq("fn9").and(field("tags").ne("red"));
            assert_eq!(coll.find(not_red)?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

use nitrite_engine::collection::{CollectionEventInfo, CollectionEventListener, CollectionEvents};
use nitrite_engine::common::Value;
use nitrite_engine::doc;
use nitrite_engine::errors::{ErrorKind, NitriteError};
use nitrite_engine::filter::{all, field};
use nitrite_engine::index::{unique_index, IndexKind};
use nitrite_engine_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};
use parking_lot::Mutex;
use std::sync::Arc;

fn recorder() -> (CollectionEventListener, Arc<Mutex<Vec<CollectionEventInfo>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let listener = CollectionEventListener::new(move |event| {
        sink.lock().push(event);
        Ok(())
    });
    (listener, events)
}

fn types(events: &Mutex<Vec<CollectionEventInfo>>) -> Vec<CollectionEvents> {
    events.lock().iter().map(CollectionEventInfo::event_type).collect()
}

#[test]
fn test_document_events() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let (listener, events) = recorder();
            coll.subscribe(listener)?;

            coll.insert_many(create_test_docs())?;
            coll.update(field("first_name").eq("fn2"), &doc! { age: 26 })?;
            coll.remove(field("first_name").eq("fn3"), false)?;

            assert_eq!(
                types(&events),
                vec![
                    CollectionEvents::Insert,
                    CollectionEvents::Insert,
                    CollectionEvents::Insert,
                    CollectionEvents::Update,
                    CollectionEvents::Remove,
                ]
            );

            let recorded = events.lock();
            assert!(recorded.iter().all(|event| event.origin() == "test"));

            let updated = recorded[3].item().expect("updated document");
            assert_eq!(updated.get("age")?, Value::from(26));
            assert_eq!(updated.revision(), 2);

            let removed = recorded[4].item().expect("removed document");
            assert_eq!(removed.get("first_name")?, Value::from("fn3"));
            assert!(removed.has_id());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_write_raises_no_event() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.insert_many(create_test_docs())?;

            let (listener, events) = recorder();
            coll.subscribe(listener)?;
            assert!(coll.insert(doc! { first_name: "fn1" }).is_err());
            assert!(coll.update(field("first_name").eq("fn2"), &doc! { first_name: "fn1" }).is_err());
            assert!(events.lock().is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_events() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_test_docs())?;
            let (listener, events) = recorder();
            coll.subscribe(listener)?;

            coll.create_index(vec!["first_name"], &unique_index())?;
            coll.rebuild_index(vec!["first_name"], false)?;

            assert_eq!(
                types(&events),
                vec![
                    CollectionEvents::IndexStart,
                    CollectionEvents::IndexEnd,
                    CollectionEvents::IndexStart,
                    CollectionEvents::IndexEnd,
                ]
            );
            let recorded = events.lock();
            let item = recorded[0].item().expect("index description");
            assert_eq!(item.get("fields")?, Value::from_vec(vec!["first_name".to_string()]));
            assert_eq!(item.get("kind")?, Value::from(IndexKind::Unique.as_str()));
            assert_eq!(recorded[0].origin(), "test");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let (listener, events) = recorder();
            let subscriber = coll.subscribe(listener)?;

            coll.insert(doc! { a: 1 })?;
            coll.unsubscribe(subscriber)?;
            coll.insert(doc! { a: 2 })?;
            coll.remove(all(), false)?;

            assert_eq!(types(&events), vec![CollectionEvents::Insert]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_listener_failure_keeps_the_write() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.subscribe(CollectionEventListener::new(|_| {
                Err(NitriteError::new("listener broke", ErrorKind::EventError))
            }))?;
            let (listener, events) = recorder();
            coll.subscribe(listener)?;

            let result = coll.insert(doc! { a: 1 })?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(coll.size()?, 1);
            assert_eq!(coll.find(field("a").eq(1))?.count(), 1);
            // listener order is unspecified, the second may not run
            assert!(events.lock().len() <= 1);
            Ok(())
        },
        cleanup,
    )
}

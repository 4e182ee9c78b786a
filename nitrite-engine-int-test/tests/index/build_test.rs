use nitrite_engine::collection::{CollectionEventListener, CollectionEvents, NitriteCollection};
use nitrite_engine::errors::{IndexingErrorKind, NitriteResult};
use nitrite_engine::filter::field;
use nitrite_engine::index::{full_text_index, non_unique_index};
use nitrite_engine_int_test::test_util::{cleanup, create_random_docs, create_test_context, run_test};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Tracks how many builds run at once, from the index events.
#[derive(Default)]
struct BuildCounter {
    active: AtomicI64,
    peak: AtomicI64,
    started: AtomicUsize,
}

fn watch_builds(coll: &NitriteCollection) -> NitriteResult<Arc<BuildCounter>> {
    let counter = Arc::new(BuildCounter::default());
    let sink = counter.clone();
    coll.subscribe(CollectionEventListener::new(move |event| {
        match event.event_type() {
            CollectionEvents::IndexStart => {
                sink.started.fetch_add(1, Ordering::SeqCst);
                let now = sink.active.fetch_add(1, Ordering::SeqCst) + 1;
                sink.peak.fetch_max(now, Ordering::SeqCst);
            }
            CollectionEvents::IndexEnd => {
                sink.active.fetch_sub(1, Ordering::SeqCst);
            }
            _ => {}
        }
        Ok(())
    }))?;
    Ok(counter)
}

#[test]
fn test_async_build_finishes_in_background() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_random_docs(2000))?;
            let expected = coll.find(field("age").eq(7))?.size();
            coll.create_index(vec!["age"], &non_unique_index().build_async(true))?;
            assert!(coll.has_index(vec!["age"])?);

            let waiting = coll.clone();
            awaitility::at_most(Duration::from_secs(10))
                .until(move || !waiting.is_indexing(vec!["age"]).unwrap_or(true));

            let mut cursor = coll.find(field("age").eq(7))?;
            assert!(cursor.find_plan().uses_index());
            assert_eq!(cursor.size(), expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_queries_during_async_build_stay_correct() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_random_docs(3000))?;
            let expected = coll.find(field("age").gte(40))?.size();

            coll.create_index(vec!["age"], &non_unique_index().build_async(true))?;
            // either the finished index or a collection scan answers
            assert_eq!(coll.find(field("age").gte(40))?.size(), expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_text_query_waits_for_async_build() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let docs = (0..1500)
                .map(|i| {
                    let body = format!("entry number {} of the quick batch", i);
                    nitrite_engine::doc! { body: body }
                })
                .collect();
            coll.insert_many(docs)?;

            coll.create_index(vec!["body"], &full_text_index().build_async(true))?;
            assert_eq!(coll.find(field("body").text("quick"))?.size(), 1500);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_builds_are_serialized() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_random_docs(2000))?;
            let counter = watch_builds(&coll)?;

            const THREADS: usize = 8;
            let barrier = Arc::new(Barrier::new(THREADS));
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let coll = coll.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        coll.create_index(vec!["last_name"], &non_unique_index())
                    })
                })
                .collect();

            let mut succeeded = 0;
            for handle in handles {
                match handle.join().expect("builder thread") {
                    Ok(()) => succeeded += 1,
                    Err(e) => assert!(
                        e.is_indexing(IndexingErrorKind::BuildInProgress)
                            || e.is_indexing(IndexingErrorKind::AlreadyExists)
                    ),
                }
            }

            assert_eq!(succeeded, 1);
            assert_eq!(counter.started.load(Ordering::SeqCst), 1);
            assert_eq!(counter.peak.load(Ordering::SeqCst), 1);
            assert_eq!(counter.active.load(Ordering::SeqCst), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_rebuilds_never_overlap() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            coll.insert_many(create_random_docs(2000))?;
            coll.create_index(vec!["city"], &non_unique_index())?;
            let counter = watch_builds(&coll)?;

            const THREADS: usize = 6;
            let barrier = Arc::new(Barrier::new(THREADS));
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let coll = coll.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        coll.rebuild_index(vec!["city"], false)
                    })
                })
                .collect();

            let mut succeeded = 0;
            for handle in handles {
                match handle.join().expect("rebuild thread") {
                    Ok(()) => succeeded += 1,
                    Err(e) => assert!(e.is_indexing(IndexingErrorKind::BuildInProgress)),
                }
            }

            assert!(succeeded >= 1);
            assert_eq!(counter.started.load(Ordering::SeqCst), succeeded);
            assert_eq!(counter.peak.load(Ordering::SeqCst), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_created_during_inserts_sees_every_document() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.collection();
            let other = ctx.open("test")?;
            let start = Arc::new(Barrier::new(2));

            let gate = start.clone();
            let writer = thread::spawn(move || -> NitriteResult<()> {
                gate.wait();
                for i in 0..500 {
                    let age = i % 10;
                    other.insert(nitrite_engine::doc! { age: age })?;
                }
                Ok(())
            });

            start.wait();
            coll.create_index(vec!["age"], &non_unique_index())?;
            writer.join().expect("writer thread panicked")?;

            assert_eq!(coll.list_indexes()?.len(), 1);
            for age in 0..10 {
                let mut cursor = coll.find(field("age").eq(age))?;
                assert!(cursor.find_plan().uses_index());
                assert_eq!(cursor.size(), 50);
            }
            Ok(())
        },
        cleanup,
    )
}

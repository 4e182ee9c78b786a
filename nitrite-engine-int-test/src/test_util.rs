use fake::faker::address::en::CityName;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use nitrite_engine::collection::{Document, NitriteCollection};
use nitrite_engine::doc;
use nitrite_engine::errors::NitriteResult;
use nitrite_engine::nitrite_config::NitriteConfig;
use std::backtrace::Backtrace;
use std::thread;
use std::time::{Duration, Instant};

/// Runs `test` between `before` and `after`, retrying a failed attempt up to
/// three times. `after` runs even when the test fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> NitriteResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> NitriteResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> NitriteResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            let ctx = before().map_err(|e| (format!("Before run failed: {:?}", e), backtrace.to_string()))?;
            match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            }
        });

        let elapsed = start_time.elapsed();
        let message = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                if !bt.is_empty() && !bt.contains("disabled") {
                    eprintln!("Backtrace:\n{}", bt);
                }
                e
            }
            Err(panic_err) => {
                if let Some(s) = panic_err.downcast_ref::<&str>() {
                    format!("Panic: {}", s)
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    format!("Panic: {}", s)
                } else {
                    "Panic: unknown payload".to_string()
                }
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", message);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(message);
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    config: NitriteConfig,
    collection: NitriteCollection,
}

impl TestContext {
    pub fn new(config: NitriteConfig, collection: NitriteCollection) -> Self {
        Self { config, collection }
    }

    pub fn config(&self) -> NitriteConfig {
        self.config.clone()
    }

    pub fn collection(&self) -> NitriteCollection {
        self.collection.clone()
    }

    /// Another collection in the same store.
    pub fn open(&self, name: &str) -> NitriteResult<NitriteCollection> {
        NitriteCollection::open(name, &self.config)
    }
}

/// A fresh in-memory store with an empty collection named `test`.
pub fn create_test_context() -> NitriteResult<TestContext> {
    let config = NitriteConfig::new();
    let collection = NitriteCollection::open("test", &config)?;
    Ok(TestContext::new(config, collection))
}

pub fn cleanup(ctx: TestContext) -> NitriteResult<()> {
    ctx.collection().close()?;
    ctx.config().close()
}

/// Three fixed people with distinct names, ages and tags.
pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            first_name: "fn1",
            last_name: "ln1",
            age: 30,
            tags: ["red", "blue"],
            body: "a quick brown fox",
        },
        doc! {
            first_name: "fn2",
            last_name: "ln2",
            age: 25,
            tags: ["green"],
            body: "quick hello world",
        },
        doc! {
            first_name: "fn3",
            last_name: "ln2",
            age: 41,
            tags: ["red"],
            body: "lazy dogs sleep",
        },
    ]
}

/// `count` generated people; ages repeat so sorts see ties.
pub fn create_random_docs(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let city: String = CityName().fake();
            let age = ((i * 7) % 50) as i64;
            doc! {
                first_name: first_name,
                last_name: last_name,
                city: city,
                age: age,
            }
        })
        .collect()
}

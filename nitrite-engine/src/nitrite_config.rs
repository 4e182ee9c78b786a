//! Engine configuration.

use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::collection::collection_factory::CollectionFactory;
use crate::common::{LockRegistry, DEFAULT_PLAN_CACHE_CAPACITY};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::index::text::Tokenizer;
use crate::index::{ComparableIndexer, IndexKind, NitriteIndexer, TextIndexer};
use crate::store::memory::InMemoryStore;
use crate::store::NitriteStore;

/// Shared settings and services used by collections.
///
/// A configuration may be changed until [`initialize`](Self::initialize) is
/// called; afterwards every setter fails with `InvalidOperation`. Clones
/// share the same state.
///
/// # Examples
///
/// ```rust,ignore
/// use nitrite_engine::nitrite_config::NitriteConfig;
///
/// let config = NitriteConfig::new();
/// config.set_worker_width(4)?;
/// config.initialize()?;
/// ```
#[derive(Clone)]
pub struct NitriteConfig {
    inner: Arc<NitriteConfigInner>,
}

impl Default for NitriteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NitriteConfig {
    /// Creates a configuration with an in-memory store, the English
    /// tokenizer and one worker per available core.
    pub fn new() -> Self {
        NitriteConfig {
            inner: Arc::new(NitriteConfigInner::new()),
        }
    }

    pub fn nitrite_store(&self) -> NitriteResult<NitriteStore> {
        self.inner.nitrite_store()
    }

    /// Replaces the store. Only valid before initialization.
    pub fn set_nitrite_store(&self, store: NitriteStore) -> NitriteResult<()> {
        self.inner.check_not_configured("store")?;
        *self.inner.store.write() = store;
        Ok(())
    }

    pub fn tokenizer(&self) -> Tokenizer {
        self.inner.tokenizer.read().clone()
    }

    pub fn set_tokenizer(&self, tokenizer: Tokenizer) -> NitriteResult<()> {
        self.inner.check_not_configured("tokenizer")?;
        *self.inner.tokenizer.write() = tokenizer;
        Ok(())
    }

    /// Maximum number of worker threads used for parallel index drops and
    /// union plans.
    pub fn worker_width(&self) -> usize {
        self.inner.worker_width.load(Ordering::Relaxed)
    }

    pub fn set_worker_width(&self, width: usize) -> NitriteResult<()> {
        self.inner.check_not_configured("worker width")?;
        if width == 0 {
            log::error!("Worker width must be positive");
            return Err(NitriteError::new(
                "Worker width must be positive",
                ErrorKind::ValidationError,
            ));
        }
        self.inner.worker_width.store(width, Ordering::Relaxed);
        Ok(())
    }

    pub fn plan_cache_capacity(&self) -> usize {
        self.inner.plan_cache_capacity.load(Ordering::Relaxed)
    }

    pub fn set_plan_cache_capacity(&self, capacity: usize) -> NitriteResult<()> {
        self.inner.check_not_configured("plan cache capacity")?;
        if capacity == 0 {
            log::error!("Plan cache capacity must be positive");
            return Err(NitriteError::new(
                "Plan cache capacity must be positive",
                ErrorKind::ValidationError,
            ));
        }
        self.inner.plan_cache_capacity.store(capacity, Ordering::Relaxed);
        Ok(())
    }

    /// Per-index locks, keyed by index map name.
    pub fn lock_registry(&self) -> LockRegistry {
        self.inner.lock_registry.clone()
    }

    /// The indexer serving `index_kind`.
    pub fn find_indexer(&self, index_kind: IndexKind) -> NitriteResult<NitriteIndexer> {
        self.inner.check_opened()?;
        Ok(match index_kind {
            IndexKind::Unique => self.inner.unique_indexer.clone(),
            IndexKind::NonUnique => self.inner.non_unique_indexer.clone(),
            IndexKind::FullText => self.inner.text_indexer.clone(),
        })
    }

    /// Freezes the configuration. Calling it again has no effect.
    pub fn initialize(&self) -> NitriteResult<()> {
        self.inner.check_opened()?;
        if !self.inner.configured.swap(true, Ordering::AcqRel) {
            log::debug!(
                "Configuration initialized with worker width {} and plan cache capacity {}",
                self.worker_width(),
                self.plan_cache_capacity()
            );
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.configured.load(Ordering::Acquire)
    }

    /// Open collections of this configuration.
    pub(crate) fn collection_factory(&self) -> &CollectionFactory {
        &self.inner.collection_factory
    }

    /// Closes every open collection, then the store. Later store access
    /// fails with `StoreAlreadyClosed`.
    pub fn close(&self) -> NitriteResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.collection_factory.clear()?;
        let store = self.inner.store.read().clone();
        if store.is_closed() {
            return Ok(());
        }
        store.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

struct NitriteConfigInner {
    configured: AtomicBool,
    closed: AtomicBool,
    store: RwLock<NitriteStore>,
    tokenizer: RwLock<Tokenizer>,
    worker_width: AtomicUsize,
    plan_cache_capacity: AtomicUsize,
    lock_registry: LockRegistry,
    collection_factory: CollectionFactory,
    unique_indexer: NitriteIndexer,
    non_unique_indexer: NitriteIndexer,
    text_indexer: NitriteIndexer,
}

impl NitriteConfigInner {
    fn new() -> Self {
        let worker_width = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        NitriteConfigInner {
            configured: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            store: RwLock::new(NitriteStore::new(InMemoryStore::new())),
            tokenizer: RwLock::new(Tokenizer::default()),
            worker_width: AtomicUsize::new(worker_width),
            plan_cache_capacity: AtomicUsize::new(DEFAULT_PLAN_CACHE_CAPACITY),
            lock_registry: LockRegistry::new(),
            collection_factory: CollectionFactory::new(),
            unique_indexer: NitriteIndexer::new(ComparableIndexer::unique()),
            non_unique_indexer: NitriteIndexer::new(ComparableIndexer::non_unique()),
            text_indexer: NitriteIndexer::new(TextIndexer::new()),
        }
    }

    fn nitrite_store(&self) -> NitriteResult<NitriteStore> {
        self.check_opened()?;
        Ok(self.store.read().clone())
    }

    fn check_opened(&self) -> NitriteResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Configuration is already closed");
            return Err(NitriteError::new(
                "Configuration is already closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn check_not_configured(&self, setting: &str) -> NitriteResult<()> {
        if self.configured.load(Ordering::Acquire) {
            log::error!("The {} cannot be changed after initialization", setting);
            return Err(NitriteError::new(
                &format!("The {} cannot be changed after initialization", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

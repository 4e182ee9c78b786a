use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::IndexManager;
use crate::collection::{CollectionEventInfo, CollectionEventListener, CollectionEvents, Document};
use crate::common::{async_task, run_bounded, FieldValues, Fields, NitriteEventBus, Value};
use crate::errors::{ErrorKind, IndexingErrorKind, NitriteError, NitriteResult};
use crate::index::{IndexDescriptor, IndexKind, NitriteIndexer};
use crate::nitrite_config::NitriteConfig;
use crate::store::NitriteMap;

/// Running state of builds for one field set.
///
/// `running` is claimed by compare-and-swap, so of several racing build
/// requests exactly one wins and the rest fail fast. Waiters block on
/// `done` until the winner releases the flag.
#[derive(Default)]
struct BuildFlag {
    running: AtomicBool,
    lock: Mutex<()>,
    done: Condvar,
}

impl BuildFlag {
    fn try_claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        let _guard = self.lock.lock();
        self.running.store(false, Ordering::Release);
        self.done.notify_all();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn wait(&self) {
        let mut guard = self.lock.lock();
        while self.is_running() {
            self.done.wait(&mut guard);
        }
    }
}

/// A won build flag, released when dropped.
struct BuildClaim {
    flag: Arc<BuildFlag>,
}

impl Drop for BuildClaim {
    fn drop(&mut self) {
        self.flag.release();
    }
}

/// Creates, builds, rebuilds and drops the indexes of one collection.
///
/// At most one build runs per field set at any time. A build marks the index
/// dirty before scanning documents and clean only after the scan succeeds,
/// so an interrupted build leaves a dirty index behind for the next reader
/// or writer to rebuild.
#[derive(Clone)]
pub(crate) struct IndexOperations {
    inner: Arc<IndexOperationsInner>,
}

struct IndexOperationsInner {
    collection_name: String,
    nitrite_config: NitriteConfig,
    nitrite_map: NitriteMap,
    index_manager: IndexManager,
    event_bus: NitriteEventBus<CollectionEventInfo, CollectionEventListener>,
    build_flags: DashMap<Fields, Arc<BuildFlag>>,
}

impl IndexOperations {
    pub(crate) fn new(
        collection_name: &str,
        nitrite_config: NitriteConfig,
        nitrite_map: NitriteMap,
        event_bus: NitriteEventBus<CollectionEventInfo, CollectionEventListener>,
    ) -> NitriteResult<Self> {
        let index_manager = IndexManager::new(collection_name, nitrite_config.clone())?;
        Ok(IndexOperations {
            inner: Arc::new(IndexOperationsInner {
                collection_name: collection_name.to_string(),
                nitrite_config,
                nitrite_map,
                index_manager,
                event_bus,
                build_flags: DashMap::new(),
            }),
        })
    }

    pub(crate) fn index_manager(&self) -> &IndexManager {
        &self.inner.index_manager
    }

    /// Records a new index and builds it, on this thread or on a background
    /// thread when `is_async` is set.
    pub(crate) fn create_index(
        &self,
        fields: &Fields,
        index_kind: IndexKind,
        is_async: bool,
    ) -> NitriteResult<()> {
        let claim = self.inner.claim(fields)?;
        let index_descriptor = self
            .inner
            .index_manager
            .create_index_descriptor(fields, index_kind)?;
        self.run_build(index_descriptor, false, claim, is_async)
    }

    /// Clears the index and builds it again from every document.
    pub(crate) fn rebuild_index(&self, fields: &Fields, is_async: bool) -> NitriteResult<()> {
        let claim = self.inner.claim(fields)?;
        let index_descriptor = self.inner.existing_index(fields)?;
        self.run_build(index_descriptor, true, claim, is_async)
    }

    /// Rebuilds the index inline when it is dirty and no build is running.
    /// Returns whether the index is clean afterwards.
    pub(crate) fn rebuild_if_dirty(&self, index_descriptor: &IndexDescriptor) -> NitriteResult<bool> {
        let fields = index_descriptor.index_fields();
        if !self.inner.index_manager.is_dirty_index(fields)? {
            return Ok(true);
        }

        let flag = self.inner.build_flag(fields);
        if !flag.try_claim() {
            return Ok(false);
        }
        let _claim = BuildClaim { flag };
        log::debug!("Rebuilding dirty index {}", index_descriptor);
        self.inner.build(index_descriptor, true)?;
        Ok(true)
    }

    /// Blocks until no build runs on the index, then rebuilds it if it is
    /// still dirty. Used by reads that cannot fall back to a collection scan.
    pub(crate) fn await_clean_index(&self, index_descriptor: &IndexDescriptor) -> NitriteResult<()> {
        let fields = index_descriptor.index_fields();
        loop {
            self.inner.build_flag(fields).wait();
            if self.rebuild_if_dirty(index_descriptor)? {
                return Ok(());
            }
        }
    }

    pub(crate) fn drop_index(&self, fields: &Fields) -> NitriteResult<()> {
        self.inner.drop_index(fields)
    }

    /// Drops every index concurrently. Fails without dropping anything if any
    /// build is running; otherwise every individual failure is reported in
    /// one aggregated error.
    pub(crate) fn drop_all_indexes(&self) -> NitriteResult<()> {
        self.inner.check_no_build("drop all indexes")?;

        let descriptors = self.inner.index_manager.get_index_descriptors()?;
        let width = self.inner.nitrite_config.worker_width();
        let errors: Vec<NitriteError> = run_bounded(descriptors, width, |descriptor| {
            self.inner.drop_index(descriptor.index_fields())
        })
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            return Ok(());
        }

        log::error!(
            "Failed to drop {} indexes of {}",
            errors.len(),
            self.inner.collection_name
        );
        let kind = errors[0].kind().clone();
        Err(NitriteError::aggregate(
            &format!("Failed to drop {} indexes", errors.len()),
            kind,
            errors,
        ))
    }

    /// Removes all entries from every index, keeping the indexes.
    pub(crate) fn clear(&self) -> NitriteResult<()> {
        self.inner.check_no_build("clear indexes")?;
        for descriptor in self.inner.index_manager.get_index_descriptors()? {
            self.inner
                .indexer(&descriptor)?
                .clear_index(&descriptor, &self.inner.nitrite_config)?;
        }
        Ok(())
    }

    pub(crate) fn is_indexing(&self, fields: &Fields) -> NitriteResult<bool> {
        Ok(self.inner.index_manager.has_index_descriptor(fields)?
            && self
                .inner
                .build_flags
                .get(fields)
                .is_some_and(|flag| flag.is_running()))
    }

    pub(crate) fn has_index(&self, fields: &Fields) -> NitriteResult<bool> {
        self.inner.index_manager.has_index_descriptor(fields)
    }

    pub(crate) fn list_indexes(&self) -> NitriteResult<Vec<IndexDescriptor>> {
        self.inner.index_manager.get_index_descriptors()
    }

    /// True when the index is dirty and no build is running on it.
    pub(crate) fn should_rebuild(&self, fields: &Fields) -> NitriteResult<bool> {
        Ok(self.inner.index_manager.is_dirty_index(fields)?
            && !self
                .inner
                .build_flags
                .get(fields)
                .is_some_and(|flag| flag.is_running()))
    }

    pub(crate) fn close(&self) -> NitriteResult<()> {
        self.inner.index_manager.close()
    }

    fn run_build(
        &self,
        index_descriptor: IndexDescriptor,
        rebuild: bool,
        claim: BuildClaim,
        is_async: bool,
    ) -> NitriteResult<()> {
        if !is_async {
            let result = self.inner.build_or_discard(&index_descriptor, rebuild);
            drop(claim);
            return result;
        }

        let operations = self.clone();
        async_task(move || {
            if let Err(e) = operations.inner.build_or_discard(&index_descriptor, rebuild) {
                log::error!("Background build of {} failed: {}", index_descriptor, e);
            }
            drop(claim);
        });
        Ok(())
    }
}

impl IndexOperationsInner {
    fn build_flag(&self, fields: &Fields) -> Arc<BuildFlag> {
        self.build_flags
            .entry(fields.clone())
            .or_insert_with(|| Arc::new(BuildFlag::default()))
            .value()
            .clone()
    }

    fn claim(&self, fields: &Fields) -> NitriteResult<BuildClaim> {
        let flag = self.build_flag(fields);
        if flag.try_claim() {
            return Ok(BuildClaim { flag });
        }

        log::error!("Index build already running on {} in {}", fields, self.collection_name);
        Err(NitriteError::new(
            &format!("Index build already running on fields {}", fields),
            ErrorKind::IndexingError(IndexingErrorKind::BuildInProgress),
        ))
    }

    fn check_no_build(&self, operation: &str) -> NitriteResult<()> {
        if self.build_flags.iter().any(|flag| flag.value().is_running()) {
            log::error!("Cannot {} of {} while an index is building", operation, self.collection_name);
            return Err(NitriteError::new(
                &format!("Cannot {} while an index is building", operation),
                ErrorKind::IndexingError(IndexingErrorKind::CannotDropWhileBuilding),
            ));
        }
        Ok(())
    }

    fn existing_index(&self, fields: &Fields) -> NitriteResult<IndexDescriptor> {
        match self.index_manager.find_exact_index(fields)? {
            Some(index_descriptor) => Ok(index_descriptor),
            None => {
                log::error!("No index on {} in {}", fields, self.collection_name);
                Err(NitriteError::new(
                    &format!("No index found on fields {}", fields),
                    ErrorKind::IndexingError(IndexingErrorKind::NotIndexed),
                ))
            }
        }
    }

    fn indexer(&self, index_descriptor: &IndexDescriptor) -> NitriteResult<NitriteIndexer> {
        self.nitrite_config.find_indexer(index_descriptor.index_kind())
    }

    fn drop_index(&self, fields: &Fields) -> NitriteResult<()> {
        let flag = self.build_flag(fields);
        if !flag.try_claim() {
            log::error!("Cannot drop index on {} while it is building", fields);
            return Err(NitriteError::new(
                &format!("Cannot drop index on fields {} while it is building", fields),
                ErrorKind::IndexingError(IndexingErrorKind::CannotDropWhileBuilding),
            ));
        }
        let _claim = BuildClaim { flag };

        let index_descriptor = self.existing_index(fields)?;
        self.discard(&index_descriptor)
    }

    /// Removes the index map and its descriptor. The caller holds the build flag.
    fn discard(&self, index_descriptor: &IndexDescriptor) -> NitriteResult<()> {
        self.indexer(index_descriptor)?
            .drop_index(index_descriptor, &self.nitrite_config)?;
        self.index_manager
            .drop_index_descriptor(index_descriptor.index_fields())
    }

    /// Builds the index. A failed first build removes the index again, so a
    /// collection never keeps an index that was never complete.
    fn build_or_discard(&self, index_descriptor: &IndexDescriptor, rebuild: bool) -> NitriteResult<()> {
        let result = self.build(index_descriptor, rebuild);
        if result.is_err() && !rebuild {
            if let Err(e) = self.discard(index_descriptor) {
                log::error!("Failed to remove unbuilt index {}: {}", index_descriptor, e);
            }
        }
        result
    }

    /// Runs one build. The caller holds the build flag.
    fn build(&self, index_descriptor: &IndexDescriptor, rebuild: bool) -> NitriteResult<()> {
        self.alert(CollectionEvents::IndexStart, index_descriptor);
        log::debug!("Index build started for {} (rebuild: {})", index_descriptor, rebuild);

        let result = self.scan_documents(index_descriptor, rebuild);
        match &result {
            Ok(_) => log::debug!("Index build finished for {}", index_descriptor),
            Err(e) => log::error!("Index build failed for {}: {}", index_descriptor, e),
        }

        self.alert(CollectionEvents::IndexEnd, index_descriptor);
        result
    }

    fn scan_documents(&self, index_descriptor: &IndexDescriptor, rebuild: bool) -> NitriteResult<()> {
        let fields = index_descriptor.index_fields();
        self.index_manager.mark_build_start(fields)?;

        let indexer = self.indexer(index_descriptor)?;
        if rebuild {
            indexer.clear_index(index_descriptor, &self.nitrite_config)?;
        }

        for entry in self.nitrite_map.entries()? {
            let (key, _) = entry?;
            let Some(nitrite_id) = key.as_nitrite_id().copied() else {
                continue;
            };

            // re-read under the index lock, the scanned copy may be stale
            let read_values = || -> NitriteResult<Option<FieldValues>> {
                match self.nitrite_map.get(&key)? {
                    Some(Value::Document(document)) => {
                        FieldValues::from_document(nitrite_id, &document, fields).map(Some)
                    }
                    _ => Ok(None),
                }
            };
            indexer.write_current_entry(&read_values, index_descriptor, &self.nitrite_config)?;
        }

        self.index_manager.mark_build_end(fields)
    }

    fn alert(&self, event_type: CollectionEvents, index_descriptor: &IndexDescriptor) {
        let mut item = Document::new();
        item.put_system("fields", index_descriptor.index_fields().to_value());
        item.put_system("kind", Value::from(index_descriptor.index_kind().as_str()));

        let event = CollectionEventInfo::new(Some(item), event_type, &self.collection_name);
        if let Err(e) = self.event_bus.publish(event) {
            log::warn!("Index event listener failed: {}", e);
        }
    }
}

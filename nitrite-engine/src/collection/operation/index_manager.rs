use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::common::{
    atomic, derive_index_map_name, derive_index_meta_map_name, Atomic, Fields, ReadExecutor,
    WriteExecutor,
};
use crate::errors::{ErrorKind, IndexingErrorKind, NitriteError, NitriteResult};
use crate::index::{IndexDescriptor, IndexKind, IndexMeta};
use crate::nitrite_config::NitriteConfig;
use crate::store::{NitriteMap, NitriteStore};

/// Catalog of a collection's indexes.
///
/// Each index has one [`IndexMeta`] record in the map
/// `$nitrite_index_meta|<collection>`, keyed by its fields. The descriptor
/// list is cached and the cache is dropped on every create or drop; the
/// catalog version increases at the same time so cached query plans can
/// tell they are stale.
#[derive(Clone)]
pub(crate) struct IndexManager {
    inner: Arc<IndexManagerInner>,
}

struct IndexManagerInner {
    nitrite_config: NitriteConfig,
    store: NitriteStore,
    collection_name: String,
    index_meta_map: NitriteMap,
    index_descriptor_cache: Atomic<Option<Vec<IndexDescriptor>>>,
    version: AtomicU64,
}

impl IndexManager {
    pub(crate) fn new(collection_name: &str, nitrite_config: NitriteConfig) -> NitriteResult<Self> {
        let store = nitrite_config.nitrite_store()?;
        let index_meta_map = store.open_map(&derive_index_meta_map_name(collection_name))?;
        Ok(IndexManager {
            inner: Arc::new(IndexManagerInner {
                nitrite_config,
                store,
                collection_name: collection_name.to_string(),
                index_meta_map,
                index_descriptor_cache: atomic(None),
                version: AtomicU64::new(0),
            }),
        })
    }

    pub(crate) fn has_index_descriptor(&self, fields: &Fields) -> NitriteResult<bool> {
        self.inner.index_meta_map.contains_key(&fields.to_value())
    }

    /// All descriptors, ordered by their field lists.
    pub(crate) fn get_index_descriptors(&self) -> NitriteResult<Vec<IndexDescriptor>> {
        if let Some(cached) = self.inner.index_descriptor_cache.read_with(|it| it.clone()) {
            return Ok(cached);
        }

        let version = self.version();
        let mut descriptors = Vec::new();
        for value in self.inner.index_meta_map.values()? {
            let index_meta = IndexMeta::from_value(&value?)?;
            descriptors.push(index_meta.index_descriptor().clone());
        }
        self.fill_cache(version, &descriptors);
        Ok(descriptors)
    }

    /// Caches `descriptors` read at catalog `version`, unless a create or
    /// drop has happened since.
    fn fill_cache(&self, version: u64, descriptors: &[IndexDescriptor]) {
        self.inner.index_descriptor_cache.write_with(|it| {
            if self.version() == version {
                *it = Some(descriptors.to_vec());
            }
        });
    }

    pub(crate) fn find_exact_index(&self, fields: &Fields) -> NitriteResult<Option<IndexDescriptor>> {
        Ok(self
            .find_index_meta(fields)?
            .map(|meta| meta.index_descriptor().clone()))
    }

    pub(crate) fn is_dirty_index(&self, fields: &Fields) -> NitriteResult<bool> {
        Ok(self
            .find_index_meta(fields)?
            .is_some_and(|meta| meta.is_dirty()))
    }

    /// Records a new index. Fails with `AlreadyExists` when the fields are
    /// already indexed.
    pub(crate) fn create_index_descriptor(
        &self,
        fields: &Fields,
        index_kind: IndexKind,
    ) -> NitriteResult<IndexDescriptor> {
        let indexer = self.inner.nitrite_config.find_indexer(index_kind)?;
        indexer.validate_index(fields)?;

        let index_descriptor =
            IndexDescriptor::new(index_kind, fields.clone(), &self.inner.collection_name);
        let index_meta = IndexMeta::new(
            index_descriptor.clone(),
            derive_index_map_name(&index_descriptor),
        );

        let previous = self
            .inner
            .index_meta_map
            .put_if_absent(fields.to_value(), index_meta.to_value()?)?;
        if previous.is_some() {
            log::error!(
                "Index already exists on {} in {}",
                fields,
                self.inner.collection_name
            );
            return Err(NitriteError::new(
                &format!("Index already exists on fields {}", fields),
                ErrorKind::IndexingError(IndexingErrorKind::AlreadyExists),
            ));
        }

        self.invalidate_cache();
        log::debug!("Created index descriptor {}", index_descriptor);
        Ok(index_descriptor)
    }

    /// Removes the index record and its backing map. Missing indexes are
    /// ignored.
    pub(crate) fn drop_index_descriptor(&self, fields: &Fields) -> NitriteResult<()> {
        if let Some(value) = self.inner.index_meta_map.remove(&fields.to_value())? {
            let index_meta = IndexMeta::from_value(&value)?;
            self.inner.store.remove_map(index_meta.index_map_name())?;
            self.invalidate_cache();
            log::debug!("Dropped index descriptor {}", index_meta.index_descriptor());
        }
        Ok(())
    }

    /// Marks the index dirty ahead of a build scan.
    pub(crate) fn mark_build_start(&self, fields: &Fields) -> NitriteResult<()> {
        self.mark_dirty(fields, true)
    }

    /// Clears the dirty mark once a build scan has completed.
    pub(crate) fn mark_build_end(&self, fields: &Fields) -> NitriteResult<()> {
        self.mark_dirty(fields, false)
    }

    /// Increases on every index create or drop, and on close.
    pub(crate) fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Forgets the cached descriptors. The metadata map belongs to the store
    /// and stays open, so the collection can be opened again.
    pub(crate) fn close(&self) -> NitriteResult<()> {
        self.invalidate_cache();
        Ok(())
    }

    fn find_index_meta(&self, fields: &Fields) -> NitriteResult<Option<IndexMeta>> {
        match self.inner.index_meta_map.get(&fields.to_value())? {
            Some(value) => Ok(Some(IndexMeta::from_value(&value)?)),
            None => Ok(None),
        }
    }

    fn mark_dirty(&self, fields: &Fields, dirty: bool) -> NitriteResult<()> {
        let Some(mut index_meta) = self.find_index_meta(fields)? else {
            log::error!("No index on {} in {}", fields, self.inner.collection_name);
            return Err(NitriteError::new(
                &format!("No index found on fields {}", fields),
                ErrorKind::IndexingError(IndexingErrorKind::NotIndexed),
            ));
        };
        index_meta.set_dirty(dirty);
        self.inner
            .index_meta_map
            .put(fields.to_value(), index_meta.to_value()?)
    }

    fn invalidate_cache(&self) {
        self.inner.index_descriptor_cache.write_with(|it| {
            *it = None;
            self.inner.version.fetch_add(1, Ordering::AcqRel);
        });
    }
}

use dashmap::DashMap;
use std::sync::Arc;

use super::{
    ComparableIndex, CurrentValues, IndexDescriptor, IndexKind, NitriteIndexProvider,
    NitriteIndexerProvider,
};
use crate::collection::{FindPlan, NitriteId};
use crate::common::{derive_index_map_name, FieldValues, Fields};
use crate::errors::{ErrorKind, IndexingErrorKind, NitriteError, NitriteResult};
use crate::nitrite_config::NitriteConfig;

/// Serves unique and non-unique indexes. One instance exists per kind.
#[derive(Clone)]
pub(crate) struct ComparableIndexer {
    inner: Arc<ComparableIndexerInner>,
}

struct ComparableIndexerInner {
    unique: bool,
    index_registry: DashMap<IndexDescriptor, ComparableIndex>,
}

impl ComparableIndexer {
    pub(crate) fn unique() -> Self {
        Self::new(true)
    }

    pub(crate) fn non_unique() -> Self {
        Self::new(false)
    }

    fn new(unique: bool) -> Self {
        ComparableIndexer {
            inner: Arc::new(ComparableIndexerInner {
                unique,
                index_registry: DashMap::new(),
            }),
        }
    }

    fn find_nitrite_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<ComparableIndex> {
        if let Some(index) = self.inner.index_registry.get(index_descriptor) {
            return Ok(index.value().clone());
        }

        let map_name = derive_index_map_name(index_descriptor);
        let index_map = nitrite_config.nitrite_store()?.open_map(&map_name)?;
        let lock = nitrite_config.lock_registry().get_lock(&map_name);
        let index = self
            .inner
            .index_registry
            .entry(index_descriptor.clone())
            .or_insert_with(|| {
                ComparableIndex::new(index_descriptor.clone(), index_map, self.inner.unique, lock)
            })
            .value()
            .clone();
        Ok(index)
    }
}

impl NitriteIndexerProvider for ComparableIndexer {
    fn index_kind(&self) -> IndexKind {
        if self.inner.unique {
            IndexKind::Unique
        } else {
            IndexKind::NonUnique
        }
    }

    fn is_unique(&self) -> bool {
        self.inner.unique
    }

    fn validate_index(&self, _fields: &Fields) -> NitriteResult<()> {
        Ok(())
    }

    fn drop_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        let index = self.find_nitrite_index(index_descriptor, nitrite_config)?;
        index.drop_index()?;
        self.inner.index_registry.remove(index_descriptor);

        let map_name = derive_index_map_name(index_descriptor);
        nitrite_config.nitrite_store()?.remove_map(&map_name)?;
        nitrite_config.lock_registry().remove_lock(&map_name);
        Ok(())
    }

    fn clear_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_nitrite_index(index_descriptor, nitrite_config)?
            .clear()
    }

    fn write_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_nitrite_index(index_descriptor, nitrite_config)?
            .write(field_values)
    }

    fn write_current_entry(
        &self,
        read_values: &CurrentValues<'_>,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_nitrite_index(index_descriptor, nitrite_config)?
            .write_current(read_values)
    }

    fn update_index_entry(
        &self,
        old_values: &FieldValues,
        new_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_nitrite_index(index_descriptor, nitrite_config)?
            .update(old_values, new_values)
    }

    fn remove_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_nitrite_index(index_descriptor, nitrite_config)?
            .remove(field_values)
    }

    fn find_by_filter(
        &self,
        find_plan: &FindPlan,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<Vec<NitriteId>> {
        match find_plan.index_descriptor() {
            Some(index_descriptor) => self
                .find_nitrite_index(index_descriptor, nitrite_config)?
                .find_nitrite_ids(find_plan),
            None => {
                log::error!("Find plan {} has no index descriptor", find_plan);
                Err(NitriteError::new(
                    "Find plan has no index to scan",
                    ErrorKind::IndexingError(IndexingErrorKind::NotIndexed),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Document;
    use crate::filter::field;

    fn descriptor(kind: IndexKind) -> IndexDescriptor {
        IndexDescriptor::new(kind, Fields::with_names(vec!["age"]).unwrap(), "people")
    }

    #[test]
    fn writes_land_in_the_store_map() {
        let config = NitriteConfig::new();
        let indexer = ComparableIndexer::non_unique();
        let descriptor = descriptor(IndexKind::NonUnique);
        let mut doc = Document::new();
        doc.put("age", 30).unwrap();
        let id = doc.id();
        let values = FieldValues::from_document(id, &doc, descriptor.index_fields()).unwrap();
        indexer.write_index_entry(&values, &descriptor, &config).unwrap();

        let map_name = derive_index_map_name(&descriptor);
        let store = config.nitrite_store().unwrap();
        assert!(store.has_map(&map_name).unwrap());
        assert_eq!(store.open_map(&map_name).unwrap().size().unwrap(), 1);

        let plan = FindPlan {
            index_descriptor: Some(descriptor.clone()),
            index_scan_filters: vec![field("age").eq(30)],
            ..FindPlan::default()
        };
        assert_eq!(indexer.find_by_filter(&plan, &config).unwrap(), vec![id]);
    }

    #[test]
    fn drop_removes_map_and_lock() {
        let config = NitriteConfig::new();
        let indexer = ComparableIndexer::unique();
        let descriptor = descriptor(IndexKind::Unique);
        indexer.clear_index(&descriptor, &config).unwrap();
        let map_name = derive_index_map_name(&descriptor);
        assert!(config.nitrite_store().unwrap().has_map(&map_name).unwrap());

        indexer.drop_index(&descriptor, &config).unwrap();
        assert!(!config.nitrite_store().unwrap().has_map(&map_name).unwrap());
        assert_eq!(config.lock_registry().lock_count(), 0);
    }

    #[test]
    fn kind_follows_uniqueness() {
        assert_eq!(ComparableIndexer::unique().index_kind(), IndexKind::Unique);
        assert!(!ComparableIndexer::non_unique().is_unique());
    }
}

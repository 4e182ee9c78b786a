use std::collections::HashMap;
use std::sync::Arc;

use super::NitriteCollection;
use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::NitriteResult;
use crate::nitrite_config::NitriteConfig;

/// Open collections of one configuration, keyed by name.
///
/// Every open of the same name returns a handle to the same collection, so
/// all handles share one index catalog, one set of build flags and one
/// event bus.
#[derive(Clone)]
pub(crate) struct CollectionFactory {
    inner: Arc<CollectionFactoryInner>,
}

struct CollectionFactoryInner {
    collection_map: Atomic<HashMap<String, NitriteCollection>>,
}

impl CollectionFactory {
    pub(crate) fn new() -> Self {
        CollectionFactory {
            inner: Arc::new(CollectionFactoryInner {
                collection_map: atomic(HashMap::new()),
            }),
        }
    }

    /// Returns the open collection `name`, creating it when there is none or
    /// the registered one was closed.
    pub(crate) fn get_collection(
        &self,
        name: &str,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<NitriteCollection> {
        let cached = self.inner.collection_map.read_with(|it| it.get(name).cloned());
        if let Some(collection) = cached.filter(NitriteCollection::is_open) {
            return Ok(collection);
        }

        // creation happens under the write lock, two racing opens must not
        // both build a collection
        self.inner.collection_map.write_with(|map| -> NitriteResult<NitriteCollection> {
            if let Some(collection) = map.get(name).filter(|it| it.is_open()) {
                return Ok(collection.clone());
            }
            let collection = NitriteCollection::create(name, nitrite_config)?;
            map.insert(name.to_string(), collection.clone());
            Ok(collection)
        })
    }

    pub(crate) fn has_collection(&self, name: &str) -> bool {
        self.inner
            .collection_map
            .read_with(|it| it.get(name).is_some_and(NitriteCollection::is_open))
    }

    /// Closes every registered collection and forgets them. Every collection
    /// is attempted; the first failure is returned.
    pub(crate) fn clear(&self) -> NitriteResult<()> {
        let collections: Vec<NitriteCollection> = self
            .inner
            .collection_map
            .write_with(|it| it.drain().map(|(_, collection)| collection).collect());

        let mut result = Ok(());
        for collection in collections {
            if let Err(e) = collection.close() {
                log::error!("Failed to close collection {}: {}", collection.name(), e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

use super::InMemoryMap;
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::store::{NitriteMap, NitriteMapProvider, NitriteStoreProvider};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Volatile store holding every map in memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    closed: AtomicBool,
    map_registry: DashMap<String, InMemoryMap>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        Self::default()
    }

    fn check_opened(&self) -> NitriteResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            log::error!("In-memory store is closed");
            return Err(NitriteError::new(
                "In-memory store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

impl NitriteStoreProvider for InMemoryStore {
    fn open_map(&self, name: &str) -> NitriteResult<NitriteMap> {
        self.check_opened()?;
        let map = self
            .inner
            .map_registry
            .entry(name.to_string())
            .or_insert_with(|| InMemoryMap::new(name))
            .clone();
        Ok(NitriteMap::new(map))
    }

    fn has_map(&self, name: &str) -> NitriteResult<bool> {
        self.check_opened()?;
        Ok(self.inner.map_registry.contains_key(name))
    }

    fn remove_map(&self, name: &str) -> NitriteResult<()> {
        self.check_opened()?;
        if let Some((_, map)) = self.inner.map_registry.remove(name) {
            map.dispose()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> NitriteResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let maps: Vec<InMemoryMap> = self
            .inner
            .map_registry
            .iter()
            .map(|r| r.value().clone())
            .collect();
        for map in maps {
            map.close()?;
        }
        self.inner.map_registry.clear();
        Ok(())
    }
}

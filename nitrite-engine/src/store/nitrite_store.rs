use crate::errors::NitriteResult;
use crate::store::NitriteMap;
use std::ops::Deref;
use std::sync::Arc;

/// Opens and drops named ordered maps.
pub trait NitriteStoreProvider: Send + Sync {
    /// Opens the map called `name`, creating it when absent. Repeated opens
    /// return handles to the same map.
    fn open_map(&self, name: &str) -> NitriteResult<NitriteMap>;

    fn has_map(&self, name: &str) -> NitriteResult<bool>;

    /// Disposes the map and forgets it. A missing map is not an error.
    fn remove_map(&self, name: &str) -> NitriteResult<()>;

    fn is_closed(&self) -> bool;

    fn close(&self) -> NitriteResult<()>;
}

#[derive(Clone)]
pub struct NitriteStore {
    inner: Arc<dyn NitriteStoreProvider>,
}

impl NitriteStore {
    pub fn new<T: NitriteStoreProvider + 'static>(inner: T) -> Self {
        NitriteStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for NitriteStore {
    type Target = Arc<dyn NitriteStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

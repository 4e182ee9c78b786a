use crate::common::{Key, Value};
use crate::errors::NitriteResult;
use crate::store::iters::EntryIterator;
use std::iter::Rev;
use std::ops::Deref;
use std::sync::Arc;

/// A named, ordered key/value map owned by a store.
///
/// Keys are ordered by [`Value`] ordering. `put_if_absent` is atomic.
/// Operations on a closed or dropped map fail.
pub trait NitriteMapProvider: Send + Sync {
    fn contains_key(&self, key: &Key) -> NitriteResult<bool>;

    fn get(&self, key: &Key) -> NitriteResult<Option<Value>>;

    fn put(&self, key: Key, value: Value) -> NitriteResult<()>;

    /// Inserts only when `key` is absent. Returns the existing value otherwise.
    fn put_if_absent(&self, key: Key, value: Value) -> NitriteResult<Option<Value>>;

    fn remove(&self, key: &Key) -> NitriteResult<Option<Value>>;

    fn clear(&self) -> NitriteResult<()>;

    fn size(&self) -> NitriteResult<u64>;

    fn is_empty(&self) -> NitriteResult<bool> {
        Ok(self.size()? == 0)
    }

    fn first_key(&self) -> NitriteResult<Option<Key>>;

    fn last_key(&self) -> NitriteResult<Option<Key>>;

    /// Least key strictly greater than `key`.
    fn higher_key(&self, key: &Key) -> NitriteResult<Option<Key>>;

    /// Least key greater than or equal to `key`.
    fn ceiling_key(&self, key: &Key) -> NitriteResult<Option<Key>>;

    /// Greatest key strictly less than `key`.
    fn lower_key(&self, key: &Key) -> NitriteResult<Option<Key>>;

    /// Greatest key less than or equal to `key`.
    fn floor_key(&self, key: &Key) -> NitriteResult<Option<Key>>;

    fn entries(&self) -> NitriteResult<EntryIterator>;

    fn reverse_entries(&self) -> NitriteResult<Rev<EntryIterator>>;

    fn get_name(&self) -> String;

    fn is_closed(&self) -> bool;

    fn close(&self) -> NitriteResult<()>;

    /// Clears the map and marks it dropped.
    fn dispose(&self) -> NitriteResult<()>;

    fn is_dropped(&self) -> bool;
}

#[derive(Clone)]
pub struct NitriteMap {
    inner: Arc<dyn NitriteMapProvider>,
}

impl NitriteMap {
    pub fn new<T: NitriteMapProvider + 'static>(inner: T) -> Self {
        NitriteMap {
            inner: Arc::new(inner),
        }
    }

    pub fn values(&self) -> NitriteResult<impl Iterator<Item = NitriteResult<Value>>> {
        Ok(self.entries()?.map(|entry| entry.map(|(_, value)| value)))
    }
}

impl Deref for NitriteMap {
    type Target = Arc<dyn NitriteMapProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

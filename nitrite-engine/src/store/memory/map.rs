use crate::common::{Key, Value};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::store::iters::{EntryIterator, SingleMapEntryProvider};
use crate::store::{NitriteMap, NitriteMapProvider};
use crossbeam_skiplist::SkipMap;
use std::collections::Bound::{Excluded, Included, Unbounded};
use std::iter::Rev;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lock-free ordered map backed by a concurrent skip list.
#[derive(Clone)]
pub struct InMemoryMap {
    inner: Arc<InMemoryMapInner>,
}

struct InMemoryMapInner {
    backing_map: SkipMap<Key, Value>,
    closed: AtomicBool,
    dropped: AtomicBool,
    name: String,
}

impl InMemoryMap {
    pub fn new(name: &str) -> Self {
        InMemoryMap {
            inner: Arc::new(InMemoryMapInner {
                backing_map: SkipMap::new(),
                closed: AtomicBool::new(false),
                dropped: AtomicBool::new(false),
                name: name.to_string(),
            }),
        }
    }
}

impl InMemoryMapInner {
    fn check_opened(&self) -> NitriteResult<()> {
        if self.dropped.load(Ordering::Acquire) {
            log::error!("Map {} is dropped", self.name);
            return Err(NitriteError::new(
                &format!("Map {} is dropped", self.name),
                ErrorKind::StoreError,
            ));
        }
        if self.closed.load(Ordering::Acquire) {
            log::error!("Map {} is closed", self.name);
            return Err(NitriteError::new(
                &format!("Map {} is closed", self.name),
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

impl NitriteMapProvider for InMemoryMap {
    fn contains_key(&self, key: &Key) -> NitriteResult<bool> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.contains_key(key))
    }

    fn get(&self, key: &Key) -> NitriteResult<Option<Value>> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, key: Key, value: Value) -> NitriteResult<()> {
        self.inner.check_opened()?;
        self.inner.backing_map.insert(key, value);
        Ok(())
    }

    fn put_if_absent(&self, key: Key, value: Value) -> NitriteResult<Option<Value>> {
        self.inner.check_opened()?;
        let mut inserted = false;
        let entry = self.inner.backing_map.get_or_insert_with(key, || {
            inserted = true;
            value
        });
        if inserted {
            Ok(None)
        } else {
            Ok(Some(entry.value().clone()))
        }
    }

    fn remove(&self, key: &Key) -> NitriteResult<Option<Value>> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.remove(key).map(|e| e.value().clone()))
    }

    fn clear(&self) -> NitriteResult<()> {
        self.inner.check_opened()?;
        self.inner.backing_map.clear();
        Ok(())
    }

    fn size(&self) -> NitriteResult<u64> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.len() as u64)
    }

    fn first_key(&self) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.front().map(|e| e.key().clone()))
    }

    fn last_key(&self) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.back().map(|e| e.key().clone()))
    }

    fn higher_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self
            .inner
            .backing_map
            .range((Excluded(key), Unbounded))
            .next()
            .map(|e| e.key().clone()))
    }

    fn ceiling_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self
            .inner
            .backing_map
            .range((Included(key), Unbounded))
            .next()
            .map(|e| e.key().clone()))
    }

    fn lower_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self
            .inner
            .backing_map
            .range((Unbounded, Excluded(key)))
            .next_back()
            .map(|e| e.key().clone()))
    }

    fn floor_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        self.inner.check_opened()?;
        Ok(self
            .inner
            .backing_map
            .range((Unbounded, Included(key)))
            .next_back()
            .map(|e| e.key().clone()))
    }

    fn entries(&self) -> NitriteResult<EntryIterator> {
        self.inner.check_opened()?;
        let provider = SingleMapEntryProvider::new(NitriteMap::new(self.clone()));
        Ok(EntryIterator::new(provider))
    }

    fn reverse_entries(&self) -> NitriteResult<Rev<EntryIterator>> {
        Ok(self.entries()?.rev())
    }

    fn get_name(&self) -> String {
        self.inner.name.clone()
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> NitriteResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn dispose(&self) -> NitriteResult<()> {
        self.inner.backing_map.clear();
        self.inner.dropped.store(true, Ordering::Release);
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }
}

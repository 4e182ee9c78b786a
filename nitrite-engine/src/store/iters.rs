use crate::common::{Key, Value};
use crate::errors::NitriteResult;
use crate::store::NitriteMap;
use std::sync::Arc;

/// Cursor over the entries of an ordered map.
pub trait EntryIteratorProvider: Send + Sync {
    fn next_entry(&mut self) -> Option<NitriteResult<(Key, Value)>>;

    fn prev_entry(&mut self) -> Option<NitriteResult<(Key, Value)>>;
}

/// Key ordered iterator over map entries, walkable from both ends.
pub struct EntryIterator {
    provider: Arc<parking_lot::Mutex<Box<dyn EntryIteratorProvider>>>,
}

impl EntryIterator {
    pub fn new<T: EntryIteratorProvider + 'static>(provider: T) -> Self {
        EntryIterator {
            provider: Arc::new(parking_lot::Mutex::new(Box::new(provider))),
        }
    }
}

impl Iterator for EntryIterator {
    type Item = NitriteResult<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.provider.lock().next_entry()
    }
}

impl DoubleEndedIterator for EntryIterator {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.provider.lock().prev_entry()
    }
}

/// Walks a single map by key navigation, so it tolerates concurrent writes:
/// entries removed after being passed are not revisited and entries removed
/// ahead of the cursor are skipped.
pub struct SingleMapEntryProvider {
    map: NitriteMap,
    current: Option<Key>,
    exhausted: bool,
}

impl SingleMapEntryProvider {
    pub fn new(map: NitriteMap) -> Self {
        SingleMapEntryProvider {
            map,
            current: None,
            exhausted: false,
        }
    }

    fn advance(&mut self, forward: bool) -> Option<NitriteResult<(Key, Value)>> {
        if self.exhausted {
            return None;
        }

        loop {
            let next_key = match (&self.current, forward) {
                (Some(key), true) => self.map.higher_key(key),
                (Some(key), false) => self.map.lower_key(key),
                (None, true) => self.map.first_key(),
                (None, false) => self.map.last_key(),
            };

            match next_key {
                Ok(Some(key)) => {
                    self.current = Some(key.clone());
                    match self.map.get(&key) {
                        Ok(Some(value)) => return Some(Ok((key, value))),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(None) => {
                    self.exhausted = true;
                    return None;
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl EntryIteratorProvider for SingleMapEntryProvider {
    fn next_entry(&mut self) -> Option<NitriteResult<(Key, Value)>> {
        self.advance(true)
    }

    fn prev_entry(&mut self) -> Option<NitriteResult<(Key, Value)>> {
        self.advance(false)
    }
}

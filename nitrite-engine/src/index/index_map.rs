use crate::common::{Key, Value};
use crate::errors::NitriteResult;
use crate::store::NitriteMap;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;

/// One level of an ordered index.
///
/// The first field of an index is stored in a store map. Each further field
/// of a compound index is a nested [`Value::Map`] under the previous level's
/// key. Both levels share the same key navigation so filters can walk either.
#[derive(Clone)]
pub enum IndexMap {
    Store(NitriteMap),
    Level(Arc<BTreeMap<Value, Value>>),
}

impl IndexMap {
    pub fn level(map: BTreeMap<Value, Value>) -> Self {
        IndexMap::Level(Arc::new(map))
    }

    pub fn get(&self, key: &Key) -> NitriteResult<Option<Value>> {
        match self {
            IndexMap::Store(map) => map.get(key),
            IndexMap::Level(map) => Ok(map.get(key).cloned()),
        }
    }

    pub fn first_key(&self) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.first_key(),
            IndexMap::Level(map) => Ok(map.keys().next().cloned()),
        }
    }

    pub fn last_key(&self) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.last_key(),
            IndexMap::Level(map) => Ok(map.keys().next_back().cloned()),
        }
    }

    pub fn higher_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.higher_key(key),
            IndexMap::Level(map) => Ok(map
                .range((Excluded(key), Unbounded))
                .next()
                .map(|(k, _)| k.clone())),
        }
    }

    pub fn ceiling_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.ceiling_key(key),
            IndexMap::Level(map) => Ok(map
                .range((Included(key), Unbounded))
                .next()
                .map(|(k, _)| k.clone())),
        }
    }

    pub fn lower_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.lower_key(key),
            IndexMap::Level(map) => Ok(map
                .range((Unbounded, Excluded(key)))
                .next_back()
                .map(|(k, _)| k.clone())),
        }
    }

    pub fn floor_key(&self, key: &Key) -> NitriteResult<Option<Key>> {
        match self {
            IndexMap::Store(map) => map.floor_key(key),
            IndexMap::Level(map) => Ok(map
                .range((Unbounded, Included(key)))
                .next_back()
                .map(|(k, _)| k.clone())),
        }
    }

    /// Visits every entry in key order, or in reverse key order.
    pub fn for_each_entry(
        &self,
        reverse: bool,
        mut visit: impl FnMut(&Key, Value) -> NitriteResult<()>,
    ) -> NitriteResult<()> {
        match self {
            IndexMap::Store(map) => {
                if reverse {
                    for entry in map.reverse_entries()? {
                        let (key, value) = entry?;
                        visit(&key, value)?;
                    }
                } else {
                    for entry in map.entries()? {
                        let (key, value) = entry?;
                        visit(&key, value)?;
                    }
                }
                Ok(())
            }
            IndexMap::Level(map) => {
                if reverse {
                    for (key, value) in map.iter().rev() {
                        visit(key, value.clone())?;
                    }
                } else {
                    for (key, value) in map.iter() {
                        visit(key, value.clone())?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> IndexMap {
        let mut map = BTreeMap::new();
        for i in [10, 20, 30] {
            map.insert(Value::from(i), Value::from(vec![i]));
        }
        IndexMap::level(map)
    }

    #[test]
    fn navigation_on_nested_level() {
        let map = level();
        assert_eq!(map.first_key().ok().flatten(), Some(Value::from(10)));
        assert_eq!(map.last_key().ok().flatten(), Some(Value::from(30)));
        assert_eq!(map.higher_key(&Value::from(10)).ok().flatten(), Some(Value::from(20)));
        assert_eq!(map.ceiling_key(&Value::from(20)).ok().flatten(), Some(Value::from(20)));
        assert_eq!(map.lower_key(&Value::from(20)).ok().flatten(), Some(Value::from(10)));
        assert_eq!(map.floor_key(&Value::from(25)).ok().flatten(), Some(Value::from(20)));
        assert_eq!(map.higher_key(&Value::from(30)).ok().flatten(), None);
    }

    #[test]
    fn entries_visit_in_requested_order() {
        let map = level();
        let mut keys = Vec::new();
        map.for_each_entry(true, |key, _| {
            keys.push(key.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(keys, vec![Value::from(30), Value::from(20), Value::from(10)]);
    }
}

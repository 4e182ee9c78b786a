use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::{CurrentValues, IndexDescriptor, IndexMap, IndexScanner, NitriteIndexProvider};
use crate::collection::{FindPlan, NitriteId};
use crate::common::{FieldValues, LockHandle, Value};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::store::NitriteMap;

/// Ordered index from field values to the ids of the documents holding them.
///
/// A single field index maps each key to a sorted array of ids. A compound
/// index nests one [`Value::Map`] level per further field, with the id arrays
/// on the last level. Array field values are fanned out: the document is
/// entered under every distinct element.
#[derive(Clone)]
pub(crate) struct ComparableIndex {
    inner: Arc<ComparableIndexInner>,
}

struct ComparableIndexInner {
    index_descriptor: IndexDescriptor,
    index_map: NitriteMap,
    unique: bool,
    lock: LockHandle,
}

impl ComparableIndex {
    pub(crate) fn new(
        index_descriptor: IndexDescriptor,
        index_map: NitriteMap,
        unique: bool,
        lock: LockHandle,
    ) -> Self {
        ComparableIndex {
            inner: Arc::new(ComparableIndexInner {
                index_descriptor,
                index_map,
                unique,
                lock,
            }),
        }
    }
}

impl NitriteIndexProvider for ComparableIndex {
    fn index_descriptor(&self) -> &IndexDescriptor {
        &self.inner.index_descriptor
    }

    fn write(&self, field_values: &FieldValues) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        self.inner.write_entry(field_values)
    }

    fn write_current(&self, read_values: &CurrentValues<'_>) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        match read_values()? {
            Some(field_values) => self.inner.write_entry(&field_values),
            None => Ok(()),
        }
    }

    fn update(&self, old: &FieldValues, new: &FieldValues) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        let new_tuples = key_tuples(new.values());
        self.inner.check_unique(&new_tuples, new.nitrite_id())?;
        for tuple in &new_tuples {
            self.inner.add_tuple(tuple, new.nitrite_id())?;
        }

        let keep: HashSet<&Vec<Value>> = new_tuples.iter().collect();
        for tuple in key_tuples(old.values()) {
            if !keep.contains(&tuple) {
                self.inner.remove_tuple(&tuple, old.nitrite_id())?;
            }
        }
        Ok(())
    }

    fn remove(&self, field_values: &FieldValues) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        for tuple in key_tuples(field_values.values()) {
            self.inner.remove_tuple(&tuple, field_values.nitrite_id())?;
        }
        Ok(())
    }

    fn clear(&self) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        self.inner.index_map.clear()
    }

    fn drop_index(&self) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        self.inner.index_map.clear()?;
        self.inner.index_map.dispose()
    }

    fn find_nitrite_ids(&self, find_plan: &FindPlan) -> NitriteResult<Vec<NitriteId>> {
        let fields = self.inner.index_descriptor.index_fields().field_names();
        let scanner = IndexScanner::new(
            fields,
            find_plan.index_scan_filters(),
            find_plan.index_scan_order(),
        );
        scanner.scan(&IndexMap::Store(self.inner.index_map.clone()))
    }
}

impl ComparableIndexInner {
    fn write_entry(&self, field_values: &FieldValues) -> NitriteResult<()> {
        let tuples = key_tuples(field_values.values());
        self.check_unique(&tuples, field_values.nitrite_id())?;
        for tuple in &tuples {
            self.add_tuple(tuple, field_values.nitrite_id())?;
        }
        Ok(())
    }

    fn check_unique(&self, tuples: &[Vec<Value>], nitrite_id: &NitriteId) -> NitriteResult<()> {
        if !self.unique {
            return Ok(());
        }

        for tuple in tuples {
            let owners = self.owners(tuple)?;
            if owners.iter().any(|owner| owner != &Value::NitriteId(*nitrite_id)) {
                log::error!(
                    "Unique constraint violated for {:?} on {}",
                    tuple,
                    self.index_descriptor
                );
                return Err(NitriteError::new(
                    &format!(
                        "Unique constraint violated for {} on {}",
                        Value::Array(tuple.clone()),
                        self.index_descriptor.index_fields()
                    ),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }
        Ok(())
    }

    fn owners(&self, tuple: &[Value]) -> NitriteResult<Vec<Value>> {
        let Some((first, rest)) = tuple.split_first() else {
            return Ok(Vec::new());
        };

        let mut current = self.index_map.get(first)?;
        for key in rest {
            current = match current {
                Some(Value::Map(mut level)) => level.remove(key),
                Some(other) => return Err(corrupt_entry(&other)),
                None => None,
            };
        }

        match current {
            Some(Value::Array(ids)) => Ok(ids),
            Some(other) => Err(corrupt_entry(&other)),
            None => Ok(Vec::new()),
        }
    }

    fn add_tuple(&self, tuple: &[Value], nitrite_id: &NitriteId) -> NitriteResult<()> {
        let Some((first, rest)) = tuple.split_first() else {
            return Ok(());
        };
        let existing = self.index_map.get(first)?;
        let updated = insert_id(existing, rest, nitrite_id)?;
        self.index_map.put(first.clone(), updated)
    }

    fn remove_tuple(&self, tuple: &[Value], nitrite_id: &NitriteId) -> NitriteResult<()> {
        let Some((first, rest)) = tuple.split_first() else {
            return Ok(());
        };
        let Some(existing) = self.index_map.get(first)? else {
            return Ok(());
        };
        match remove_id(existing, rest, nitrite_id)? {
            Some(updated) => self.index_map.put(first.clone(), updated),
            None => self.index_map.remove(first).map(|_| ()),
        }
    }
}

/// Every combination of index keys a document produces, one key per field.
/// An empty array is keyed like a missing value, under null.
pub(crate) fn key_tuples(values: &[Value]) -> Vec<Vec<Value>> {
    values
        .iter()
        .map(|value| match value {
            Value::Array(items) if items.is_empty() => vec![Value::Null],
            Value::Array(items) => items.iter().cloned().unique().collect::<Vec<_>>(),
            single => vec![single.clone()],
        })
        .multi_cartesian_product()
        .unique()
        .collect()
}

fn insert_id(existing: Option<Value>, rest: &[Value], nitrite_id: &NitriteId) -> NitriteResult<Value> {
    match rest.split_first() {
        None => {
            let mut ids = match existing {
                Some(Value::Array(ids)) => ids,
                Some(other) => return Err(corrupt_entry(&other)),
                None => Vec::with_capacity(1),
            };
            let id = Value::NitriteId(*nitrite_id);
            if let Err(position) = ids.binary_search(&id) {
                ids.insert(position, id);
            }
            Ok(Value::Array(ids))
        }
        Some((key, tail)) => {
            let mut level = match existing {
                Some(Value::Map(level)) => level,
                Some(other) => return Err(corrupt_entry(&other)),
                None => BTreeMap::new(),
            };
            let child = level.remove(key);
            level.insert(key.clone(), insert_id(child, tail, nitrite_id)?);
            Ok(Value::Map(level))
        }
    }
}

/// Removes the id below `rest`, returning `None` when the entry becomes empty.
fn remove_id(existing: Value, rest: &[Value], nitrite_id: &NitriteId) -> NitriteResult<Option<Value>> {
    match rest.split_first() {
        None => {
            let Value::Array(mut ids) = existing else {
                return Err(corrupt_entry(&existing));
            };
            ids.retain(|id| id != &Value::NitriteId(*nitrite_id));
            Ok((!ids.is_empty()).then_some(Value::Array(ids)))
        }
        Some((key, tail)) => {
            let Value::Map(mut level) = existing else {
                return Err(corrupt_entry(&existing));
            };
            if let Some(child) = level.remove(key) {
                if let Some(child) = remove_id(child, tail, nitrite_id)? {
                    level.insert(key.clone(), child);
                }
            }
            Ok((!level.is_empty()).then_some(Value::Map(level)))
        }
    }
}

fn corrupt_entry(value: &Value) -> NitriteError {
    log::error!("Index entry {} has an unexpected shape", value);
    NitriteError::new("Index is in corrupt state", ErrorKind::InternalError)
}

use indexmap::IndexSet;
use std::collections::HashMap;

use crate::collection::NitriteId;
use crate::common::Value;
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::filter::Filter;

use super::IndexMap;

/// Walks the levels of an ordered index with one filter per leading field.
///
/// Fields past the last filter are walked in full. Each field is walked in
/// reverse when its scan order says so. Ids are returned in walk order, each
/// id once.
pub(crate) struct IndexScanner<'a> {
    fields: &'a [String],
    filters: &'a [Filter],
    scan_order: &'a HashMap<String, bool>,
}

impl<'a> IndexScanner<'a> {
    pub(crate) fn new(
        fields: &'a [String],
        filters: &'a [Filter],
        scan_order: &'a HashMap<String, bool>,
    ) -> Self {
        IndexScanner {
            fields,
            filters,
            scan_order,
        }
    }

    pub(crate) fn scan(&self, index_map: &IndexMap) -> NitriteResult<Vec<NitriteId>> {
        let mut nitrite_ids = IndexSet::new();
        self.scan_level(index_map, 0, &mut nitrite_ids)?;
        Ok(nitrite_ids.into_iter().collect())
    }

    fn scan_level(
        &self,
        index_map: &IndexMap,
        level: usize,
        nitrite_ids: &mut IndexSet<NitriteId>,
    ) -> NitriteResult<()> {
        let reverse = self
            .fields
            .get(level)
            .and_then(|field| self.scan_order.get(field))
            .copied()
            .unwrap_or(false);

        let values = match self.filters.get(level) {
            Some(filter) => filter.apply_on_index(index_map, reverse)?,
            None => {
                let mut values = Vec::new();
                index_map.for_each_entry(reverse, |_, value| {
                    values.push(value);
                    Ok(())
                })?;
                values
            }
        };

        for value in values {
            match value {
                Value::Array(ids) => {
                    for id in ids {
                        match id {
                            Value::NitriteId(id) => {
                                nitrite_ids.insert(id);
                            }
                            other => log::warn!("Skipping invalid id {} in index", other),
                        }
                    }
                }
                Value::Map(level_map) => {
                    self.scan_level(&IndexMap::level(level_map), level + 1, nitrite_ids)?
                }
                other => {
                    log::error!("Index entry {} is neither an id list nor a nested level", other);
                    return Err(NitriteError::new(
                        "Index is in corrupt state",
                        ErrorKind::InternalError,
                    ));
                }
            }
        }
        Ok(())
    }
}

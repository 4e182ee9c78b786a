use crate::collection::{Document, NitriteId};
use crate::common::Value;
use crate::errors::NitriteResult;
use crate::store::NitriteMap;

/// Documents for a list of ids, in list order. Ids removed since the index
/// was read are skipped.
pub(crate) struct IndexedStream {
    nitrite_map: NitriteMap,
    nitrite_ids: std::vec::IntoIter<NitriteId>,
}

impl IndexedStream {
    pub(crate) fn new(nitrite_map: NitriteMap, nitrite_ids: Vec<NitriteId>) -> Self {
        IndexedStream {
            nitrite_map,
            nitrite_ids: nitrite_ids.into_iter(),
        }
    }
}

impl Iterator for IndexedStream {
    type Item = NitriteResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        for nitrite_id in self.nitrite_ids.by_ref() {
            match self.nitrite_map.get(&Value::NitriteId(nitrite_id)) {
                Ok(Some(Value::Document(document))) => return Some(Ok(document)),
                Ok(Some(other)) => log::warn!("Expected a document for {}, found {}", nitrite_id, other),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

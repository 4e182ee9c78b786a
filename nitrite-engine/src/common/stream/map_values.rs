use crate::collection::Document;
use crate::errors::NitriteResult;
use crate::store::{EntryIterator, NitriteMap};

/// Every document of a primary map in id order.
pub(crate) struct MapValues {
    entries: EntryIterator,
}

impl MapValues {
    pub(crate) fn new(nitrite_map: &NitriteMap) -> NitriteResult<Self> {
        Ok(MapValues {
            entries: nitrite_map.entries()?,
        })
    }
}

impl Iterator for MapValues {
    type Item = NitriteResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.entries.next()? {
                Ok((_, value)) => match value.as_document() {
                    Some(document) => return Some(Ok(document.clone())),
                    None => log::warn!("Skipping non-document value {} in collection", value),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

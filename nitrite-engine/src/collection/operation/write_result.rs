use crate::collection::NitriteId;

/// Ids of the documents touched by a write, in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    nitrite_ids: Vec<NitriteId>,
}

impl WriteResult {
    pub fn new(nitrite_ids: Vec<NitriteId>) -> Self {
        Self { nitrite_ids }
    }

    pub fn affected_nitrite_ids(&self) -> &[NitriteId] {
        &self.nitrite_ids
    }

    pub fn affected_count(&self) -> usize {
        self.nitrite_ids.len()
    }
}

impl IntoIterator for WriteResult {
    type Item = NitriteId;
    type IntoIter = std::vec::IntoIter<NitriteId>;

    fn into_iter(self) -> Self::IntoIter {
        self.nitrite_ids.into_iter()
    }
}

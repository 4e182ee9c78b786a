use crate::collection::{Document, FindPlan};
use crate::errors::NitriteResult;

use super::filtered_stream::DocumentStream;

/// Lazy result of a `find`.
///
/// Documents are pulled from the plan's stream on demand and remembered, so
/// [`size`](Self::size) and [`first`](Self::first) can be called at any
/// point without losing results. Every yielded document is an independent
/// copy.
pub struct DocumentCursor {
    underlying: Option<DocumentStream>,
    cache: Vec<NitriteResult<Document>>,
    current_index: usize,
    find_plan: FindPlan,
}

impl DocumentCursor {
    pub(crate) fn new(stream: DocumentStream, find_plan: FindPlan) -> Self {
        DocumentCursor {
            underlying: Some(stream),
            cache: Vec::new(),
            current_index: 0,
            find_plan,
        }
    }

    /// Rewinds the cursor to the first result.
    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Number of results. Drains the stream and rewinds.
    pub fn size(&mut self) -> usize {
        if self.underlying.is_some() {
            for _ in self.by_ref() {}
        }
        self.reset();
        self.cache.len()
    }

    pub fn first(&mut self) -> Option<NitriteResult<Document>> {
        self.reset();
        self.next()
    }

    /// The plan the results were produced with.
    pub fn find_plan(&self) -> &FindPlan {
        &self.find_plan
    }
}

impl Iterator for DocumentCursor {
    type Item = NitriteResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.cache.get(self.current_index) {
            self.current_index += 1;
            return Some(item.clone());
        }

        let stream = self.underlying.as_mut()?;
        match stream.next() {
            Some(item) => {
                self.cache.push(item.clone());
                self.current_index += 1;
                Some(item)
            }
            None => {
                self.underlying = None;
                None
            }
        }
    }
}

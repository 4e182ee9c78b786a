use std::sync::Arc;

use crate::collection::Document;
use crate::errors::NitriteResult;
use crate::filter::{Filter, TextMatcher};

pub(crate) type DocumentStream = Box<dyn Iterator<Item = NitriteResult<Document>>>;

/// Keeps the documents a residual filter accepts.
pub(crate) struct FilteredStream {
    raw_stream: DocumentStream,
    filter: Filter,
    texts: Arc<dyn TextMatcher>,
}

impl FilteredStream {
    pub(crate) fn new(raw_stream: DocumentStream, filter: Filter, texts: Arc<dyn TextMatcher>) -> Self {
        FilteredStream {
            raw_stream,
            filter,
            texts,
        }
    }
}

impl Iterator for FilteredStream {
    type Item = NitriteResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let document = match self.raw_stream.next()? {
                Ok(document) => document,
                Err(e) => return Some(Err(e)),
            };
            match self.filter.apply(&document, self.texts.as_ref()) {
                Ok(true) => return Some(Ok(document)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

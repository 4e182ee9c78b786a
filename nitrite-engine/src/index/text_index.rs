use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

use super::text::Tokenizer;
use super::{CurrentValues, IndexDescriptor, IndexMap, NitriteIndexProvider};
use crate::collection::{FindPlan, NitriteId};
use crate::common::{FieldValues, LockHandle, Value};
use crate::errors::{ErrorKind, FilterErrorKind, IndexingErrorKind, NitriteError, NitriteResult};
use crate::filter::Filter;
use crate::store::NitriteMap;

/// Inverted index from terms to the ids of documents containing them.
///
/// Terms come from the configured tokenizer, which lower-cases text, so
/// searches are case-insensitive. Only string values (or arrays of strings)
/// can be indexed.
#[derive(Clone)]
pub(crate) struct TextIndex {
    inner: Arc<TextIndexInner>,
}

struct TextIndexInner {
    index_descriptor: IndexDescriptor,
    index_map: NitriteMap,
    tokenizer: Tokenizer,
    lock: LockHandle,
}

impl TextIndex {
    pub(crate) fn new(
        index_descriptor: IndexDescriptor,
        index_map: NitriteMap,
        tokenizer: Tokenizer,
        lock: LockHandle,
    ) -> Self {
        TextIndex {
            inner: Arc::new(TextIndexInner {
                index_descriptor,
                index_map,
                tokenizer,
                lock,
            }),
        }
    }

    /// Runs a text query.
    ///
    /// A plain query scores each document by the number of distinct query
    /// terms it contains and returns ids by descending score, ties in id
    /// order. A single term with a leading and/or trailing `*` matches
    /// indexed terms by suffix, prefix or substring and returns ids in term
    /// order.
    pub(crate) fn find_text(&self, query: &str) -> NitriteResult<Vec<NitriteId>> {
        let query = query.trim();
        if query.contains('*') {
            self.inner.search_wildcard(query)
        } else {
            self.inner.search_terms(query)
        }
    }
}

impl NitriteIndexProvider for TextIndex {
    fn index_descriptor(&self) -> &IndexDescriptor {
        &self.inner.index_descriptor
    }

    fn write(&self, field_values: &FieldValues) -> NitriteResult<()> {
        let terms = self.inner.terms(field_values)?;
        let _guard = self.inner.lock.write();
        for term in terms {
            self.inner.add_id(term, field_values.nitrite_id())?;
        }
        Ok(())
    }

    fn write_current(&self, read_values: &CurrentValues<'_>) -> NitriteResult<()> {
        let _guard = self.inner.lock.write();
        let Some(field_values) = read_values()? else {
            return Ok(());
        };
        for term in self.inner.terms(&field_values)? {
            self.inner.add_id(term, field_values.nitrite_id())?;
        }
        Ok(())
    }

    fn update(&self, old: &FieldValues, new: &FieldValues) -> NitriteResult<()> {
        let new_terms = self.inner.terms(new)?;
        let old_terms = self.inner.terms(old).unwrap_or_default();
        let _guard = self.inner.lock.write();
        for term in new_terms.iter() {
            self.inner.add_id(term.clone(), new.nitrite_id())?;
        }
        for term in old_terms {
            if !new_terms.contains(&term) {
                self.inner.remove_id(term, old.nitrite_id())?;
            }
        }
        Ok(())
    }

    fn remove(&self, field_values: &FieldValues) -> NitriteResult<()> {
        let terms = self.inner.terms(field_values).unwrap_or_default();
        let _guard = self.inner.lock.write();
        for term in terms {
            self.inner.remove_id(term, field_values.nitrite_id())?;
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
        match find_plan.index_scan_filters().first() {
            Some(Filter::Text { query, .. }) => self.find_text(query),
            other => {
                log::error!("Full-text index cannot answer {:?}", other);
                Err(NitriteError::new(
                    "Full-text index can only answer text filters",
                    ErrorKind::FilterError(FilterErrorKind::InvalidFilter),
                ))
            }
        }
    }
}

impl TextIndexInner {
    fn terms(&self, field_values: &FieldValues) -> NitriteResult<IndexSet<String>> {
        let mut terms = IndexSet::new();
        match field_values.first_value() {
            Value::Null => {}
            Value::String(text) => terms.extend(self.tokenizer.tokenize(text)),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Null => {}
                        Value::String(text) => terms.extend(self.tokenizer.tokenize(text)),
                        other => return Err(self.non_string(other)),
                    }
                }
            }
            other => return Err(self.non_string(other)),
        }
        Ok(terms)
    }

    fn non_string(&self, value: &Value) -> NitriteError {
        log::error!(
            "Full-text index on {} cannot index {} value {}",
            self.index_descriptor.index_fields(),
            value.type_name(),
            value
        );
        NitriteError::new(
            &format!(
                "Full-text index on {} can only index strings, found {}",
                self.index_descriptor.index_fields(),
                value.type_name()
            ),
            ErrorKind::IndexingError(IndexingErrorKind::NonStringValue),
        )
    }

    fn add_id(&self, term: String, nitrite_id: &NitriteId) -> NitriteResult<()> {
        let key = Value::String(term);
        let mut ids = match self.index_map.get(&key)? {
            Some(Value::Array(ids)) => ids,
            _ => Vec::with_capacity(1),
        };
        let id = Value::NitriteId(*nitrite_id);
        if let Err(position) = ids.binary_search(&id) {
            ids.insert(position, id);
        }
        self.index_map.put(key, Value::Array(ids))
    }

    fn remove_id(&self, term: String, nitrite_id: &NitriteId) -> NitriteResult<()> {
        let key = Value::String(term);
        let Some(Value::Array(mut ids)) = self.index_map.get(&key)? else {
            return Ok(());
        };
        ids.retain(|id| id != &Value::NitriteId(*nitrite_id));
        if ids.is_empty() {
            self.index_map.remove(&key)?;
        } else {
            self.index_map.put(key, Value::Array(ids))?;
        }
        Ok(())
    }

    fn search_terms(&self, query: &str) -> NitriteResult<Vec<NitriteId>> {
        let mut scores: HashMap<NitriteId, usize> = HashMap::new();
        for term in self.tokenizer.tokenize(query) {
            if let Some(Value::Array(ids)) = self.index_map.get(&Value::String(term))? {
                for id in ids.iter().filter_map(Value::as_nitrite_id) {
                    *scores.entry(*id).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(NitriteId, usize)> = scores.into_iter().collect();
        ranked.sort_by(|(a_id, a_score), (b_id, b_score)| {
            b_score.cmp(a_score).then_with(|| a_id.cmp(b_id))
        });
        Ok(ranked.into_iter().map(|(id, _)| id).collect())
    }

    fn search_wildcard(&self, query: &str) -> NitriteResult<Vec<NitriteId>> {
        if query.split_whitespace().count() > 1 {
            log::error!("Wildcard query {} has more than one term", query);
            return Err(NitriteError::new(
                "Wildcard search supports a single term only",
                ErrorKind::FilterError(FilterErrorKind::MultiWordWildcard),
            ));
        }

        let leading = query.starts_with('*');
        let trailing = query.ends_with('*');
        let term = query.trim_matches('*').to_lowercase();
        if term.is_empty() || term.contains('*') {
            log::error!("Invalid wildcard query {}", query);
            return Err(NitriteError::new(
                &format!("Invalid wildcard query {}", query),
                ErrorKind::FilterError(FilterErrorKind::InvalidWildcard),
            ));
        }

        let matches = |indexed: &str| match (leading, trailing) {
            (true, true) => indexed.contains(term.as_str()),
            (true, false) => indexed.ends_with(term.as_str()),
            _ => indexed.starts_with(term.as_str()),
        };

        let mut nitrite_ids = IndexSet::new();
        IndexMap::Store(self.index_map.clone()).for_each_entry(false, |key, value| {
            if key.as_str().is_some_and(|indexed| matches(indexed)) {
                if let Value::Array(ids) = value {
                    nitrite_ids.extend(ids.iter().filter_map(Value::as_nitrite_id).copied());
                }
            }
            Ok(())
        })?;
        Ok(nitrite_ids.into_iter().collect())
    }
}

use std::cmp::Ordering;

use crate::collection::{Document, NitriteId};
use crate::common::{Value, ELEMENT_FIELD};
use crate::errors::{ErrorKind, FilterErrorKind, NitriteError, NitriteResult};

use super::Filter;

/// Answers text filters while evaluating documents one at a time.
///
/// Text filters can only be answered by a full-text index, so record level
/// evaluation delegates them to the caller's index state.
pub trait TextMatcher: Send + Sync {
    fn text_matches(&self, field: &str, query: &str, id: &NitriteId) -> NitriteResult<bool>;
}

/// A matcher for contexts without full-text indexes. Every text filter fails.
pub struct NoTextIndex;

impl TextMatcher for NoTextIndex {
    fn text_matches(&self, field: &str, _query: &str, _id: &NitriteId) -> NitriteResult<bool> {
        Err(not_text_indexed(field))
    }
}

pub(crate) fn not_text_indexed(field: &str) -> NitriteError {
    log::error!("{} is not full-text indexed", field);
    NitriteError::new(
        &format!("{} is not full-text indexed", field),
        ErrorKind::FilterError(FilterErrorKind::FieldNotIndexedForTextSearch),
    )
}

impl Filter {
    /// Evaluates the filter against one document.
    ///
    /// Range filters fail with `FilterError::NotComparable` when a field value
    /// and the bound belong to different type classes. Every element of an
    /// array field is compared, so a mismatched element fails the whole
    /// evaluation even if another element matches.
    pub fn apply(&self, document: &Document, texts: &dyn TextMatcher) -> NitriteResult<bool> {
        match self {
            Filter::All => Ok(true),
            Filter::Equals { field, value } => {
                let field_value = document.get(field)?;
                Ok(any_element(&field_value, |item| item == value))
            }
            Filter::NotEquals { field, value } => {
                let field_value = document.get(field)?;
                Ok(any_key(&field_value, |item| item != value))
            }
            Filter::GreaterThan { field, value } => {
                compare_elements(&document.get(field)?, value, Ordering::is_gt)
            }
            Filter::GreaterEqual { field, value } => {
                compare_elements(&document.get(field)?, value, Ordering::is_ge)
            }
            Filter::LesserThan { field, value } => {
                compare_elements(&document.get(field)?, value, Ordering::is_lt)
            }
            Filter::LesserEqual { field, value } => {
                compare_elements(&document.get(field)?, value, Ordering::is_le)
            }
            Filter::In { field, values } => {
                let field_value = document.get(field)?;
                Ok(any_element(&field_value, |item| values.contains(item)))
            }
            Filter::NotIn { field, values } => {
                let field_value = document.get(field)?;
                Ok(any_key(&field_value, |item| !values.contains(item)))
            }
            Filter::Regex { field, pattern } => {
                let regex = pattern.regex()?;
                let field_value = document.get(field)?;
                Ok(any_element(&field_value, |item| {
                    item.as_str().is_some_and(|text| regex.is_match(text))
                }))
            }
            Filter::Text { field, query } => match document.existing_id() {
                Some(id) => texts.text_matches(field, query, &id),
                None => Ok(false),
            },
            Filter::ElementMatch { field, filter } => match document.get(field)? {
                Value::Array(items) => {
                    for item in items {
                        let element = match item {
                            Value::Document(element) => element,
                            scalar => {
                                let mut element = Document::new();
                                element.put(ELEMENT_FIELD, scalar)?;
                                element
                            }
                        };
                        if filter.apply(&element, texts)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                _ => Ok(false),
            },
            Filter::And(filters) => {
                for filter in filters {
                    if !filter.apply(document, texts)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for filter in filters {
                    if filter.apply(document, texts)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(inner) => Ok(!inner.apply(document, texts)?),
        }
    }
}

fn any_element(value: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    predicate(value) || any_key(value, predicate)
}

/// Tests the keys an ordered index files `value` under. An empty array
/// counts as null, as it does in the index.
fn any_key(value: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) if items.is_empty() => predicate(&Value::Null),
        Value::Array(items) => items.iter().any(predicate),
        single => predicate(single),
    }
}

fn compare_elements(
    field_value: &Value,
    bound: &Value,
    accept: fn(Ordering) -> bool,
) -> NitriteResult<bool> {
    let items = match field_value {
        Value::Null => return Ok(false),
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };

    let mut matched = false;
    for item in items.iter().filter(|item| !item.is_null()) {
        if accept(item.compare_strict(bound)?) {
            matched = true;
        }
    }
    Ok(matched)
}

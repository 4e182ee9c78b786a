use std::collections::BTreeSet;

use crate::common::Value;
use crate::errors::{ErrorKind, FilterErrorKind, NitriteError, NitriteResult};
use crate::index::IndexMap;

use super::Filter;

#[derive(Clone, Copy)]
enum Bound {
    Exclusive,
    Inclusive,
}

impl Filter {
    /// Answers the filter from one level of an ordered index.
    ///
    /// Returns the matched entry values in key order (descending when
    /// `reverse`). On the last level of an index each value is an array of
    /// ids; on an inner level of a compound index each value is the nested
    /// level to continue matching on. Null keys, which hold documents
    /// missing the field, never satisfy a range bound.
    pub fn apply_on_index(&self, index_map: &IndexMap, reverse: bool) -> NitriteResult<Vec<Value>> {
        match self {
            Filter::Equals { value, .. } => Ok(index_map.get(value)?.into_iter().collect()),
            Filter::In { values, .. } => {
                let keys: BTreeSet<&Value> = values.iter().collect();
                let mut matched = Vec::new();
                let mut lookup = |key: &Value| -> NitriteResult<()> {
                    if let Some(value) = index_map.get(key)? {
                        matched.push(value);
                    }
                    Ok(())
                };
                if reverse {
                    keys.into_iter().rev().try_for_each(&mut lookup)?;
                } else {
                    keys.into_iter().try_for_each(&mut lookup)?;
                }
                Ok(matched)
            }
            Filter::NotEquals { value, .. } => scan_keys(index_map, reverse, |key| Ok(key != value)),
            Filter::NotIn { values, .. } => {
                scan_keys(index_map, reverse, |key| Ok(!values.contains(key)))
            }
            Filter::Regex { pattern, .. } => {
                let regex = pattern.regex()?;
                scan_keys(index_map, reverse, |key| {
                    Ok(key.as_str().is_some_and(|text| regex.is_match(text)))
                })
            }
            Filter::GreaterThan { value, .. } => {
                ensure_comparable_keys(index_map, value)?;
                walk_above(index_map, value, Bound::Exclusive, reverse)
            }
            Filter::GreaterEqual { value, .. } => {
                ensure_comparable_keys(index_map, value)?;
                walk_above(index_map, value, Bound::Inclusive, reverse)
            }
            Filter::LesserThan { value, .. } => {
                ensure_comparable_keys(index_map, value)?;
                walk_below(index_map, value, Bound::Exclusive, reverse)
            }
            Filter::LesserEqual { value, .. } => {
                ensure_comparable_keys(index_map, value)?;
                walk_below(index_map, value, Bound::Inclusive, reverse)
            }
            other => {
                log::error!("{} cannot be answered by an ordered index", other);
                Err(NitriteError::new(
                    &format!("{} cannot be answered by an ordered index", other),
                    ErrorKind::FilterError(FilterErrorKind::InvalidFilter),
                ))
            }
        }
    }
}

/// Fails with `NotComparable` when the index holds non-null keys of another
/// type class than `bound`. Keys are ordered by type class, so checking the
/// smallest and the largest non-null keys covers every key.
fn ensure_comparable_keys(index_map: &IndexMap, bound: &Value) -> NitriteResult<()> {
    if let Some(first) = index_map.higher_key(&Value::Null)? {
        first.compare_strict(bound)?;
    }
    if let Some(last) = index_map.last_key()? {
        if !last.is_null() {
            last.compare_strict(bound)?;
        }
    }
    Ok(())
}

fn walk_above(
    index_map: &IndexMap,
    bound: &Value,
    inclusion: Bound,
    reverse: bool,
) -> NitriteResult<Vec<Value>> {
    let accept = |key: &Value| match inclusion {
        Bound::Exclusive => key > bound,
        Bound::Inclusive => key >= bound,
    };

    let mut matched = Vec::new();
    if reverse {
        let mut next = index_map.last_key()?;
        while let Some(key) = next {
            if !accept(&key) {
                break;
            }
            matched.extend(index_map.get(&key)?);
            next = index_map.lower_key(&key)?;
        }
    } else {
        let mut next = match inclusion {
            Bound::Exclusive => index_map.higher_key(bound)?,
            Bound::Inclusive => index_map.ceiling_key(bound)?,
        };
        while let Some(key) = next {
            matched.extend(index_map.get(&key)?);
            next = index_map.higher_key(&key)?;
        }
    }
    Ok(matched)
}

fn walk_below(
    index_map: &IndexMap,
    bound: &Value,
    inclusion: Bound,
    reverse: bool,
) -> NitriteResult<Vec<Value>> {
    let accept = |key: &Value| match inclusion {
        Bound::Exclusive => key < bound,
        Bound::Inclusive => key <= bound,
    };

    let mut matched = Vec::new();
    if reverse {
        let mut next = match inclusion {
            Bound::Exclusive => index_map.lower_key(bound)?,
            Bound::Inclusive => index_map.floor_key(bound)?,
        };
        while let Some(key) = next {
            if key.is_null() {
                break;
            }
            matched.extend(index_map.get(&key)?);
            next = index_map.lower_key(&key)?;
        }
    } else {
        let mut next = index_map.higher_key(&Value::Null)?;
        while let Some(key) = next {
            if !accept(&key) {
                break;
            }
            matched.extend(index_map.get(&key)?);
            next = index_map.higher_key(&key)?;
        }
    }
    Ok(matched)
}

fn scan_keys(
    index_map: &IndexMap,
    reverse: bool,
    accept: impl Fn(&Value) -> NitriteResult<bool>,
) -> NitriteResult<Vec<Value>> {
    let mut matched = Vec::new();
    index_map.for_each_entry(reverse, |key, value| {
        if accept(key)? {
            matched.push(value);
        }
        Ok(())
    })?;
    Ok(matched)
}

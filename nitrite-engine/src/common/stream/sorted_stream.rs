use icu_collator::CollatorBorrowed;
use std::cmp::Ordering;

use crate::collection::Document;
use crate::common::{NullOrder, SortOrder, Value};
use crate::errors::{NitriteError, NitriteResult};

/// Blocking in-memory sort.
///
/// An array valued field sorts by its smallest element in ascending order
/// and by its largest in descending order, which is where an index walk
/// meets the document first. Equal keys fall back to ascending id order.
pub(crate) struct SortedStream {
    sorted: std::vec::IntoIter<Document>,
    error: Option<NitriteError>,
}

struct SortEntry {
    keys: Vec<Value>,
    document: Document,
}

impl SortedStream {
    pub(crate) fn new<I: Iterator<Item = NitriteResult<Document>>>(
        raw_stream: I,
        sort_order: &[(String, SortOrder)],
        null_order: NullOrder,
        collator: Option<CollatorBorrowed<'static>>,
    ) -> Self {
        let mut entries = Vec::new();
        for item in raw_stream {
            let entry = item.and_then(|document| {
                let keys = sort_order
                    .iter()
                    .map(|(field, order)| sort_key(&document, field, *order))
                    .collect::<NitriteResult<Vec<_>>>()?;
                Ok(SortEntry { keys, document })
            });
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    return SortedStream {
                        sorted: Vec::new().into_iter(),
                        error: Some(e),
                    }
                }
            }
        }

        entries.sort_by(|a, b| {
            for (i, (_, order)) in sort_order.iter().enumerate() {
                let cmp = compare_keys(&a.keys[i], &b.keys[i], null_order, collator.as_ref());
                if cmp != Ordering::Equal {
                    return if order.is_reverse() { cmp.reverse() } else { cmp };
                }
            }
            a.document.existing_id().cmp(&b.document.existing_id())
        });

        SortedStream {
            sorted: entries
                .into_iter()
                .map(|entry| entry.document)
                .collect::<Vec<_>>()
                .into_iter(),
            error: None,
        }
    }
}

fn sort_key(document: &Document, field: &str, order: SortOrder) -> NitriteResult<Value> {
    Ok(match document.get(field)? {
        Value::Array(items) => {
            let picked = if order.is_reverse() {
                items.into_iter().max()
            } else {
                items.into_iter().min()
            };
            picked.unwrap_or(Value::Null)
        }
        value => value,
    })
}

fn compare_keys(
    a: &Value,
    b: &Value,
    null_order: NullOrder,
    collator: Option<&CollatorBorrowed<'static>>,
) -> Ordering {
    let null_rank = match null_order {
        NullOrder::First => Ordering::Less,
        NullOrder::Last => Ordering::Greater,
    };

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => null_rank,
        (_, Value::Null) => null_rank.reverse(),
        (Value::String(x), Value::String(y)) => match collator {
            Some(collator) => collator.compare(x, y),
            None => x.cmp(y),
        },
        _ => a.cmp(b),
    }
}

impl Iterator for SortedStream {
    type Item = NitriteResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.error.take() {
            return Some(Err(error));
        }
        self.sorted.next().map(Ok)
    }
}

use im::OrdMap;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::collection::NitriteId;
use crate::common::{
    Value, DOC_ID, DOC_MODIFIED, DOC_REVISION, DOC_SOURCE, FIELD_SEPARATOR, RESERVED_FIELDS,
};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// An ordered field to value record.
///
/// Field names containing `.` address embedded documents, and numeric
/// segments address array elements (`"books.0.tag"`). A non-numeric segment
/// applied to an array decomposes it: `"books.tag"` yields the distinct tags
/// of every book.
///
/// Cloning is cheap and clones are independent: the backing persistent map
/// shares structure but never observes later writes to another clone.
#[derive(Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document { data: OrdMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> NitriteResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(NitriteError::new(
                "Document does not support empty key",
                ErrorKind::ValidationError,
            ));
        }

        let value = value.into();
        if key == DOC_ID && !value.is_nitrite_id() {
            log::error!("Document id is an auto generated field and cannot be set manually");
            return Err(NitriteError::new(
                "Document id is an auto generated field and cannot be set manually",
                ErrorKind::InvalidId,
            ));
        }

        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.into_owned(), value);
            Ok(())
        }
    }

    /// Returns the value at `key`, or `Value::Null` when the path is absent.
    pub fn get(&self, key: &str) -> NitriteResult<Value> {
        match self.data.get(key) {
            Some(value) => Ok(value.clone()),
            None if key.contains(FIELD_SEPARATOR) => self.get_by_embedded_key(key),
            None => Ok(Value::Null),
        }
    }

    /// Returns the document id, assigning a fresh one if absent.
    pub fn id(&mut self) -> NitriteId {
        if let Some(Value::NitriteId(id)) = self.data.get(DOC_ID) {
            return *id;
        }

        let nitrite_id = NitriteId::new();
        self.data.insert(DOC_ID.to_string(), Value::NitriteId(nitrite_id));
        nitrite_id
    }

    pub fn existing_id(&self) -> Option<NitriteId> {
        match self.data.get(DOC_ID) {
            Some(Value::NitriteId(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// User fields in dotted form, embedded documents flattened, system
    /// fields excluded.
    pub fn fields(&self) -> FieldVec {
        self.fields_with_prefix("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field) || self.fields().iter().any(|f| f == field)
    }

    pub fn remove(&mut self, key: &str) -> NitriteResult<()> {
        if key.contains(FIELD_SEPARATOR) && !self.data.contains_key(key) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_remove(&splits)
        } else {
            self.data.remove(key);
            Ok(())
        }
    }

    /// Copies every field of `other` into this document, merging embedded
    /// documents recursively.
    pub fn merge(&mut self, other: &Document) -> NitriteResult<()> {
        for (key, value) in other.data.iter() {
            match (value, self.data.get(key)) {
                (Value::Document(patch), Some(Value::Document(existing))) => {
                    let mut nested = existing.clone();
                    nested.merge(patch)?;
                    self.data.insert(key.clone(), Value::Document(nested));
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    pub fn revision(&self) -> i64 {
        self.data
            .get(DOC_REVISION)
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    pub fn source(&self) -> String {
        self.data
            .get(DOC_SOURCE)
            .and_then(|v| v.as_string().cloned())
            .unwrap_or_default()
    }

    pub fn last_modified_since_epoch(&self) -> i64 {
        self.data
            .get(DOC_MODIFIED)
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    pub(crate) fn put_system(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub(crate) fn remove_system(&mut self, key: &str) {
        self.data.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    fn fields_with_prefix(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();
        for (key, value) in self.data.iter() {
            if RESERVED_FIELDS.contains(&key.as_str()) || key.is_empty() {
                continue;
            }

            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) => fields.extend(doc.fields_with_prefix(&field)),
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> NitriteResult<()> {
        let Some((key, rest)) = splits.split_first() else {
            return Err(empty_key_error());
        };
        if key.is_empty() {
            return Err(empty_key_error());
        }

        if rest.is_empty() {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let mut nested = match self.data.get(*key) {
            Some(Value::Document(obj)) => obj.clone(),
            _ => Document::new(),
        };
        nested.deep_put(rest, value)?;
        self.data.insert(key.to_string(), Value::Document(nested));
        Ok(())
    }

    fn deep_remove(&mut self, splits: &[&str]) -> NitriteResult<()> {
        let Some((key, rest)) = splits.split_first() else {
            return Err(empty_key_error());
        };
        if key.is_empty() {
            return Err(empty_key_error());
        }

        if rest.is_empty() {
            self.data.remove(*key);
            return Ok(());
        }

        if let Some(Value::Document(obj)) = self.data.get(*key) {
            let mut nested = obj.clone();
            nested.deep_remove(rest)?;
            if nested.is_empty() {
                self.data.remove(*key);
            } else {
                self.data.insert(key.to_string(), Value::Document(nested));
            }
        }
        Ok(())
    }

    fn get_by_embedded_key(&self, key: &str) -> NitriteResult<Value> {
        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        let Some((first, rest)) = splits.split_first() else {
            return Ok(Value::Null);
        };
        if first.is_empty() {
            return Err(empty_key_error());
        }
        recursive_get(self.data.get(*first), rest)
    }
}

fn empty_key_error() -> NitriteError {
    log::error!("Document does not support empty key");
    NitriteError::new(
        "Document does not support empty key",
        ErrorKind::ValidationError,
    )
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> NitriteResult<Value> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    let Some((key, rest)) = splits.split_first() else {
        return Ok(value.clone());
    };
    if key.is_empty() {
        return Err(empty_key_error());
    }

    match value {
        Value::Document(obj) => recursive_get(obj.data.get(*key), rest),
        Value::Array(items) => match key.parse::<usize>() {
            Ok(index) => match items.get(index) {
                Some(item) => recursive_get(Some(item), rest),
                None => Ok(Value::Null),
            },
            Err(_) => decompose(items, splits),
        },
        _ => Ok(Value::Null),
    }
}

fn decompose(items: &[Value], splits: &[&str]) -> NitriteResult<Value> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match recursive_get(Some(item), splits)? {
            Value::Array(nested) => values.extend(nested),
            Value::Null => {}
            value => values.push(value),
        }
    }
    Ok(Value::Array(values.into_iter().unique().collect()))
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", key, value)?;
        }
        write!(f, "}}")
    }
}

#[doc(hidden)]
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Builds a [`Document`] from JSON-like literals.
///
/// ```rust
/// use nitrite_engine::doc;
///
/// let doc = doc! { name: "a", age: 30, tags: ["x", "y"], address: { city: "NY" } };
/// assert_eq!(doc.get("address.city").ok(), Some("NY".into()));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

use crate::collection::{Document, NitriteId};
use crate::common::{SortOrder, Value, NAME_SEPARATOR};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

/// Ordered list of field names identifying a (possibly compound) index key.
///
/// Two `Fields` are equal when their names match in the same order.
#[derive(Clone, Debug)]
pub struct Fields {
    inner: Arc<FieldsInner>,
}

#[derive(Debug)]
struct FieldsInner {
    field_names: Vec<String>,
    encoded: String,
}

impl Fields {
    pub fn with_names(field_names: Vec<&str>) -> NitriteResult<Fields> {
        if field_names.is_empty() {
            log::error!("Field names cannot be empty");
            return Err(NitriteError::new(
                "Field names cannot be empty",
                ErrorKind::ValidationError,
            ));
        }
        if field_names.iter().any(|name| name.trim().is_empty()) {
            log::error!("Field name cannot be blank: {:?}", field_names);
            return Err(NitriteError::new(
                "Field name cannot be blank",
                ErrorKind::ValidationError,
            ));
        }

        let field_names: Vec<String> = field_names.iter().map(|s| s.to_string()).collect();
        let encoded = field_names.join(NAME_SEPARATOR);
        Ok(Fields {
            inner: Arc::new(FieldsInner {
                field_names,
                encoded,
            }),
        })
    }

    pub fn field_names(&self) -> &[String] {
        &self.inner.field_names
    }

    pub fn len(&self) -> usize {
        self.inner.field_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.field_names.is_empty()
    }

    pub fn first(&self) -> &str {
        self.inner.field_names.first().map(|s| s.as_str()).unwrap_or_default()
    }

    pub fn encoded_names(&self) -> &str {
        &self.inner.encoded
    }

    pub fn starts_with(&self, prefix: &Fields) -> bool {
        let prefix_names = prefix.field_names();
        prefix_names.len() <= self.len()
            && self.field_names().iter().zip(prefix_names).all(|(a, b)| a == b)
    }

    pub fn to_value(&self) -> Value {
        Value::from_vec(self.inner.field_names.clone())
    }

    pub fn from_value(value: &Value) -> NitriteResult<Fields> {
        let Some(items) = value.as_array() else {
            log::error!("Fields value {} is not an array", value);
            return Err(NitriteError::new(
                "Fields value is not an array",
                ErrorKind::ValidationError,
            ));
        };

        let mut names = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(name) => names.push(name),
                None => {
                    log::error!("Field name must be a string, got {}", item);
                    return Err(NitriteError::new(
                        "Field name must be a string",
                        ErrorKind::ValidationError,
                    ));
                }
            }
        }
        Fields::with_names(names)
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encoded_names())
    }
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.inner.field_names == other.inner.field_names
    }
}

impl Eq for Fields {}

impl Ord for Fields {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.field_names.cmp(&other.inner.field_names)
    }
}

impl PartialOrd for Fields {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Fields {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.field_names.hash(state);
    }
}

/// Sort specification: field names with a direction each, most significant
/// first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SortableFields {
    sorting_order: Vec<(String, SortOrder)>,
}

impl SortableFields {
    pub fn new() -> SortableFields {
        Self::default()
    }

    pub fn add_field(self, field_name: &str) -> SortableFields {
        self.add_sorted_field(field_name, SortOrder::Ascending)
    }

    pub fn add_sorted_field(mut self, field_name: &str, sort_order: SortOrder) -> SortableFields {
        self.sorting_order.push((field_name.to_string(), sort_order));
        self
    }

    pub fn sorting_order(&self) -> &[(String, SortOrder)] {
        &self.sorting_order
    }

    pub fn is_empty(&self) -> bool {
        self.sorting_order.is_empty()
    }
}

/// The indexed values of one document for one index.
#[derive(Debug, Clone)]
pub struct FieldValues {
    nitrite_id: NitriteId,
    fields: Fields,
    values: Vec<Value>,
}

impl FieldValues {
    pub fn new(nitrite_id: NitriteId, fields: Fields, values: Vec<Value>) -> FieldValues {
        FieldValues {
            nitrite_id,
            fields,
            values,
        }
    }

    /// Reads every field of `fields` from `document`. Absent fields read as
    /// `Value::Null`.
    pub fn from_document(
        nitrite_id: NitriteId,
        document: &Document,
        fields: &Fields,
    ) -> NitriteResult<FieldValues> {
        let values = fields
            .field_names()
            .iter()
            .map(|name| document.get(name))
            .collect::<NitriteResult<Vec<_>>>()?;
        Ok(FieldValues::new(nitrite_id, fields.clone(), values))
    }

    pub fn nitrite_id(&self) -> &NitriteId {
        &self.nitrite_id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn first_value(&self) -> &Value {
        self.values.first().unwrap_or(&Value::Null)
    }
}

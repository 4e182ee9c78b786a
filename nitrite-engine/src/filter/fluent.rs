use crate::common::Value;

use super::{Filter, RegexPattern};

/// Starts a filter on `field_name`.
///
/// ```rust
/// use nitrite_engine::filter::field;
///
/// let adults = field("age").gte(18);
/// let named = field("name").in_array(vec!["a", "b"]);
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// Builder for filters on one field.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Equals {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::NotEquals {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::GreaterThan {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::GreaterEqual {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::LesserThan {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::LesserEqual {
            field: self.field_name,
            value: value.into(),
        }
    }

    /// Matches when the field equals any of `values`.
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::In {
            field: self.field_name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::NotIn {
            field: self.field_name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches string values containing a match of `pattern`.
    pub fn regex(self, pattern: &str) -> Filter {
        Filter::Regex {
            field: self.field_name,
            pattern: RegexPattern::new(pattern),
        }
    }

    /// Full-text search. A leading or trailing `*` turns the query into a
    /// single-term suffix, prefix or substring search.
    pub fn text(self, query: &str) -> Filter {
        Filter::Text {
            field: self.field_name,
            query: query.to_string(),
        }
    }

    pub fn elem_match(self, filter: Filter) -> Filter {
        Filter::ElementMatch {
            field: self.field_name,
            filter: Box::new(filter),
        }
    }
}

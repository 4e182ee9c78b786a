use crate::collection::NitriteId;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, FilterErrorKind, NitriteError, NitriteResult};
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A query predicate over documents.
///
/// Filters form a closed expression tree. Every variant can be evaluated
/// against a single document ([`Filter::apply`]), and the comparison variants
/// can also be answered from an ordered index without reading documents.
/// Both evaluation modes return the same matches.
///
/// Array valued fields match when any element matches. A missing field reads
/// as `Value::Null`, so `Equals(f, Null)` matches documents without `f` and
/// `Not(Equals(f, v))` matches them too.
///
/// # Examples
///
/// ```rust
/// use nitrite_engine::filter::{field, and};
///
/// let filter = and(vec![field("age").gte(20), field("age").lt(35)]);
/// assert_eq!(filter.to_string(), "((age >= 20) && (age < 35))");
/// ```
#[derive(Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    GreaterEqual { field: String, value: Value },
    LesserThan { field: String, value: Value },
    LesserEqual { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    Regex { field: String, pattern: RegexPattern },
    /// Full-text search; requires a full-text index on `field`.
    Text { field: String, query: String },
    /// Applies `filter` to each element of an array field. Scalar elements
    /// are visible to the inner filter under the field name `$`.
    ElementMatch { field: String, filter: Box<Filter> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// A compiled regular expression that remembers its source text.
#[derive(Clone)]
pub struct RegexPattern {
    source: String,
    compiled: Result<Arc<Regex>, regex::Error>,
}

impl RegexPattern {
    pub fn new(source: &str) -> Self {
        RegexPattern {
            source: source.to_string(),
            compiled: Regex::new(source).map(Arc::new),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> NitriteResult<&Regex> {
        match &self.compiled {
            Ok(regex) => Ok(regex),
            Err(e) => {
                log::error!("Invalid regular expression {}: {}", self.source, e);
                Err(NitriteError::from(e.clone()))
            }
        }
    }

    pub(crate) fn is_match(&self, text: &str) -> NitriteResult<bool> {
        Ok(self.regex()?.is_match(text))
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Matches every document.
pub fn all() -> Filter {
    Filter::All
}

/// Matches the document with the given id.
pub fn by_id(id: NitriteId) -> Filter {
    Filter::Equals {
        field: DOC_ID.to_string(),
        value: Value::NitriteId(id),
    }
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

impl Filter {
    pub fn and(self, other: Filter) -> Filter {
        Filter::And(vec![self, other])
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(vec![self, other])
    }

    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// The field a leaf filter inspects. Logical filters have none.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Filter::Equals { field, .. }
            | Filter::NotEquals { field, .. }
            | Filter::GreaterThan { field, .. }
            | Filter::GreaterEqual { field, .. }
            | Filter::LesserThan { field, .. }
            | Filter::LesserEqual { field, .. }
            | Filter::In { field, .. }
            | Filter::NotIn { field, .. }
            | Filter::Regex { field, .. }
            | Filter::Text { field, .. }
            | Filter::ElementMatch { field, .. } => Some(field),
            Filter::All | Filter::And(_) | Filter::Or(_) | Filter::Not(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Filter::Text { .. })
    }

    /// Whether the filter can be answered by an ordered index on its field.
    pub fn is_index_eligible(&self) -> bool {
        fn scalar(value: &Value) -> bool {
            value.is_null() || value.is_comparable()
        }

        match self {
            Filter::Equals { field, value } | Filter::NotEquals { field, value } => {
                field != DOC_ID && scalar(value)
            }
            Filter::GreaterThan { field, value }
            | Filter::GreaterEqual { field, value }
            | Filter::LesserThan { field, value }
            | Filter::LesserEqual { field, value } => field != DOC_ID && value.is_comparable(),
            Filter::In { field, values } | Filter::NotIn { field, values } => {
                field != DOC_ID && !values.is_empty() && values.iter().all(scalar)
            }
            Filter::Regex { field, pattern } => field != DOC_ID && pattern.regex().is_ok(),
            _ => false,
        }
    }

    /// The id of a by-id lookup filter.
    pub(crate) fn id_lookup(&self) -> Option<NitriteId> {
        match self {
            Filter::Equals { field, value: Value::NitriteId(id) } if field == DOC_ID => Some(*id),
            _ => None,
        }
    }

    /// Splits nested `And` nodes into one flat operand list.
    pub(crate) fn flatten_and(&self) -> Vec<Filter> {
        match self {
            Filter::And(filters) => filters.iter().flat_map(Filter::flatten_and).collect(),
            other => vec![other.clone()],
        }
    }

    /// Splits nested `Or` nodes into one flat operand list.
    pub(crate) fn flatten_or(&self) -> Vec<Filter> {
        match self {
            Filter::Or(filters) => filters.iter().flat_map(Filter::flatten_or).collect(),
            other => vec![other.clone()],
        }
    }

    /// Text filters anywhere in the tree, outside element matches.
    pub(crate) fn text_filters(&self) -> Vec<(&str, &str)> {
        match self {
            Filter::Text { field, query } => vec![(field.as_str(), query.as_str())],
            Filter::And(filters) | Filter::Or(filters) => {
                filters.iter().flat_map(Filter::text_filters).collect()
            }
            Filter::Not(inner) => inner.text_filters(),
            _ => Vec::new(),
        }
    }

    /// Checks arguments before evaluation.
    ///
    /// Rejects blank field names, null range bounds, empty operand lists,
    /// invalid regular expressions and element matches that nest another
    /// element match or a text filter.
    pub fn validate(&self) -> NitriteResult<()> {
        if let Some(field) = self.field_name() {
            if field.trim().is_empty() {
                return Err(validation_error(&format!("Field name cannot be empty in {}", self)));
            }
        }

        match self {
            Filter::All | Filter::Equals { .. } | Filter::NotEquals { .. } => Ok(()),
            Filter::GreaterThan { value, .. }
            | Filter::GreaterEqual { value, .. }
            | Filter::LesserThan { value, .. }
            | Filter::LesserEqual { value, .. } => {
                if value.is_comparable() {
                    Ok(())
                } else {
                    Err(validation_error(&format!(
                        "A range filter needs a comparable value, found {} in {}",
                        value.type_name(),
                        self
                    )))
                }
            }
            Filter::In { values, .. } | Filter::NotIn { values, .. } => {
                if values.is_empty() {
                    Err(validation_error(&format!("No values given for {}", self)))
                } else {
                    Ok(())
                }
            }
            Filter::Regex { pattern, .. } => pattern.regex().map(|_| ()),
            Filter::Text { query, .. } => {
                if query.trim().is_empty() {
                    Err(validation_error("Text search query cannot be empty"))
                } else {
                    Ok(())
                }
            }
            Filter::ElementMatch { filter, .. } => {
                if filter.nests_element_match_or_text() {
                    log::error!("Element match cannot contain {}", filter);
                    return Err(NitriteError::new(
                        &format!("Element match cannot contain {}", filter),
                        ErrorKind::FilterError(FilterErrorKind::UnsupportedNesting),
                    ));
                }
                filter.validate()
            }
            Filter::And(filters) | Filter::Or(filters) => {
                if filters.is_empty() {
                    return Err(validation_error("A logical filter needs at least one operand"));
                }
                filters.iter().try_for_each(Filter::validate)
            }
            Filter::Not(inner) => inner.validate(),
        }
    }

    fn nests_element_match_or_text(&self) -> bool {
        match self {
            Filter::ElementMatch { .. } | Filter::Text { .. } => true,
            Filter::And(filters) | Filter::Or(filters) => {
                filters.iter().any(Filter::nests_element_match_or_text)
            }
            Filter::Not(inner) => inner.nests_element_match_or_text(),
            _ => false,
        }
    }
}

fn validation_error(message: &str) -> NitriteError {
    log::error!("{}", message);
    NitriteError::new(message, ErrorKind::ValidationError)
}

fn write_list(f: &mut Formatter<'_>, values: &[Value]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    write!(f, "]")
}

fn write_joined(f: &mut Formatter<'_>, filters: &[Filter], op: &str) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", filter)?;
    }
    write!(f, ")")
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "AllFilter"),
            Filter::Equals { field, value } => write!(f, "({} == {})", field, value),
            Filter::NotEquals { field, value } => write!(f, "({} != {})", field, value),
            Filter::GreaterThan { field, value } => write!(f, "({} > {})", field, value),
            Filter::GreaterEqual { field, value } => write!(f, "({} >= {})", field, value),
            Filter::LesserThan { field, value } => write!(f, "({} < {})", field, value),
            Filter::LesserEqual { field, value } => write!(f, "({} <= {})", field, value),
            Filter::In { field, values } => {
                write!(f, "({} in ", field)?;
                write_list(f, values)?;
                write!(f, ")")
            }
            Filter::NotIn { field, values } => {
                write!(f, "({} not in ", field)?;
                write_list(f, values)?;
                write!(f, ")")
            }
            Filter::Regex { field, pattern } => write!(f, "({} regex {:?})", field, pattern.source()),
            Filter::Text { field, query } => write!(f, "({} like {:?})", field, query),
            Filter::ElementMatch { field, filter } => write!(f, "({} elemMatch {})", field, filter),
            Filter::And(filters) => write_joined(f, filters, "&&"),
            Filter::Or(filters) => write_joined(f, filters, "||"),
            Filter::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::field;

    #[test]
    fn display_renders_tree() {
        let filter = field("a").eq(1).and(field("b").text("x").or(field("c").ne("y")).not());
        assert_eq!(filter.to_string(), "((a == 1) && !((b like \"x\") || (c != \"y\")))");
    }

    #[test]
    fn flatten_and_merges_nested_groups() {
        let filter = and(vec![field("a").eq(1), and(vec![field("b").eq(2), field("c").eq(3)])]);
        let flat = filter.flatten_and();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2], field("c").eq(3));
    }

    #[test]
    fn flatten_or_merges_nested_groups() {
        let filter = or(vec![or(vec![field("a").eq(1), field("b").eq(2)]), field("c").eq(3)]);
        assert_eq!(filter.flatten_or().len(), 3);
    }

    #[test]
    fn validate_rejects_null_range_bound() {
        let err = field("a").gt(Value::Null).validate().err();
        assert!(err.is_some_and(|e| e.kind() == &ErrorKind::ValidationError));
    }

    #[test]
    fn validate_rejects_blank_field() {
        assert!(field(" ").eq(1).validate().is_err());
    }

    #[test]
    fn validate_rejects_nested_element_match() {
        let inner = field("b").elem_match(field("$").eq(1));
        let err = field("a").elem_match(inner).validate().err();
        assert!(err.is_some_and(|e| e.is_filter(FilterErrorKind::UnsupportedNesting)));

        let err = field("a").elem_match(not(field("x").text("y"))).validate().err();
        assert!(err.is_some_and(|e| e.is_filter(FilterErrorKind::UnsupportedNesting)));
    }

    #[test]
    fn validate_rejects_bad_regex() {
        let err = field("a").regex("(").validate().err();
        assert!(err.is_some_and(|e| e.is_filter(FilterErrorKind::InvalidFilter)));
    }

    #[test]
    fn index_eligibility() {
        assert!(field("a").eq(1).is_index_eligible());
        assert!(field("a").eq(Value::Null).is_index_eligible());
        assert!(!field("a").eq(vec![1, 2]).is_index_eligible());
        assert!(field("a").gte(1).is_index_eligible());
        assert!(field("a").in_array(vec![1, 2]).is_index_eligible());
        assert!(!field("a").text("x").is_index_eligible());
        assert!(!field("a").eq(1).not().is_index_eligible());
        assert!(!by_id(NitriteId::new()).is_index_eligible());
    }

    #[test]
    fn id_lookup_detects_by_id_filter() {
        let id = NitriteId::new();
        assert_eq!(by_id(id).id_lookup(), Some(id));
        assert_eq!(field("a").eq(1).id_lookup(), None);
    }

    #[test]
    fn text_filters_skip_element_match() {
        let filter = and(vec![field("a").text("x"), not(field("b").text("y"))]);
        assert_eq!(filter.text_filters(), vec![("a", "x"), ("b", "y")]);
    }
}

use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Failure modes of index catalog and index build operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum IndexingErrorKind {
    /// An index already exists on the field set.
    AlreadyExists,
    /// Another build for the same field set is running.
    BuildInProgress,
    /// No index exists on the field set.
    NotIndexed,
    /// A full-text index met a value that is not a string.
    NonStringValue,
    /// The index cannot be dropped while it is being built.
    CannotDropWhileBuilding,
    /// A build scan failed part way through.
    BuildFailed,
}

/// Failure modes of filter construction and evaluation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FilterErrorKind {
    /// Two values of incompatible types were ordered against each other.
    NotComparable,
    /// A text query consisting only of `*`.
    InvalidWildcard,
    /// A wildcard text query with more than one term.
    MultiWordWildcard,
    /// An element match filter wrapping another element match or a text filter.
    UnsupportedNesting,
    /// A text filter on a field without a full-text index.
    FieldNotIndexedForTextSearch,
    /// A malformed filter, such as an invalid regular expression.
    InvalidFilter,
}

/// Error kinds for engine operations.
///
/// The kinds are typed so callers can branch on constraint violations,
/// configuration mistakes and transient build conflicts.
///
/// # Examples
///
/// ```rust
/// use nitrite_engine::errors::{ErrorKind, IndexingErrorKind, NitriteError};
///
/// let err = NitriteError::new("index exists", ErrorKind::IndexingError(IndexingErrorKind::AlreadyExists));
/// assert!(err.is_indexing(IndexingErrorKind::AlreadyExists));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    IndexingError(IndexingErrorKind),
    /// A second distinct document would occupy a unique key.
    UniqueConstraintViolation,
    FilterError(FilterErrorKind),
    /// Null or empty arguments at a public entry point.
    ValidationError,
    InvalidId,
    NotFound,
    /// The operation is not valid in the current state.
    InvalidOperation,
    StoreError,
    StoreAlreadyClosed,
    EventError,
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::IndexingError(kind) => write!(f, "Indexing error ({:?})", kind),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::FilterError(kind) => write!(f, "Filter error ({:?})", kind),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidId => write!(f, "Invalid id"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type for all engine operations.
///
/// Supports a cause chain, a captured backtrace and, for operations that fan
/// out over several targets, the full list of individual failures.
#[derive(Clone)]
pub struct NitriteError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<NitriteError>>,
    related: Vec<NitriteError>,
    backtrace: Atomic<Backtrace>,
}

impl NitriteError {
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        NitriteError {
            message: message.to_string(),
            error_kind,
            cause: None,
            related: Vec::new(),
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: NitriteError) -> Self {
        NitriteError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            related: Vec::new(),
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    /// Combines several failures into one error. Every failure stays
    /// reachable through [`NitriteError::related`].
    pub fn aggregate(message: &str, error_kind: ErrorKind, errors: Vec<NitriteError>) -> Self {
        let details = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        NitriteError {
            message: format!("{} [{} failure(s): {}]", message, errors.len(), details),
            error_kind,
            cause: None,
            related: errors,
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&NitriteError> {
        self.cause.as_deref()
    }

    pub fn related(&self) -> &[NitriteError] {
        &self.related
    }

    pub fn is_indexing(&self, kind: IndexingErrorKind) -> bool {
        self.error_kind == ErrorKind::IndexingError(kind)
    }

    pub fn is_filter(&self, kind: FilterErrorKind) -> bool {
        self.error_kind == ErrorKind::FilterError(kind)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.error_kind == ErrorKind::UniqueConstraintViolation
    }
}

impl Display for NitriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for NitriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => {
                let mut backtrace = self.backtrace.write();
                backtrace.resolve();
                write!(f, "{} ({})\n{:?}", self.message, self.error_kind, backtrace)
            }
        }
    }
}

impl Error for NitriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

pub type NitriteResult<T> = Result<T, NitriteError>;

impl From<std::io::Error> for NitriteError {
    fn from(err: std::io::Error) -> Self {
        NitriteError::new(&format!("IO error: {}", err), ErrorKind::StoreError)
    }
}

impl From<std::fmt::Error> for NitriteError {
    fn from(err: std::fmt::Error) -> Self {
        NitriteError::new(&format!("Formatting error: {}", err), ErrorKind::InternalError)
    }
}

impl From<regex::Error> for NitriteError {
    fn from(err: regex::Error) -> Self {
        NitriteError::new(
            &format!("Invalid regular expression: {}", err),
            ErrorKind::FilterError(FilterErrorKind::InvalidFilter),
        )
    }
}

impl From<String> for NitriteError {
    fn from(msg: String) -> Self {
        NitriteError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for NitriteError {
    fn from(msg: &str) -> Self {
        NitriteError::new(msg, ErrorKind::InternalError)
    }
}

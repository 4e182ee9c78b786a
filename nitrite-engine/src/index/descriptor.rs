use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::collection::Document;
use crate::common::{Fields, FULL_TEXT_INDEX, NON_UNIQUE_INDEX, UNIQUE_INDEX};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};

/// The kind of structure backing an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    /// Ordered index allowing one document per key.
    Unique,
    /// Ordered index allowing many documents per key.
    NonUnique,
    /// Inverted token index over string values.
    FullText,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Unique => UNIQUE_INDEX,
            IndexKind::NonUnique => NON_UNIQUE_INDEX,
            IndexKind::FullText => FULL_TEXT_INDEX,
        }
    }

    pub fn parse(name: &str) -> NitriteResult<IndexKind> {
        match name {
            UNIQUE_INDEX => Ok(IndexKind::Unique),
            NON_UNIQUE_INDEX => Ok(IndexKind::NonUnique),
            FULL_TEXT_INDEX => Ok(IndexKind::FullText),
            other => {
                log::error!("Unknown index kind {}", other);
                Err(NitriteError::new(
                    &format!("Unknown index kind {}", other),
                    ErrorKind::ValidationError,
                ))
            }
        }
    }

    pub fn is_comparable(&self) -> bool {
        !matches!(self, IndexKind::FullText)
    }
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The durable definition of an index: its fields, kind and collection.
///
/// Descriptors are immutable. Within a collection an index is identified by
/// its fields alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexDescriptor {
    inner: Arc<IndexDescriptorInner>,
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct IndexDescriptorInner {
    index_fields: Fields,
    index_kind: IndexKind,
    collection_name: String,
}

impl IndexDescriptor {
    pub fn new(index_kind: IndexKind, index_fields: Fields, collection_name: &str) -> Self {
        IndexDescriptor {
            inner: Arc::new(IndexDescriptorInner {
                index_fields,
                index_kind,
                collection_name: collection_name.to_string(),
            }),
        }
    }

    pub fn index_kind(&self) -> IndexKind {
        self.inner.index_kind
    }

    pub fn index_fields(&self) -> &Fields {
        &self.inner.index_fields
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    pub fn is_compound_index(&self) -> bool {
        self.inner.index_fields.len() > 1
    }

    pub(crate) fn to_document(&self) -> NitriteResult<Document> {
        let mut doc = Document::new();
        doc.put("index_kind", self.index_kind().as_str())?;
        doc.put("index_fields", self.index_fields().to_value())?;
        doc.put("collection_name", self.collection_name())?;
        Ok(doc)
    }

    pub(crate) fn from_document(doc: &Document) -> NitriteResult<Self> {
        let kind = doc.get("index_kind")?;
        let kind = IndexKind::parse(kind.as_str().unwrap_or_default())?;
        let fields = Fields::from_value(&doc.get("index_fields")?)?;
        let collection_name = doc.get("collection_name")?;
        let Some(collection_name) = collection_name.as_str() else {
            log::error!("Index descriptor has no collection name: {}", doc);
            return Err(NitriteError::new(
                "Index descriptor has no collection name",
                ErrorKind::InternalError,
            ));
        };
        Ok(IndexDescriptor::new(kind, fields, collection_name))
    }
}

impl Display for IndexDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} index on {} of {}",
            self.index_kind(),
            self.index_fields(),
            self.collection_name()
        )
    }
}

/// Options for `create_index`.
#[derive(Clone, Debug)]
pub struct IndexOptions {
    index_kind: IndexKind,
    build_async: bool,
}

impl IndexOptions {
    pub fn new(index_kind: IndexKind) -> IndexOptions {
        IndexOptions {
            index_kind,
            build_async: false,
        }
    }

    /// Builds the index on a background thread; `create_index` returns as
    /// soon as the descriptor exists.
    pub fn build_async(mut self, build_async: bool) -> IndexOptions {
        self.build_async = build_async;
        self
    }

    pub fn index_kind(&self) -> IndexKind {
        self.index_kind
    }

    pub fn is_async(&self) -> bool {
        self.build_async
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions::new(IndexKind::Unique)
    }
}

pub fn unique_index() -> IndexOptions {
    IndexOptions::new(IndexKind::Unique)
}

pub fn non_unique_index() -> IndexOptions {
    IndexOptions::new(IndexKind::NonUnique)
}

pub fn full_text_index() -> IndexOptions {
    IndexOptions::new(IndexKind::FullText)
}

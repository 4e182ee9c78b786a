use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, NitriteError, NitriteResult};

use super::IndexDescriptor;

/// Catalog record of one index: its descriptor, backing map and build state.
///
/// `is_dirty` is set before a build scans documents and cleared only after
/// the scan completes, so an interrupted build stays visible. A new index is
/// dirty until its first build completes.
#[derive(Clone, Debug)]
pub struct IndexMeta {
    index_descriptor: IndexDescriptor,
    index_map_name: String,
    is_dirty: bool,
}

impl IndexMeta {
    pub fn new(index_descriptor: IndexDescriptor, index_map_name: String) -> IndexMeta {
        IndexMeta {
            index_descriptor,
            index_map_name,
            is_dirty: true,
        }
    }

    pub fn index_descriptor(&self) -> &IndexDescriptor {
        &self.index_descriptor
    }

    pub fn index_map_name(&self) -> &str {
        &self.index_map_name
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    pub(crate) fn to_value(&self) -> NitriteResult<Value> {
        let mut doc = Document::new();
        doc.put("index_descriptor", self.index_descriptor.to_document()?)?;
        doc.put("index_map", self.index_map_name.as_str())?;
        doc.put("is_dirty", self.is_dirty)?;
        Ok(Value::Document(doc))
    }

    pub(crate) fn from_value(value: &Value) -> NitriteResult<IndexMeta> {
        let Some(doc) = value.as_document() else {
            return Err(corrupt_meta(value));
        };

        let descriptor = match doc.get("index_descriptor")? {
            Value::Document(descriptor) => IndexDescriptor::from_document(&descriptor)?,
            _ => return Err(corrupt_meta(value)),
        };
        let index_map_name = match doc.get("index_map")? {
            Value::String(name) => name,
            _ => return Err(corrupt_meta(value)),
        };
        let is_dirty = doc.get("is_dirty")?.as_bool().unwrap_or(true);

        Ok(IndexMeta {
            index_descriptor: descriptor,
            index_map_name,
            is_dirty,
        })
    }
}

fn corrupt_meta(value: &Value) -> NitriteError {
    log::error!("Index metadata is corrupt: {}", value);
    NitriteError::new("Index metadata is corrupt", ErrorKind::InternalError)
}

use std::sync::Arc;

use super::IndexOperations;
use crate::collection::{Document, NitriteId};
use crate::common::FieldValues;
use crate::errors::NitriteResult;
use crate::index::{IndexDescriptor, NitriteIndexer};
use crate::nitrite_config::NitriteConfig;

/// Keeps every index of a collection in step with one document write.
///
/// Each method runs after the primary record has been committed. When one
/// index fails, the indexes already written for the document are restored
/// and the original error is returned. A dirty index is rebuilt from the
/// primary map instead of being patched, which also covers this document.
#[derive(Clone)]
pub(crate) struct DocumentIndexWriter {
    inner: Arc<DocumentIndexWriterInner>,
}

struct DocumentIndexWriterInner {
    nitrite_config: NitriteConfig,
    index_operations: IndexOperations,
}

/// One index write, undone on rollback.
enum Applied {
    Written(IndexDescriptor, FieldValues),
    Updated(IndexDescriptor, FieldValues, FieldValues),
    Removed(IndexDescriptor, FieldValues),
    Rebuilt(IndexDescriptor),
}

impl DocumentIndexWriter {
    pub(crate) fn new(nitrite_config: NitriteConfig, index_operations: IndexOperations) -> Self {
        DocumentIndexWriter {
            inner: Arc::new(DocumentIndexWriterInner {
                nitrite_config,
                index_operations,
            }),
        }
    }

    pub(crate) fn write_index_entry(&self, nitrite_id: NitriteId, document: &Document) -> NitriteResult<()> {
        self.inner.apply(|descriptor, indexer, config| {
            let values = FieldValues::from_document(nitrite_id, document, descriptor.index_fields())?;
            indexer.write_index_entry(&values, descriptor, config)?;
            Ok(Some(Applied::Written(descriptor.clone(), values)))
        })
    }

    pub(crate) fn update_index_entry(
        &self,
        nitrite_id: NitriteId,
        old_document: &Document,
        new_document: &Document,
    ) -> NitriteResult<()> {
        self.inner.apply(|descriptor, indexer, config| {
            let fields = descriptor.index_fields();
            let old_values = FieldValues::from_document(nitrite_id, old_document, fields)?;
            let new_values = FieldValues::from_document(nitrite_id, new_document, fields)?;
            if old_values.values() == new_values.values() {
                return Ok(None);
            }
            indexer.update_index_entry(&old_values, &new_values, descriptor, config)?;
            Ok(Some(Applied::Updated(descriptor.clone(), old_values, new_values)))
        })
    }

    pub(crate) fn remove_index_entry(&self, nitrite_id: NitriteId, document: &Document) -> NitriteResult<()> {
        self.inner.apply(|descriptor, indexer, config| {
            let values = FieldValues::from_document(nitrite_id, document, descriptor.index_fields())?;
            indexer.remove_index_entry(&values, descriptor, config)?;
            Ok(Some(Applied::Removed(descriptor.clone(), values)))
        })
    }
}

impl DocumentIndexWriterInner {
    fn apply<F>(&self, write: F) -> NitriteResult<()>
    where
        F: Fn(&IndexDescriptor, &NitriteIndexer, &NitriteConfig) -> NitriteResult<Option<Applied>>,
    {
        let mut applied = Vec::new();
        for descriptor in self.index_operations.list_indexes()? {
            let result = self.apply_one(&descriptor, &write);
            match result {
                Ok(Some(done)) => applied.push(done),
                Ok(None) => {}
                Err(e) => {
                    log::error!("Index write on {} failed, rolling back: {}", descriptor, e);
                    self.rollback(applied);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn apply_one<F>(&self, descriptor: &IndexDescriptor, write: &F) -> NitriteResult<Option<Applied>>
    where
        F: Fn(&IndexDescriptor, &NitriteIndexer, &NitriteConfig) -> NitriteResult<Option<Applied>>,
    {
        if self.index_operations.should_rebuild(descriptor.index_fields())?
            && self.index_operations.rebuild_if_dirty(descriptor)?
        {
            return Ok(Some(Applied::Rebuilt(descriptor.clone())));
        }
        let indexer = self.nitrite_config.find_indexer(descriptor.index_kind())?;
        write(descriptor, &indexer, &self.nitrite_config)
    }

    fn rollback(&self, applied: Vec<Applied>) {
        for done in applied.into_iter().rev() {
            let result = match &done {
                Applied::Written(descriptor, values) => self
                    .nitrite_config
                    .find_indexer(descriptor.index_kind())
                    .and_then(|indexer| indexer.remove_index_entry(values, descriptor, &self.nitrite_config)),
                Applied::Updated(descriptor, old_values, new_values) => self
                    .nitrite_config
                    .find_indexer(descriptor.index_kind())
                    .and_then(|indexer| {
                        indexer.update_index_entry(new_values, old_values, descriptor, &self.nitrite_config)
                    }),
                Applied::Removed(descriptor, values) => self
                    .nitrite_config
                    .find_indexer(descriptor.index_kind())
                    .and_then(|indexer| indexer.write_index_entry(values, descriptor, &self.nitrite_config)),
                // the inline rebuild indexed the document being rolled back;
                // marking the index dirty makes the next read rebuild it
                Applied::Rebuilt(descriptor) => self
                    .index_operations
                    .index_manager()
                    .mark_build_start(descriptor.index_fields()),
            };
            if let Err(e) = result {
                log::error!("Failed to roll back an index entry: {}", e);
            }
        }
    }
}

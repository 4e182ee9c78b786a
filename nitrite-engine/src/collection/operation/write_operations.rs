use parking_lot::Mutex;
use std::sync::Arc;

use super::{DocumentIndexWriter, IndexOperations, ReadOperations, WriteResult};
use crate::collection::{
    CollectionEventInfo, CollectionEventListener, CollectionEvents, Document, NitriteId,
    UpdateOptions,
};
use crate::common::{
    current_time_millis, NitriteEventBus, Value, DOC_ID, DOC_MODIFIED, DOC_REVISION, DOC_SOURCE,
    REPLICATOR,
};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::filter::Filter;
use crate::nitrite_config::NitriteConfig;
use crate::store::NitriteMap;

/// Inserts, updates and removes documents.
///
/// Writes to one collection are serialized. Every document write commits
/// the primary record first and then brings each index up to date; if an
/// index write fails, the index writes and the primary record are undone
/// and the original error is returned. Events are published once a write
/// has fully succeeded.
#[derive(Clone)]
pub(crate) struct WriteOperations {
    inner: Arc<WriteOperationsInner>,
}

struct WriteOperationsInner {
    nitrite_map: NitriteMap,
    index_operations: IndexOperations,
    index_writer: DocumentIndexWriter,
    read_operations: ReadOperations,
    event_bus: NitriteEventBus<CollectionEventInfo, CollectionEventListener>,
    write_lock: Mutex<()>,
}

impl WriteOperations {
    pub(crate) fn new(
        nitrite_config: NitriteConfig,
        nitrite_map: NitriteMap,
        index_operations: IndexOperations,
        read_operations: ReadOperations,
        event_bus: NitriteEventBus<CollectionEventInfo, CollectionEventListener>,
    ) -> Self {
        let index_writer = DocumentIndexWriter::new(nitrite_config, index_operations.clone());
        WriteOperations {
            inner: Arc::new(WriteOperationsInner {
                nitrite_map,
                index_operations,
                index_writer,
                read_operations,
                event_bus,
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub(crate) fn insert(&self, document: Document) -> NitriteResult<WriteResult> {
        self.insert_many(vec![document])
    }

    /// Inserts every document or none of them.
    pub(crate) fn insert_many(&self, documents: Vec<Document>) -> NitriteResult<WriteResult> {
        let _guard = self.inner.write_lock.lock();
        self.inner.insert_many(documents)
    }

    pub(crate) fn update(
        &self,
        filter: &Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> NitriteResult<WriteResult> {
        let _guard = self.inner.write_lock.lock();
        self.inner.update(filter, update, update_options)
    }

    pub(crate) fn update_by_id(
        &self,
        nitrite_id: &NitriteId,
        update: &Document,
        insert_if_absent: bool,
    ) -> NitriteResult<WriteResult> {
        let _guard = self.inner.write_lock.lock();
        self.inner.update_by_id(nitrite_id, update, insert_if_absent)
    }

    pub(crate) fn remove(&self, filter: &Filter, just_once: bool) -> NitriteResult<WriteResult> {
        let _guard = self.inner.write_lock.lock();
        self.inner.remove(filter, just_once)
    }

    pub(crate) fn remove_document(&self, document: &Document) -> NitriteResult<WriteResult> {
        let Some(nitrite_id) = document.existing_id() else {
            log::error!("Cannot remove a document without an id");
            return Err(NitriteError::new(
                "Cannot remove a document without an id",
                ErrorKind::InvalidId,
            ));
        };

        let _guard = self.inner.write_lock.lock();
        let mut nitrite_ids = Vec::new();
        if let Some(removed) = self.inner.remove_one(nitrite_id)? {
            nitrite_ids.push(nitrite_id);
            self.inner.alert(removed, CollectionEvents::Remove, &document.source());
        }
        Ok(WriteResult::new(nitrite_ids))
    }

    /// Removes every document and every index entry, keeping the indexes.
    pub(crate) fn clear(&self) -> NitriteResult<()> {
        let _guard = self.inner.write_lock.lock();
        self.inner.index_operations.clear()?;
        self.inner.nitrite_map.clear()
    }
}

impl WriteOperationsInner {
    fn insert_many(&self, documents: Vec<Document>) -> NitriteResult<WriteResult> {
        if documents.is_empty() {
            log::error!("No documents given to insert");
            return Err(NitriteError::new(
                "No documents given to insert",
                ErrorKind::ValidationError,
            ));
        }

        let mut inserted: Vec<(NitriteId, Document, String)> = Vec::with_capacity(documents.len());
        for document in documents {
            match self.insert_one(document) {
                Ok(done) => inserted.push(done),
                Err(e) => {
                    if !inserted.is_empty() {
                        log::error!("Insert failed, rolling back {} inserted documents", inserted.len());
                    }
                    for (nitrite_id, document, _) in inserted.iter().rev() {
                        self.undo_insert(*nitrite_id, document);
                    }
                    return Err(e);
                }
            }
        }

        let mut nitrite_ids = Vec::with_capacity(inserted.len());
        for (nitrite_id, document, source) in inserted {
            nitrite_ids.push(nitrite_id);
            self.alert(document, CollectionEvents::Insert, &source);
        }
        Ok(WriteResult::new(nitrite_ids))
    }

    fn insert_one(&self, document: Document) -> NitriteResult<(NitriteId, Document, String)> {
        let mut document = document;
        let nitrite_id = document.id();
        let source = document.source();
        document.remove_system(DOC_SOURCE);
        if source != REPLICATOR {
            document.put_system(DOC_REVISION, Value::I64(1));
            document.put_system(DOC_MODIFIED, Value::I64(current_time_millis()));
        }

        let key = Value::NitriteId(nitrite_id);
        if self
            .nitrite_map
            .put_if_absent(key.clone(), Value::Document(document.clone()))?
            .is_some()
        {
            log::error!("A document with id {} already exists", nitrite_id);
            return Err(NitriteError::new(
                &format!("A document with id {} already exists", nitrite_id),
                ErrorKind::UniqueConstraintViolation,
            ));
        }

        if let Err(e) = self.index_writer.write_index_entry(nitrite_id, &document) {
            if let Err(undo) = self.nitrite_map.remove(&key) {
                log::error!("Failed to undo insert of {}: {}", nitrite_id, undo);
            }
            return Err(e);
        }
        Ok((nitrite_id, document, source))
    }

    fn undo_insert(&self, nitrite_id: NitriteId, document: &Document) {
        if let Err(e) = self.index_writer.remove_index_entry(nitrite_id, document) {
            log::error!("Failed to undo index entries of {}: {}", nitrite_id, e);
        }
        if let Err(e) = self.nitrite_map.remove(&Value::NitriteId(nitrite_id)) {
            log::error!("Failed to undo insert of {}: {}", nitrite_id, e);
        }
    }

    fn update(
        &self,
        filter: &Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> NitriteResult<WriteResult> {
        let changes = self.prepare_update(update);
        if changes.is_empty() {
            log::debug!("Update document has no fields to apply");
            return Ok(WriteResult::default());
        }

        let mut matched = self.read_operations.find_documents(filter)?;
        if update_options.is_just_once() {
            matched.truncate(1);
        }

        if matched.is_empty() && update_options.is_insert_if_absent() {
            return self.insert_many(vec![changes]);
        }

        let source = update.source();
        let mut nitrite_ids = Vec::with_capacity(matched.len());
        for document in matched {
            let (nitrite_id, updated) = self.update_one(document, &changes, &source)?;
            nitrite_ids.push(nitrite_id);
            self.alert(updated, CollectionEvents::Update, &source);
        }
        Ok(WriteResult::new(nitrite_ids))
    }

    fn update_by_id(
        &self,
        nitrite_id: &NitriteId,
        update: &Document,
        insert_if_absent: bool,
    ) -> NitriteResult<WriteResult> {
        let changes = self.prepare_update(update);
        match self.read_operations.get_by_id(nitrite_id)? {
            Some(document) => {
                if changes.is_empty() {
                    return Ok(WriteResult::default());
                }
                let source = update.source();
                let (nitrite_id, updated) = self.update_one(document, &changes, &source)?;
                self.alert(updated, CollectionEvents::Update, &source);
                Ok(WriteResult::new(vec![nitrite_id]))
            }
            None if insert_if_absent => {
                let mut document = changes;
                document.put_system(DOC_ID, Value::NitriteId(*nitrite_id));
                self.insert_many(vec![document])
            }
            None => Ok(WriteResult::default()),
        }
    }

    /// The fields an update may change. Ids never change, and revisions only
    /// travel with replicated writes.
    fn prepare_update(&self, update: &Document) -> Document {
        let mut changes = update.clone();
        changes.remove_system(DOC_ID);
        changes.remove_system(DOC_MODIFIED);
        if update.source() != REPLICATOR {
            changes.remove_system(DOC_REVISION);
            changes.remove_system(DOC_SOURCE);
        }
        changes
    }

    fn update_one(
        &self,
        old_document: Document,
        changes: &Document,
        source: &str,
    ) -> NitriteResult<(NitriteId, Document)> {
        let Some(nitrite_id) = old_document.existing_id() else {
            log::error!("Stored document {} has no id", old_document);
            return Err(NitriteError::new("Stored document has no id", ErrorKind::InternalError));
        };

        let mut new_document = old_document.clone();
        new_document.merge(changes)?;
        new_document.remove_system(DOC_SOURCE);
        if source != REPLICATOR {
            new_document.put_system(DOC_REVISION, Value::I64(old_document.revision() + 1));
            new_document.put_system(DOC_MODIFIED, Value::I64(current_time_millis()));
        }

        let key = Value::NitriteId(nitrite_id);
        self.nitrite_map.put(key.clone(), Value::Document(new_document.clone()))?;
        if let Err(e) = self
            .index_writer
            .update_index_entry(nitrite_id, &old_document, &new_document)
        {
            if let Err(undo) = self.nitrite_map.put(key, Value::Document(old_document)) {
                log::error!("Failed to undo update of {}: {}", nitrite_id, undo);
            }
            return Err(e);
        }
        Ok((nitrite_id, new_document))
    }

    fn remove(&self, filter: &Filter, just_once: bool) -> NitriteResult<WriteResult> {
        let mut matched = self.read_operations.find_documents(filter)?;
        if just_once {
            matched.truncate(1);
        }

        let mut nitrite_ids = Vec::with_capacity(matched.len());
        for document in matched {
            let Some(nitrite_id) = document.existing_id() else {
                continue;
            };
            if let Some(removed) = self.remove_one(nitrite_id)? {
                nitrite_ids.push(nitrite_id);
                let source = removed.source();
                self.alert(removed, CollectionEvents::Remove, &source);
            }
        }
        Ok(WriteResult::new(nitrite_ids))
    }

    /// Removes one document and its index entries. Returns the removed
    /// document with its revision advanced, or `None` if it was absent.
    fn remove_one(&self, nitrite_id: NitriteId) -> NitriteResult<Option<Document>> {
        let key = Value::NitriteId(nitrite_id);
        let mut document = match self.nitrite_map.remove(&key)? {
            Some(Value::Document(document)) => document,
            Some(other) => {
                log::error!("Expected a document for {}, found {}", nitrite_id, other);
                return Err(NitriteError::new(
                    &format!("Invalid value stored for id {}", nitrite_id),
                    ErrorKind::InternalError,
                ));
            }
            None => return Ok(None),
        };

        if let Err(e) = self.index_writer.remove_index_entry(nitrite_id, &document) {
            if let Err(undo) = self.nitrite_map.put(key, Value::Document(document)) {
                log::error!("Failed to undo removal of {}: {}", nitrite_id, undo);
            }
            return Err(e);
        }

        document.put_system(DOC_REVISION, Value::I64(document.revision() + 1));
        document.put_system(DOC_MODIFIED, Value::I64(current_time_millis()));
        Ok(Some(document))
    }

    fn alert(&self, document: Document, event_type: CollectionEvents, source: &str) {
        let event = CollectionEventInfo::new(Some(document), event_type, source);
        if let Err(e) = self.event_bus.publish(event) {
            log::warn!("Collection event listener failed: {}", e);
        }
    }
}

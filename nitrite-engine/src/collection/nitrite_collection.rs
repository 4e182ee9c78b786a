use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::operation::{IndexOperations, ReadOperations, WriteOperations, WriteResult};
use super::{
    CollectionEventInfo, CollectionEventListener, Document, FindOptions, NitriteId, UpdateOptions,
};
use crate::common::{DocumentCursor, Fields, LockHandle, NitriteEventBus, SubscriberRef};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::filter::Filter;
use crate::index::{IndexDescriptor, IndexOptions};
use crate::nitrite_config::NitriteConfig;
use crate::store::NitriteMap;

/// A named set of documents with its secondary indexes.
///
/// Reads may run concurrently with each other and with writes; writes are
/// serialized. Index builds run outside the write path, so a build on one
/// field set never blocks queries or document writes. Clones share the same
/// collection.
///
/// # Examples
///
/// ```rust,ignore
/// use nitrite_engine::collection::NitriteCollection;
/// use nitrite_engine::doc;
/// use nitrite_engine::filter::field;
/// use nitrite_engine::index::unique_index;
/// use nitrite_engine::nitrite_config::NitriteConfig;
///
/// let config = NitriteConfig::new();
/// let people = NitriteCollection::open("people", &config)?;
/// people.create_index(vec!["name"], &unique_index())?;
/// people.insert(doc! { name: "a", age: 30 })?;
///
/// let found = people.find(field("name").eq("a"))?;
/// ```
#[derive(Clone)]
pub struct NitriteCollection {
    inner: Arc<NitriteCollectionInner>,
}

struct NitriteCollectionInner {
    collection_name: String,
    nitrite_config: NitriteConfig,
    nitrite_map: NitriteMap,
    index_operations: IndexOperations,
    read_operations: ReadOperations,
    write_operations: WriteOperations,
    event_bus: NitriteEventBus<CollectionEventInfo, CollectionEventListener>,
    lock_handle: LockHandle,
    closed: AtomicBool,
}

impl NitriteCollection {
    /// Opens the collection `name` in the configured store, creating it if it
    /// does not exist. Index descriptors recorded earlier in the same store
    /// are picked up again. Opening a collection freezes the configuration.
    ///
    /// Opening a name that is already open returns another handle to the
    /// same collection; an index created through one handle is used and
    /// maintained by all of them.
    pub fn open(name: &str, nitrite_config: &NitriteConfig) -> NitriteResult<Self> {
        if name.trim().is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(NitriteError::new(
                "Collection name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        nitrite_config.initialize()?;
        nitrite_config.collection_factory().get_collection(name, nitrite_config)
    }

    pub(crate) fn create(name: &str, nitrite_config: &NitriteConfig) -> NitriteResult<Self> {
        let nitrite_map = nitrite_config.nitrite_store()?.open_map(name)?;
        let event_bus = NitriteEventBus::new();
        let index_operations = IndexOperations::new(
            name,
            nitrite_config.clone(),
            nitrite_map.clone(),
            event_bus.clone(),
        )?;
        let read_operations = ReadOperations::new(
            name,
            nitrite_config.clone(),
            nitrite_map.clone(),
            index_operations.clone(),
        );
        let write_operations = WriteOperations::new(
            nitrite_config.clone(),
            nitrite_map.clone(),
            index_operations.clone(),
            read_operations.clone(),
            event_bus.clone(),
        );
        let lock_handle = nitrite_config.lock_registry().get_lock(name);

        log::debug!("Opened collection {}", name);
        Ok(NitriteCollection {
            inner: Arc::new(NitriteCollectionInner {
                collection_name: name.to_string(),
                nitrite_config: nitrite_config.clone(),
                nitrite_map,
                index_operations,
                read_operations,
                write_operations,
                event_bus,
                lock_handle,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.collection_name
    }

    pub(crate) fn same_collection(&self, other: &NitriteCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Inserts a document, assigning an id if it has none.
    pub fn insert(&self, document: Document) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.write_operations.insert(document)
    }

    /// Inserts every document or, if any of them fails, none of them.
    pub fn insert_many(&self, documents: Vec<Document>) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.write_operations.insert_many(documents)
    }

    /// Merges `update` into every document matching `filter`.
    pub fn update(&self, filter: Filter, update: &Document) -> NitriteResult<WriteResult> {
        self.update_with_options(filter, update, &UpdateOptions::default())
    }

    pub fn update_with_options(
        &self,
        filter: Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner
            .write_operations
            .update(&filter, update, update_options)
    }

    /// Merges `update` into the document with id `id`. When the document is
    /// absent and `insert_if_absent` is set, `update` is inserted under `id`.
    pub fn update_by_id(
        &self,
        id: &NitriteId,
        update: &Document,
        insert_if_absent: bool,
    ) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner
            .write_operations
            .update_by_id(id, update, insert_if_absent)
    }

    /// Removes the documents matching `filter`, or only the first of them.
    pub fn remove(&self, filter: Filter, just_once: bool) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.write_operations.remove(&filter, just_once)
    }

    /// Removes the stored document with the same id as `document`.
    pub fn remove_document(&self, document: &Document) -> NitriteResult<WriteResult> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.write_operations.remove_document(document)
    }

    pub fn find(&self, filter: Filter) -> NitriteResult<DocumentCursor> {
        self.find_with_options(filter, &FindOptions::new())
    }

    pub fn find_with_options(
        &self,
        filter: Filter,
        find_options: &FindOptions,
    ) -> NitriteResult<DocumentCursor> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.read_operations.find(&filter, find_options)
    }

    pub fn get_by_id(&self, id: &NitriteId) -> NitriteResult<Option<Document>> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.read_operations.get_by_id(id)
    }

    /// Creates an index on `field_names` and builds it from the documents
    /// already stored.
    ///
    /// Fails with `AlreadyExists` if the field set is indexed, and with
    /// `BuildInProgress` if a build for it is running.
    pub fn create_index(
        &self,
        field_names: Vec<&str>,
        index_options: &IndexOptions,
    ) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        let fields = Fields::with_names(field_names)?;
        self.inner.index_operations.create_index(
            &fields,
            index_options.index_kind(),
            index_options.is_async(),
        )
    }

    pub fn rebuild_index(&self, field_names: Vec<&str>, is_async: bool) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        let fields = Fields::with_names(field_names)?;
        self.inner.index_operations.rebuild_index(&fields, is_async)
    }

    pub fn drop_index(&self, field_names: Vec<&str>) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        let fields = Fields::with_names(field_names)?;
        self.inner.index_operations.drop_index(&fields)
    }

    /// Drops every index. Fails without dropping anything if any build is
    /// running; other failures are collected into one error.
    pub fn drop_all_indexes(&self) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.index_operations.drop_all_indexes()
    }

    pub fn has_index(&self, field_names: Vec<&str>) -> NitriteResult<bool> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        let fields = Fields::with_names(field_names)?;
        self.inner.index_operations.has_index(&fields)
    }

    /// Whether a build of the index on `field_names` is running.
    pub fn is_indexing(&self, field_names: Vec<&str>) -> NitriteResult<bool> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        let fields = Fields::with_names(field_names)?;
        self.inner.index_operations.is_indexing(&fields)
    }

    pub fn list_indexes(&self) -> NitriteResult<Vec<IndexDescriptor>> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.index_operations.list_indexes()
    }

    /// Registers a listener for document and index events.
    pub fn subscribe(&self, listener: CollectionEventListener) -> NitriteResult<SubscriberRef> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.event_bus.deregister(subscriber)
    }

    /// Number of stored documents.
    pub fn size(&self) -> NitriteResult<u64> {
        let _guard = self.inner.lock_handle.read();
        self.inner.ensure_opened()?;
        self.inner.nitrite_map.size()
    }

    /// Removes every document and empties every index. The indexes stay
    /// defined.
    pub fn clear(&self) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.write();
        self.inner.ensure_opened()?;
        self.inner.write_operations.clear()
    }

    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
            && !self.inner.nitrite_config.is_closed()
            && !self.inner.nitrite_map.is_closed()
    }

    /// Waits for running operations and closes the collection. Later calls
    /// fail with `InvalidOperation`; closing twice is a no-op.
    pub fn close(&self) -> NitriteResult<()> {
        let _guard = self.inner.lock_handle.write();
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.index_operations.close()?;
        self.inner.event_bus.close()?;
        log::debug!("Closed collection {}", self.inner.collection_name);
        Ok(())
    }
}

impl NitriteCollectionInner {
    fn ensure_opened(&self) -> NitriteResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Collection {} is closed", self.collection_name);
            return Err(NitriteError::new(
                &format!("Collection {} is closed", self.collection_name),
                ErrorKind::InvalidOperation,
            ));
        }

        if self.nitrite_config.is_closed() {
            log::error!("Store is closed; cannot access collection {}", self.collection_name);
            return Err(NitriteError::new(
                "Store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }

        if self.nitrite_map.is_closed() {
            log::error!("Map of collection {} is closed", self.collection_name);
            return Err(NitriteError::new(
                &format!("Collection {} is closed", self.collection_name),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

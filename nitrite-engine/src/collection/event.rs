use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

use crate::collection::Document;
use crate::common::current_time_millis;
use crate::errors::NitriteResult;

/// What happened on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvents {
    Insert,
    Update,
    Remove,
    /// An index build or rebuild started.
    IndexStart,
    /// An index build or rebuild finished, successfully or not.
    IndexEnd,
}

/// One change notification.
///
/// Document events carry a copy of the document as written (or, for
/// removals, as it was before removal). Index events carry a document with
/// the index fields under `fields` and the kind under `kind`.
#[derive(Clone)]
pub struct CollectionEventInfo {
    inner: Arc<CollectionEventInner>,
}

struct CollectionEventInner {
    item: Option<Document>,
    event_type: CollectionEvents,
    timestamp: i64,
    origin: String,
}

impl CollectionEventInfo {
    pub fn new(item: Option<Document>, event_type: CollectionEvents, origin: &str) -> Self {
        CollectionEventInfo {
            inner: Arc::new(CollectionEventInner {
                item,
                event_type,
                timestamp: current_time_millis(),
                origin: origin.to_string(),
            }),
        }
    }

    pub fn event_type(&self) -> CollectionEvents {
        self.inner.event_type
    }

    pub fn item(&self) -> Option<&Document> {
        self.inner.item.as_ref()
    }

    /// Milliseconds since the Unix epoch at which the event was created.
    pub fn timestamp(&self) -> i64 {
        self.inner.timestamp
    }

    /// The source tag of the write, or the collection name for index events.
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }
}

impl Debug for CollectionEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventInfo")
            .field("event_type", &self.event_type())
            .field("item", &self.item())
            .field("timestamp", &self.timestamp())
            .field("origin", &self.origin())
            .finish()
    }
}

pub trait CollectionEventCallback:
    Send + Sync + Fn(CollectionEventInfo) -> NitriteResult<()>
{
}

impl<F> CollectionEventCallback for F where
    F: Send + Sync + Fn(CollectionEventInfo) -> NitriteResult<()>
{
}

/// Subscriber wrapping a callback. Callback failures are reported to the
/// publisher and logged; they never undo the write that raised the event.
#[derive(Clone)]
pub struct CollectionEventListener {
    on_event: Arc<dyn CollectionEventCallback>,
}

impl CollectionEventListener {
    pub fn new(on_event: impl CollectionEventCallback + 'static) -> Self {
        CollectionEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<CollectionEventInfo> for CollectionEventListener {
    fn handle(&self, event: &Event<CollectionEventInfo>) -> Result<(), BasuError> {
        (self.on_event)(event.data.clone()).map_err(|e| BasuError::HandlerError(Error::from(e)))
    }
}

impl Debug for CollectionEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventListener").finish()
    }
}

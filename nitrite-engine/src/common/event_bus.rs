use crate::common::NITRITE_EVENT;
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

/// Publish/subscribe channel for change notifications.
///
/// `publish` returns after every registered listener has run, so a listener
/// observes events strictly after the write that produced them.
#[derive(Clone)]
pub struct NitriteEventBus<E, L> {
    inner: Arc<NitriteEventBusInner<E, L>>,
}

/// Handle returned by a subscription, used to unsubscribe.
pub struct SubscriberRef {
    inner: HandlerId,
}

struct NitriteEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> Default for NitriteEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> NitriteEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        NitriteEventBus {
            inner: Arc::new(NitriteEventBusInner {
                event_bus: EventBus::new(),
                phantom_data: PhantomData,
            }),
        }
    }

    pub fn register(&self, listener: L) -> NitriteResult<SubscriberRef> {
        self.inner
            .event_bus
            .subscribe(NITRITE_EVENT, Box::new(listener))
            .map(|inner| SubscriberRef { inner })
            .map_err(to_nitrite_error)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> NitriteResult<()> {
        self.inner
            .event_bus
            .unsubscribe(NITRITE_EVENT, &subscriber.inner)
            .map(|_| ())
            .map_err(to_nitrite_error)
    }

    pub fn publish(&self, event: E) -> NitriteResult<()> {
        if !self.has_listeners() {
            return Ok(());
        }

        self.inner
            .event_bus
            .publish(NITRITE_EVENT, &Event::new(event))
            .map(|_| ())
            .map_err(to_nitrite_error)
    }

    pub fn has_listeners(&self) -> bool {
        match self.inner.event_bus.get_handler_count(NITRITE_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to count event listeners: {}", e);
                false
            }
        }
    }

    pub fn close(&self) -> NitriteResult<()> {
        self.inner.event_bus.clear().map(|_| ()).map_err(to_nitrite_error)
    }
}

fn to_nitrite_error(e: BasuError) -> NitriteError {
    let message = match e {
        BasuError::EventTypeNotFOUND => "Event bus error: event type is not registered".to_string(),
        BasuError::MutexPoisoned => "Event bus error: internal mutex poisoned".to_string(),
        BasuError::HandlerError(e) => {
            let cause = e
                .source()
                .map(|s| s.to_string())
                .unwrap_or_else(|| e.to_string());
            format!("Event handler error: {}", cause)
        }
    };
    log::error!("{}", message);
    NitriteError::new(&message, ErrorKind::EventError)
}

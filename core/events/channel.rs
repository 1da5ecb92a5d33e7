use super::event::Event;
use super::EventConsumer;
use crossbeam::deque::{Injector, Worker};
use std::sync::Arc;
use tracing::trace;

/// A multi-producer event bus. Cloning the channel clones a handle to the same bus.
#[derive(Clone, Debug, Default)]
pub struct EventChannel {
    bus: Arc<Injector<Event>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bus.is_empty()
    }

    pub fn send<E>(&self, event: E)
    where
        E: Into<Event>,
    {
        let event = event.into();
        trace!("event: {:?}", event);
        self.bus.push(event)
    }

    pub fn consumer(&self) -> EventConsumer {
        EventConsumer::new(self.bus.clone(), Worker::new_fifo())
    }
}

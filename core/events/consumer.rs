use super::event::Event;
use crossbeam::deque::{Injector, Steal, Worker};
use std::sync::Arc;

pub struct EventConsumer {
    channel: Arc<Injector<Event>>,
    queue: Worker<Event>,
}

impl EventConsumer {
    pub fn new(channel: Arc<Injector<Event>>, queue: Worker<Event>) -> Self {
        Self { channel, queue }
    }

    /// Move every event currently on the channel into this consumer's local queue.
    pub fn fetch(&self) {
        while let Steal::Retry = self.channel.steal_batch(&self.queue) {}
    }

    pub fn pop(&self) -> Option<Event> {
        self.queue.pop()
    }

    /// Fetch and return every pending event, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        let mut events = vec![];
        loop {
            self.fetch();
            match self.queue.pop() {
                Some(event) => events.push(event),
                None if self.channel.is_empty() => break,
                None => continue,
            }
        }
        events
    }

    pub fn is_empty(&self) -> bool {
        self.fetch();
        self.queue.is_empty()
    }
}

impl Iterator for &EventConsumer {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }
}

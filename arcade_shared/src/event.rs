//! Typed event bus.
//!
//! Decouples producers (socket callbacks, timers) from consumers (state
//! receiver, stats, UI) without string-keyed dispatch: each event type gets
//! its own queue, keyed by `TypeId`. Everything runs on one task, so
//! ordering within a type is the order of `push` calls.

use std::{
    any::{Any, TypeId},
    collections::{HashMap, VecDeque},
};

/// Typed publish/drain event bus.
#[derive(Default)]
pub struct EventBus {
    queues: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl EventBus {
    /// Publishes an event.
    pub fn push<E: 'static + Send + Sync>(&mut self, event: E) {
        let queue = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(VecDeque::<E>::new()));
        let queue = queue
            .downcast_mut::<VecDeque<E>>()
            .expect("queue type mismatch");
        queue.push_back(event);
    }

    /// Drains all queued events of one type, in publish order.
    pub fn drain<E: 'static + Send + Sync>(&mut self) -> VecDeque<E> {
        self.queues
            .remove(&TypeId::of::<E>())
            .and_then(|boxed| boxed.downcast::<VecDeque<E>>().ok())
            .map(|boxed| *boxed)
            .unwrap_or_default()
    }

    /// Discards every queued event. Used at session teardown.
    pub fn clear(&mut self) {
        self.queues.clear();
    }
}

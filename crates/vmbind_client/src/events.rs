use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::lock;

type Handler<A> = Arc<dyn Fn(&A) -> bool + Send + Sync>;

/// Multicast event used by the hub to publish connection events.
///
/// Handlers return `true` when they handled the event; [`emit`](Self::emit)
/// reports whether any handler did.
pub struct EventEmitter<A> {
    handlers: Arc<Mutex<Vec<(u64, Handler<A>)>>>,
    next_id: Arc<AtomicU64>,
}

impl<A> Clone for EventEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<A: 'static> Default for EventEmitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> EventEmitter<A> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers `handler` and returns the handle that removes it again.
    pub fn subscribe(&self, handler: impl Fn(&A) -> bool + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.handlers).push((id, Arc::new(handler)));

        let handlers = Arc::downgrade(&self.handlers);
        Subscription {
            unsubscribe: Box::new(move || {
                if let Some(handlers) = handlers.upgrade() {
                    lock(&handlers).retain(|(handler_id, _)| *handler_id != id);
                }
            }),
        }
    }

    /// Calls every handler in subscription order.
    ///
    /// Handlers run outside the internal lock, so they may subscribe or
    /// unsubscribe while the event is being delivered.
    pub fn emit(&self, args: &A) -> bool {
        let snapshot: Vec<Handler<A>> = lock(&self.handlers)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        let mut handled = false;
        for handler in snapshot {
            handled |= handler(args);
        }
        handled
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.handlers).len()
    }
}

/// Handle to an event subscription.
pub struct Subscription {
    unsubscribe: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.unsubscribe)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reports_handled() {
        let event = EventEmitter::<u32>::new();
        let _ignored = event.subscribe(|_| false);
        assert!(!event.emit(&1));

        let _even = event.subscribe(|n| n % 2 == 0);
        assert!(event.emit(&2));
        assert!(!event.emit(&3));
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let event = EventEmitter::<()>::new();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = calls.clone();
        let sub = event.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        event.emit(&());
        sub.unsubscribe();
        event.emit(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(event.subscriber_count(), 0);
    }
}

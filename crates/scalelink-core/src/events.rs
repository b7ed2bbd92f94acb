//! Reading events and their dispatch.
//!
//! Each successful read cycle produces one [`Reading`], delivered
//! synchronously to every registered observer in registration order, on the
//! acquisition task's own context. There is no buffering and no replay: an
//! observer registered after an event was dispatched never sees it, and a
//! slow observer delays the next read cycle.

use std::sync::{Mutex, MutexGuard};

/// One parsed measurement transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Serial identifier of the originating device, re-queried from the
    /// bridge at the moment of the read. Empty when the query failed.
    pub device_id: String,
    /// Reading text with surrounding whitespace trimmed and interior
    /// spaces removed. Never empty or whitespace-only.
    pub payload: String,
}

/// Observer callback invoked once per dispatched [`Reading`].
pub type ReadingObserver = Box<dyn Fn(&Reading) + Send + Sync>;

/// Ordered, synchronous fan-out point for [`Reading`]s.
///
/// Registration and dispatch may happen on different tasks (the host
/// registers, the acquisition task dispatches), so the observer list sits
/// behind a mutex. The lock is only ever held for the duration of one
/// dispatch pass and is never held across an await point.
#[derive(Default)]
pub struct ReadingDispatcher {
    observers: Mutex<Vec<ReadingObserver>>,
}

impl ReadingDispatcher {
    /// Create a dispatcher with no observers.
    pub fn new() -> Self {
        ReadingDispatcher {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Append an observer to the end of the delivery order.
    ///
    /// Observers cannot be removed; they live as long as the dispatcher.
    pub fn register(&self, observer: ReadingObserver) {
        self.lock_observers().push(observer);
    }

    /// Deliver `reading` to every observer, in registration order, on the
    /// caller's context. Delivery is at most once per observer per event.
    pub fn dispatch(&self, reading: &Reading) {
        let observers = self.lock_observers();
        for observer in observers.iter() {
            observer(reading);
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.lock_observers().len()
    }

    // A panicking observer poisons the lock; recover the list so later
    // readings still flow to the observers that did not panic.
    fn lock_observers(&self) -> MutexGuard<'_, Vec<ReadingObserver>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reading(payload: &str) -> Reading {
        Reading {
            device_id: "A5XK3RJT".into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn dispatch_with_no_observers_is_a_no_op() {
        let dispatcher = ReadingDispatcher::new();
        dispatcher.dispatch(&reading("12.34kg"));
        assert_eq!(dispatcher.observer_count(), 0);
    }

    #[test]
    fn dispatch_reaches_every_observer_once() {
        let dispatcher = ReadingDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            dispatcher.register(Box::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        dispatcher.dispatch(&reading("12.34kg"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        dispatcher.dispatch(&reading("56.78kg"));
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn observers_are_invoked_in_registration_order() {
        let dispatcher = ReadingDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        dispatcher.register(Box::new(move |_| log.lock().unwrap().push("A")));
        let log = order.clone();
        dispatcher.register(Box::new(move |_| log.lock().unwrap().push("B")));
        let log = order.clone();
        dispatcher.register(Box::new(move |_| log.lock().unwrap().push("C")));

        dispatcher.dispatch(&reading("1kg"));
        dispatcher.dispatch(&reading("2kg"));

        assert_eq!(
            *order.lock().unwrap(),
            vec!["A", "B", "C", "A", "B", "C"]
        );
    }

    #[test]
    fn observers_see_the_dispatched_reading() {
        let dispatcher = ReadingDispatcher::new();
        let seen = Arc::new(Mutex::new(None));

        let slot = seen.clone();
        dispatcher.register(Box::new(move |r| {
            *slot.lock().unwrap() = Some(r.clone());
        }));

        dispatcher.dispatch(&reading("12.34kg"));

        let got = seen.lock().unwrap().clone().expect("observer not called");
        assert_eq!(got.device_id, "A5XK3RJT");
        assert_eq!(got.payload, "12.34kg");
    }

    #[test]
    fn late_registration_misses_earlier_events() {
        let dispatcher = ReadingDispatcher::new();
        let early = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));

        let hits = early.clone();
        dispatcher.register(Box::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        }));

        dispatcher.dispatch(&reading("1kg"));

        let hits = late.clone();
        dispatcher.register(Box::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        }));

        dispatcher.dispatch(&reading("2kg"));

        assert_eq!(early.load(Ordering::SeqCst), 2);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }
}

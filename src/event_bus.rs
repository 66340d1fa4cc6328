//! Typed publish-subscribe bus decoupling the matching hot path from slower
//! consumers.
//!
//! Publishing is a single non-blocking offer onto a bounded lock-free queue;
//! when the queue is full the event is dropped and counted rather than
//! back-pressuring the producer. One background dispatcher thread drains the
//! queue in FIFO order and invokes the subscribers registered for each event
//! kind, in subscription order. A panicking subscriber is isolated and
//! logged; it never affects other subscribers or later events.

use crate::events::{EventKind, MarketEvent};
use crossbeam::queue::ArrayQueue;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default bounded queue capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// How long [`EventBus::shutdown`] waits for the dispatcher to drain.
const SHUTDOWN_JOIN: Duration = Duration::from_millis(500);

type Subscriber = Box<dyn Fn(&MarketEvent) + Send + Sync>;
type Registry = RwLock<HashMap<EventKind, Vec<Subscriber>>>;

pub struct EventBus {
    queue: Arc<ArrayQueue<MarketEvent>>,
    subscribers: Arc<Registry>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with the given queue capacity and starts its dispatcher
    /// thread.
    pub fn with_capacity(capacity: usize) -> Self {
        let queue = Arc::new(ArrayQueue::new(capacity));
        let subscribers: Arc<Registry> = Arc::new(RwLock::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));

        let dispatcher = {
            let queue = Arc::clone(&queue);
            let subscribers = Arc::clone(&subscribers);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                // Drain until stopped, then drain whatever is left.
                while running.load(Ordering::Acquire) || !queue.is_empty() {
                    match queue.pop() {
                        Some(event) => dispatch(&subscribers, &event),
                        None => thread::sleep(Duration::from_millis(1)),
                    }
                }
            })
        };

        Self {
            queue,
            subscribers,
            running,
            dropped: Arc::new(AtomicU64::new(0)),
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Publishes an event. Non-blocking: if the queue is full the event is
    /// dropped and the drop counter incremented.
    pub fn publish(&self, event: MarketEvent) {
        if self.queue.push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Registers a subscriber for one event kind. Subscribers for a kind are
    /// invoked in subscription order, on the dispatcher thread.
    pub fn subscribe(&self, kind: EventKind, subscriber: impl Fn(&MarketEvent) + Send + Sync + 'static) {
        let mut registry = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.entry(kind).or_default().push(Box::new(subscriber));
    }

    /// Events dropped so far because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops the dispatcher: it drains the remaining events, then exits.
    /// Waits up to ~500 ms for it to finish and returns the drop count.
    /// Idempotent.
    pub fn shutdown(&self) -> u64 {
        self.running.store(false, Ordering::Release);
        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let deadline = Instant::now() + SHUTDOWN_JOIN;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                log::warn!("event bus dispatcher did not drain within {SHUTDOWN_JOIN:?}");
            }
        }
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("event bus dropped {dropped} events (queue overflow)");
        }
        dropped
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(registry: &Registry, event: &MarketEvent) {
    let subscribers = registry
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let Some(list) = subscribers.get(&event.kind()) else {
        return;
    };
    for subscriber in list {
        if catch_unwind(AssertUnwindSafe(|| subscriber(event))).is_err() {
            log::error!("subscriber panicked on {:?} event", event.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Order, OrderType, Side};
    use rust_decimal::Decimal;

    fn order() -> Order {
        Order::new("TEST", Side::Buy, OrderType::Limit, Some(Decimal::from(100)), 10).unwrap()
    }

    /// Polls until `predicate` holds or ~2 s elapse.
    fn wait_until(predicate: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        predicate()
    }

    #[test]
    fn delivers_to_matching_kind_only() {
        let bus = EventBus::new();
        let received = Arc::new(AtomicU64::new(0));
        let filled = Arc::new(AtomicU64::new(0));
        {
            let received = Arc::clone(&received);
            bus.subscribe(EventKind::OrderReceived, move |_| {
                received.fetch_add(1, Ordering::Relaxed);
            });
        }
        {
            let filled = Arc::clone(&filled);
            bus.subscribe(EventKind::OrderFilled, move |_| {
                filled.fetch_add(1, Ordering::Relaxed);
            });
        }

        bus.publish(MarketEvent::received(order()));
        bus.publish(MarketEvent::received(order()));

        assert!(wait_until(|| received.load(Ordering::Relaxed) == 2));
        assert_eq!(filled.load(Ordering::Relaxed), 0);
        bus.shutdown();
    }

    #[test]
    fn preserves_fifo_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            bus.subscribe(EventKind::OrderReceived, move |event| {
                if let Some(order) = event.order() {
                    seen.lock().unwrap().push(order.id());
                }
            });
        }

        let orders: Vec<Order> = (0..10).map(|_| order()).collect();
        let ids: Vec<_> = orders.iter().map(|o| o.id()).collect();
        for o in orders {
            bus.publish(MarketEvent::received(o));
        }

        assert!(wait_until(|| seen.lock().unwrap().len() == 10));
        assert_eq!(*seen.lock().unwrap(), ids);
        bus.shutdown();
    }

    #[test]
    fn drops_and_counts_on_overflow() {
        // A slow subscriber keeps the tiny queue full while we flood it.
        let bus = EventBus::with_capacity(4);
        bus.subscribe(EventKind::OrderReceived, |_| {
            thread::sleep(Duration::from_millis(10));
        });
        for _ in 0..100 {
            bus.publish(MarketEvent::received(order()));
        }
        assert!(bus.dropped_events() > 0);
        let reported = bus.shutdown();
        assert_eq!(reported, bus.dropped_events());
    }

    #[test]
    fn subscriber_panic_does_not_stop_delivery() {
        let bus = EventBus::new();
        let delivered = Arc::new(AtomicU64::new(0));
        bus.subscribe(EventKind::OrderReceived, |_| {
            panic!("boom");
        });
        {
            let delivered = Arc::clone(&delivered);
            bus.subscribe(EventKind::OrderReceived, move |_| {
                delivered.fetch_add(1, Ordering::Relaxed);
            });
        }

        bus.publish(MarketEvent::received(order()));
        bus.publish(MarketEvent::received(order()));

        assert!(wait_until(|| delivered.load(Ordering::Relaxed) == 2));
        bus.shutdown();
    }

    #[test]
    fn shutdown_drains_pending_events() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));
        {
            let count = Arc::clone(&count);
            bus.subscribe(EventKind::OrderReceived, move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            });
        }
        for _ in 0..50 {
            bus.publish(MarketEvent::received(order()));
        }
        bus.shutdown();
        assert_eq!(count.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let bus = EventBus::new();
        assert_eq!(bus.shutdown(), 0);
        assert_eq!(bus.shutdown(), 0);
    }
}

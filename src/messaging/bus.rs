use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
/// Subscriber lists for status and idle notifications
///
/// Registration is append-only and delivery follows registration order.
use std::sync::Arc;

use super::events::StatusEvent;

type StatusCallback = Arc<dyn Fn(&StatusEvent) + Send + Sync>;
type Notification = Arc<dyn Fn() + Send + Sync>;

/// Broadcasts status events and idle notifications to subscribers
#[derive(Clone, Default)]
pub struct StatusBus {
    status: Arc<RwLock<Vec<StatusCallback>>>,
    idle: Arc<RwLock<Vec<Notification>>>,
    idle_timeout: Arc<RwLock<Vec<Notification>>>,
}

impl StatusBus {
    /// Create a new bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_status<F>(&self, callback: F)
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.status.write().push(Arc::new(callback));
    }

    /// Subscribe to status events through a channel
    pub fn subscribe(&self) -> Receiver<StatusEvent> {
        let (tx, rx) = unbounded();
        self.on_status(move |event| {
            // If send fails, the receiver is gone - that's ok
            let _ = tx.try_send(event.clone());
        });
        rx
    }

    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.idle.write().push(Arc::new(callback));
    }

    pub fn on_idle_timeout<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.idle_timeout.write().push(Arc::new(callback));
    }

    /// Deliver a status event to every subscriber
    pub fn publish(&self, event: &StatusEvent) {
        // Snapshot so callbacks may register more subscribers
        let subscribers: Vec<StatusCallback> = self.status.read().clone();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    pub fn notify_idle(&self) {
        let subscribers: Vec<Notification> = self.idle.read().clone();
        for subscriber in subscribers {
            subscriber();
        }
    }

    pub fn notify_idle_timeout(&self) {
        let subscribers: Vec<Notification> = self.idle_timeout.read().clone();
        for subscriber in subscribers {
            subscriber();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::events::StatusKind;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_bus_subscribe() {
        let bus = StatusBus::new();
        let rx = bus.subscribe();
        bus.publish(&StatusEvent::new(StatusKind::Added, "rain"));
        assert_eq!(rx.try_recv().unwrap(), StatusEvent::new(StatusKind::Added, "rain"));
    }

    #[test]
    fn test_bus_publish_to_channel() {
        let bus = StatusBus::new();
        let rx = bus.subscribe();

        bus.publish(&StatusEvent::new(StatusKind::Added, "rain"));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.kind, StatusKind::Added);
        assert_eq!(received.sound_key, "rain");
    }

    #[test]
    fn test_bus_delivers_in_registration_order() {
        let bus = StatusBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let order = Arc::clone(&order);
            bus.on_status(move |_| order.lock().push(id));
        }

        bus.publish(&StatusEvent::new(StatusKind::Paused, "wind"));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_bus_idle_notifications_are_separate() {
        let bus = StatusBus::new();
        let idle = Arc::new(AtomicUsize::new(0));
        let timeout = Arc::new(AtomicUsize::new(0));

        let idle_clone = Arc::clone(&idle);
        bus.on_idle(move || {
            idle_clone.fetch_add(1, Ordering::SeqCst);
        });
        let timeout_clone = Arc::clone(&timeout);
        bus.on_idle_timeout(move || {
            timeout_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify_idle();
        assert_eq!(idle.load(Ordering::SeqCst), 1);
        assert_eq!(timeout.load(Ordering::SeqCst), 0);

        bus.notify_idle_timeout();
        assert_eq!(timeout.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bus_clone_shares_subscribers() {
        let bus1 = StatusBus::new();
        let bus2 = bus1.clone();

        let rx = bus1.subscribe();
        bus2.publish(&StatusEvent::new(StatusKind::Paused, "wind"));
        assert_eq!(rx.try_recv().unwrap().sound_key, "wind");
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let bus = StatusBus::new();
        drop(bus.subscribe());
        bus.publish(&StatusEvent::new(StatusKind::Removed, "rain"));
    }
}

use tokio::sync::broadcast;

use super::event::Event;

/// Lifecycle event channel shared by the lifecycle, the adapter teardown,
/// and the worker tasks.
///
/// Publishing never blocks and never fails: with no receiver attached the
/// event is dropped, and a receiver that falls behind skips the oldest
/// events (`RecvError::Lagged`).
#[derive(Clone, Debug)]
pub(crate) struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// `capacity` is the ring size; callers pass `RuntimeConfig::bus_capacity_clamped`.
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LifecycleState;
    use crate::events::EventKind;

    #[test]
    fn publish_without_receivers_is_dropped() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
        bus.publish(Event::state_changed(LifecycleState::Terminated));
        assert_eq!(rx.try_recv().unwrap().state, Some(LifecycleState::Terminated));
    }
}

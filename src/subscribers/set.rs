//! Per-subscriber delivery of lifecycle events.
//!
//! The lifecycle's listener hands every bus event to [`SubscriberSet::emit`],
//! which queues it for each subscriber without waiting. One task per
//! subscriber drains its queue in order; a panicking `on_event` is logged
//! and the task keeps going. Events that do not fit a full queue are counted
//! and reported once at [`SubscriberSet::shutdown`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::Subscribe;
use crate::events::Event;

struct Delivery {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
    drain: JoinHandle<()>,
}

pub(crate) struct SubscriberSet {
    deliveries: Vec<Delivery>,
}

impl SubscriberSet {
    /// Spawns one drain task per subscriber; must run inside a tokio runtime.
    pub(crate) fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let deliveries = subscribers
            .into_iter()
            .map(|sub| {
                let name = sub.name();
                let (queue, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
                let drain = tokio::spawn(async move {
                    while let Some(ev) = rx.recv().await {
                        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                            .catch_unwind()
                            .await;
                        if handled.is_err() {
                            tracing::error!(subscriber = name, seq = ev.seq, "subscriber panicked");
                        }
                    }
                });
                Delivery {
                    name,
                    queue,
                    dropped: AtomicU64::new(0),
                    drain,
                }
            })
            .collect();
        Self { deliveries }
    }

    /// Queues `event` for every subscriber without waiting.
    pub(crate) fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for delivery in &self.deliveries {
            if delivery.queue.try_send(Arc::clone(&event)).is_err() {
                delivery.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Closes every queue, waits for the drain tasks, and returns the total
    /// number of events that were not delivered.
    pub(crate) async fn shutdown(self) -> u64 {
        let mut lost = 0;
        for Delivery {
            name,
            queue,
            dropped,
            drain,
        } in self.deliveries
        {
            drop(queue);
            let _ = drain.await;
            let dropped = dropped.into_inner();
            if dropped > 0 {
                tracing::warn!(subscriber = name, dropped, "subscriber missed events");
            }
            lost += dropped;
        }
        lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::{Notify, Semaphore};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
    }

    /// Holds every event until a permit is released; queue holds one more.
    struct Stalled {
        entered: Notify,
        release: Semaphore,
    }

    #[async_trait]
    impl Subscribe for Stalled {
        async fn on_event(&self, _event: &Event) {
            self.entered.notify_one();
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_survives_panicking_sibling() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>, Arc::new(Panicky)]);

        set.emit(&Event::new(EventKind::Connected));
        set.emit(&Event::new(EventKind::Bound));
        assert_eq!(set.shutdown().await, 0);

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![EventKind::Connected, EventKind::Bound]
        );
    }

    #[tokio::test]
    async fn full_queue_counts_missed_events() {
        let stalled = Arc::new(Stalled {
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        let set = SubscriberSet::new(vec![stalled.clone() as Arc<dyn Subscribe>]);

        set.emit(&Event::new(EventKind::WorkerStarted));
        // the drain task now holds the first event
        stalled.entered.notified().await;
        set.emit(&Event::new(EventKind::WorkerStopped));
        set.emit(&Event::new(EventKind::WorkerCancelled));

        stalled.release.add_permits(2);
        assert_eq!(set.shutdown().await, 1);
    }
}

use std::sync::Arc;

use tokio::sync::{self, broadcast::error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{adapter::Adapter, lifecycle::Lifecycle, state::LifecycleState};
use crate::{
    backplane::BusConnector,
    config::RuntimeConfig,
    events::Bus,
    protocol::Registry,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Lifecycle`] with optional subscribers.
pub struct LifecycleBuilder {
    cfg: RuntimeConfig,
    registry: Arc<Registry>,
    connector: Arc<dyn BusConnector>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LifecycleBuilder {
    pub(super) fn new(
        cfg: RuntimeConfig,
        registry: Arc<Registry>,
        connector: Arc<dyn BusConnector>,
    ) -> Self {
        Self {
            cfg,
            registry,
            connector,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the lifecycle manager in `Uninitialized` state.
    ///
    /// Must be called inside a tokio runtime when subscribers are set.
    pub fn build(self) -> Lifecycle {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let slots = self
            .cfg
            .worker_limit()
            .map(sync::Semaphore::new)
            .map(Arc::new);

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            Some(subscriber_listener(
                &bus,
                SubscriberSet::new(self.subscribers),
            ))
        };

        Lifecycle {
            cfg: self.cfg,
            registry: self.registry,
            connector: self.connector,
            adapter: Adapter::new(bus.clone()),
            bus,
            state: LifecycleState::Uninitialized,
            runtime_token: CancellationToken::new(),
            slots,
            listener,
            wants_data: false,
            wants_actuate: false,
        }
    }
}

/// Forwards bus events to the subscriber set until every publisher is gone.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    })
}

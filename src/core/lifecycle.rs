//! # Lifecycle manager: builds, runs and tears down the adapter.
//!
//! The [`Lifecycle`] owns the [`Adapter`] instance, the event bus, and the
//! runtime token every worker token is derived from.
//!
//! ## High-level flow
//! ```text
//! launch(config)
//!   ├─► configure(config)      Uninitialized → Configured   (owned copies of credentials/paths)
//!   ├─► connect()              Configured → Connected       (ConnectionError: full release, fatal)
//!   ├─► bind()                 Connected → Bound            (UnknownTypeError: full release, fatal)
//!   │      └─► registry.bind(type, wants_data, wants_actuate)
//!   │      └─► context lock created, unit.parse(...) → context (None = idle, not fatal)
//!   └─► start_workers()        Bound → Running
//!          ├─► data worker     (if bound and context present)
//!          └─► actuate worker  (if bound and context present)
//!              failures → AdapterError::WorkerStart, siblings keep running
//!
//! shutdown()
//!   Running/any → ShuttingDown
//!     ├─► runtime_token.cancel()   → propagates to worker tokens
//!     ├─► worker slots closed      → no late starts
//!     └─► Adapter::release(grace)  → reverse order
//!   ShuttingDown → Terminated     (second call: nothing left to release)
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use devgate::{Config, LocalBackplane, Lifecycle, LogWriter, NoPrompt, Registry, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::resolve(
//!         ["-t", "modbus", "-c", "/etc/adapter", "-j", "gw@example", "-p", "s", "-d"],
//!         &NoPrompt,
//!     )?;
//!     let mut lifecycle = Lifecycle::builder(
//!         RuntimeConfig::default(),
//!         Arc::new(Registry::new()),
//!         Arc::new(LocalBackplane::open(64)),
//!     )
//!     .with_subscribers(vec![Arc::new(LogWriter::new())])
//!     .build();
//!
//!     lifecycle.launch(&cfg).await?;
//!     lifecycle.finish().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::adapter::{Adapter, ReleaseReport};
use super::builder::LifecycleBuilder;
use super::state::LifecycleState;
use super::worker::start_worker;
use crate::backplane::BusConnector;
use crate::config::{Config, RuntimeConfig};
use crate::error::AdapterError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{Capability, ContextLock, ParseInput, Registry};

/// Upper bound on how long [`Lifecycle::finish`] waits for subscribers to drain.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// The lifecycle manager.
pub struct Lifecycle {
    pub(super) cfg: RuntimeConfig,
    pub(super) registry: Arc<Registry>,
    pub(super) connector: Arc<dyn BusConnector>,
    pub(super) bus: Bus,
    pub(super) adapter: Adapter,
    pub(super) state: LifecycleState,
    pub(super) runtime_token: CancellationToken,
    pub(super) slots: Option<Arc<Semaphore>>,
    pub(super) listener: Option<JoinHandle<()>>,
    pub(super) wants_data: bool,
    pub(super) wants_actuate: bool,
}

impl Lifecycle {
    /// Starts building a lifecycle manager.
    pub fn builder(
        cfg: RuntimeConfig,
        registry: Arc<Registry>,
        connector: Arc<dyn BusConnector>,
    ) -> LifecycleBuilder {
        LifecycleBuilder::new(cfg, registry, connector)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.cfg
    }

    /// Receives lifecycle events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runs every startup step in order.
    ///
    /// Returns the number of workers started. Fatal errors leave the adapter
    /// fully released and `Terminated`; `AdapterError::WorkerStart` leaves it
    /// `Running` with whichever workers did start.
    pub async fn launch(&mut self, config: &Config) -> Result<usize, AdapterError> {
        self.configure(config)?;
        self.connect().await?;
        self.bind().await?;
        self.start_workers()
    }

    /// `Uninitialized → Configured`: takes owned copies of the record's fields.
    pub fn configure(&mut self, config: &Config) -> Result<(), AdapterError> {
        self.require(LifecycleState::Uninitialized)?;
        self.adapter.identity = Some(config.identity().into());
        self.adapter.secret = Some(config.secret().clone());
        self.adapter.protocol = Some(config.protocol().into());
        self.adapter.config_dir = Some(config.config_dir().into());
        self.wants_data = config.wants_data();
        self.wants_actuate = config.wants_actuate();
        self.transition(LifecycleState::Configured);
        Ok(())
    }

    /// `Configured → Connected`: opens the backplane session. No retry.
    pub async fn connect(&mut self) -> Result<(), AdapterError> {
        self.require(LifecycleState::Configured)?;
        let (Some(identity), Some(secret)) = (self.adapter.identity.clone(), &self.adapter.secret)
        else {
            return Err(self.invalid(LifecycleState::Configured));
        };

        let connected = self.connector.connect(&identity, secret).await;
        match connected {
            Ok(connection) => {
                self.adapter.connection = Some(connection);
                self.bus
                    .publish(Event::new(EventKind::Connected).with_reason(identity));
                self.transition(LifecycleState::Connected);
                Ok(())
            }
            Err(err) => {
                self.bus
                    .publish(Event::new(EventKind::ConnectFailed).with_reason(err.as_label()));
                self.shutdown().await;
                Err(err.into())
            }
        }
    }

    /// `Connected → Bound`: resolves the protocol unit and runs its `parse`.
    pub async fn bind(&mut self) -> Result<(), AdapterError> {
        self.require(LifecycleState::Connected)?;
        let Some(protocol) = self.adapter.protocol.clone() else {
            return Err(self.invalid(LifecycleState::Connected));
        };

        let binding = match self
            .registry
            .bind(&protocol, self.wants_data, self.wants_actuate)
        {
            Ok(binding) => binding,
            Err(err) => {
                self.bus
                    .publish(Event::new(EventKind::UnknownType).with_protocol(Arc::clone(&protocol)));
                self.shutdown().await;
                return Err(err.into());
            }
        };

        for capability in [Capability::Data, Capability::Actuate] {
            if self.wants(capability) && binding.worker(capability).is_none() {
                self.bus.publish(
                    Event::new(EventKind::CapabilityUnavailable)
                        .with_protocol(Arc::clone(&protocol))
                        .with_worker(capability.as_str()),
                );
            }
        }
        self.bus
            .publish(Event::new(EventKind::Bound).with_protocol(Arc::clone(&protocol)));

        self.adapter.context_lock = Some(ContextLock::new());
        let context = match &self.adapter.config_dir {
            Some(config_dir) => binding.parse(&ParseInput {
                kind: binding.kind(),
                config_dir,
                identity: self.adapter.identity.as_deref().unwrap_or_default(),
            }),
            None => None,
        };
        if context.is_none() {
            self.bus
                .publish(Event::new(EventKind::ContextMissing).with_protocol(protocol));
        }
        self.adapter.context = context;
        self.adapter.binding = Some(binding);
        self.transition(LifecycleState::Bound);
        Ok(())
    }

    /// `Bound → Running`: starts each bound worker independently.
    ///
    /// A start failure is reported without unwinding an already started sibling.
    pub fn start_workers(&mut self) -> Result<usize, AdapterError> {
        self.require(LifecycleState::Bound)?;
        let mut started = 0;
        let mut failures = Vec::new();

        if let (Some(binding), Some(scope)) = (self.adapter.binding.clone(), self.adapter.scope()) {
            for capability in [Capability::Data, Capability::Actuate] {
                let Some(worker) = binding.worker(capability) else {
                    continue;
                };
                match start_worker(
                    capability,
                    worker,
                    scope.clone(),
                    &self.runtime_token,
                    self.slots.as_ref(),
                    &self.bus,
                ) {
                    Ok(handle) => {
                        self.adapter.store_worker(handle);
                        started += 1;
                    }
                    Err(err) => {
                        self.bus.publish(
                            Event::new(EventKind::WorkerStartFailed)
                                .with_worker(worker.name())
                                .with_reason(err.to_string()),
                        );
                        failures.push(err);
                    }
                }
            }
        }

        self.transition(LifecycleState::Running);
        if failures.is_empty() {
            Ok(started)
        } else {
            Err(AdapterError::WorkerStart(failures))
        }
    }

    /// Cancels workers and releases every resource in reverse order.
    ///
    /// Safe to call in any state and any number of times; later calls
    /// release nothing.
    pub async fn shutdown(&mut self) -> ReleaseReport {
        if !self.state.is_terminal() {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.transition(LifecycleState::ShuttingDown);
            self.runtime_token.cancel();
            if let Some(slots) = &self.slots {
                slots.close();
            }
        }
        let report = self.adapter.release(self.cfg.grace_period()).await;
        if !self.state.is_terminal() {
            self.transition(LifecycleState::Terminated);
        }
        report
    }

    /// Shuts down, then waits (bounded) for subscribers to drain their queues.
    pub async fn finish(mut self) -> ReleaseReport {
        let report = self.shutdown().await;
        let listener = self.listener.take();
        drop(self);
        if let Some(listener) = listener {
            if tokio::time::timeout(FLUSH_TIMEOUT, listener).await.is_err() {
                tracing::warn!("event subscribers did not drain in time");
            }
        }
        report
    }

    fn wants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Data => self.wants_data,
            Capability::Actuate => self.wants_actuate,
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        tracing::debug!(from = %self.state, %to, "lifecycle transition");
        self.state = to;
        self.bus.publish(Event::state_changed(to));
    }

    fn require(&self, expected: LifecycleState) -> Result<(), AdapterError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, expected: LifecycleState) -> AdapterError {
        AdapterError::InvalidState {
            expected,
            actual: self.state,
        }
    }
}

//! # Lifecycle events emitted by the adapter.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: state transitions, connect, bind, parse outcome
//! - **Worker events**: start, start failure, exit, cancellation
//! - **Teardown events**: per-resource release, shutdown request
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use devgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("modbus.data")
//!     .with_reason("device timeout");
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("modbus.data"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::LifecycleState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// The adapter moved to a new state.
    ///
    /// Sets: `state`
    StateChanged,

    /// Backplane session opened.
    ///
    /// Sets: `reason` (identity)
    Connected,

    /// Backplane session could not be opened.
    ///
    /// Sets: `reason` (error label)
    ConnectFailed,

    /// Protocol type resolved to a unit.
    ///
    /// Sets: `protocol`
    Bound,

    /// Protocol type did not resolve.
    ///
    /// Sets: `protocol`
    UnknownType,

    /// `parse` produced no context; the adapter stays idle.
    ///
    /// Sets: `protocol`
    ContextMissing,

    /// A requested capability is not offered by the unit.
    ///
    /// Sets: `protocol`, `worker` (capability name)
    CapabilityUnavailable,

    // === Worker events ===
    /// Worker spawned.
    ///
    /// Sets: `worker`
    WorkerStarted,

    /// Worker could not be admitted.
    ///
    /// Sets: `worker`, `reason`
    WorkerStartFailed,

    /// Worker returned on its own, or after observing cancellation.
    ///
    /// Sets: `worker`
    WorkerStopped,

    /// Worker returned an error.
    ///
    /// Sets: `worker`, `reason`
    WorkerFailed,

    /// Worker was cancelled by teardown.
    ///
    /// Sets: `worker`, `reason` (`"joined"` or `"aborted"`)
    WorkerCancelled,

    // === Teardown events ===
    /// Operator or OS requested shutdown.
    ShutdownRequested,

    /// One owned resource was released.
    ///
    /// Sets: `reason` (resource name: `context`, `context_lock`, `connection`, `credentials`)
    ResourceReleased,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// New state (for `StateChanged`).
    pub state: Option<LifecycleState>,
    /// Worker name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Protocol type name, if applicable.
    pub protocol: Option<Arc<str>>,
    /// Human-readable reason (errors, resource names, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            worker: None,
            protocol: None,
            reason: None,
        }
    }

    /// Creates a state transition event.
    #[inline]
    pub fn state_changed(state: LifecycleState) -> Self {
        let mut ev = Event::new(EventKind::StateChanged);
        ev.state = Some(state);
        ev
    }

    /// Creates a resource release event.
    #[inline]
    pub fn released(resource: &'static str) -> Self {
        Event::new(EventKind::ResourceReleased).with_reason(resource)
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a protocol type name.
    #[inline]
    pub fn with_protocol(mut self, protocol: impl Into<Arc<str>>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}

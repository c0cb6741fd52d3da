//! # Adapter instance: everything one gateway process owns.
//!
//! Populated in acquisition order by the [`Lifecycle`](crate::Lifecycle):
//! ```text
//! credentials ─► connection ─► binding ─► context lock ─► context ─► workers
//! ```
//! and released in the exact reverse order by [`Adapter::release`]:
//! ```text
//! cancel workers ─► close context ─► drop context lock ─► drop binding ─► release connection ─► clear credentials
//! ```
//!
//! ## Rules
//! - Every slot is an `Option`; release `take()`s it, so nothing is released twice.
//! - `release` on an empty adapter is a no-op and reports nothing.
//! - Dropping an adapter that was never released aborts its workers and
//!   releases the rest synchronously.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::backplane::BusConnection;
use crate::config::Secret;
use crate::core::worker::WorkerHandle;
use crate::events::{Bus, Event};
use crate::protocol::{Binding, Capability, ContextLock, ContextRef, ProtocolKind, WorkerScope};

/// What one call to [`Adapter::release`] actually released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub workers_cancelled: usize,
    pub context_closed: bool,
    pub context_lock_released: bool,
    pub connection_released: bool,
    pub credentials_cleared: bool,
}

impl ReleaseReport {
    /// True if nothing was left to release.
    pub fn is_noop(&self) -> bool {
        *self == ReleaseReport::default()
    }
}

/// The adapter instance.
pub struct Adapter {
    pub(crate) identity: Option<Arc<str>>,
    pub(crate) secret: Option<Secret>,
    pub(crate) protocol: Option<Arc<str>>,
    pub(crate) config_dir: Option<Arc<Path>>,
    pub(crate) connection: Option<Arc<dyn BusConnection>>,
    pub(crate) binding: Option<Binding>,
    pub(crate) context_lock: Option<ContextLock>,
    pub(crate) context: Option<ContextRef>,
    pub(crate) data_worker: Option<WorkerHandle>,
    pub(crate) actuate_worker: Option<WorkerHandle>,
    bus: Bus,
}

impl Adapter {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            identity: None,
            secret: None,
            protocol: None,
            config_dir: None,
            connection: None,
            binding: None,
            context_lock: None,
            context: None,
            data_worker: None,
            actuate_worker: None,
            bus,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Resolved protocol kind, once bound.
    pub fn kind(&self) -> Option<ProtocolKind> {
        self.binding.as_ref().map(Binding::kind)
    }

    pub fn connection(&self) -> Option<&Arc<dyn BusConnection>> {
        self.connection.as_ref()
    }

    pub fn context(&self) -> Option<&ContextRef> {
        self.context.as_ref()
    }

    pub fn context_lock(&self) -> Option<&ContextLock> {
        self.context_lock.as_ref()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// True if a worker for the capability was started and not yet cancelled.
    pub fn has_worker(&self, capability: Capability) -> bool {
        self.worker_slot(capability).is_some()
    }

    /// Name of the worker running the capability.
    pub fn worker_name(&self, capability: Capability) -> Option<&str> {
        self.worker_slot(capability).map(WorkerHandle::name)
    }

    /// True if the worker's task already returned.
    pub fn worker_finished(&self, capability: Capability) -> Option<bool> {
        self.worker_slot(capability).map(WorkerHandle::is_finished)
    }

    /// Number of worker handles held.
    pub fn worker_count(&self) -> usize {
        usize::from(self.data_worker.is_some()) + usize::from(self.actuate_worker.is_some())
    }

    /// True if no field is populated.
    pub fn is_empty(&self) -> bool {
        self.identity.is_none()
            && self.secret.is_none()
            && self.protocol.is_none()
            && self.config_dir.is_none()
            && self.connection.is_none()
            && self.binding.is_none()
            && self.context_lock.is_none()
            && self.context.is_none()
            && self.worker_count() == 0
    }

    fn worker_slot(&self, capability: Capability) -> Option<&WorkerHandle> {
        match capability {
            Capability::Data => self.data_worker.as_ref(),
            Capability::Actuate => self.actuate_worker.as_ref(),
        }
    }

    pub(crate) fn store_worker(&mut self, handle: WorkerHandle) {
        match handle.capability() {
            Capability::Data => self.data_worker = Some(handle),
            Capability::Actuate => self.actuate_worker = Some(handle),
        }
    }

    /// Builds the view handed to workers; `None` until connection and context exist.
    pub(crate) fn scope(&self) -> Option<WorkerScope> {
        Some(WorkerScope {
            kind: self.kind()?,
            identity: Arc::clone(self.identity.as_ref()?),
            config_dir: Arc::clone(self.config_dir.as_ref()?),
            connection: Arc::clone(self.connection.as_ref()?),
            context: Arc::clone(self.context.as_ref()?),
            lock: self.context_lock.clone()?,
        })
    }

    /// Releases everything in reverse acquisition order.
    pub(crate) async fn release(&mut self, grace: Option<Duration>) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        // actuate was started last
        for handle in [self.actuate_worker.take(), self.data_worker.take()]
            .into_iter()
            .flatten()
        {
            handle.cancel(grace, &self.bus).await;
            report.workers_cancelled += 1;
        }
        self.release_resources(&mut report);
        report
    }

    fn release_resources(&mut self, report: &mut ReleaseReport) {
        if let Some(context) = self.context.take() {
            context.close();
            report.context_closed = true;
            self.bus.publish(Event::released("context"));
        }
        if self.context_lock.take().is_some() {
            report.context_lock_released = true;
            self.bus.publish(Event::released("context_lock"));
        }
        self.binding = None;
        if let Some(connection) = self.connection.take() {
            connection.release();
            report.connection_released = true;
            self.bus.publish(Event::released("connection"));
        }
        let had_credentials = self.identity.take().is_some() | self.secret.take().is_some();
        self.protocol = None;
        self.config_dir = None;
        if had_credentials {
            report.credentials_cleared = true;
            self.bus.publish(Event::released("credentials"));
        }
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        for handle in [self.actuate_worker.take(), self.data_worker.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
        let mut report = ReleaseReport::default();
        self.release_resources(&mut report);
    }
}

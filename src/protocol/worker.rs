//! # Worker abstraction and function-backed worker.
//!
//! A [`Worker`] is the body of a data or actuate loop. It is spawned once per
//! adapter run with a [`WorkerScope`] (its view of the adapter instance) and a
//! [`CancellationToken`], and is expected to run until the token fires.
//!
//! [`WorkerFn`] wraps a closure `F: Fn(WorkerScope, CancellationToken) -> Fut`,
//! producing a fresh future per spawn.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use devgate::{WorkerError, WorkerFn, WorkerRef, WorkerScope};
//!
//! let w: WorkerRef = WorkerFn::arc("demo.data", |_scope: WorkerScope, token: CancellationToken| async move {
//!     token.cancelled().await;
//!     Err::<(), _>(WorkerError::Canceled)
//! });
//! assert_eq!(w.name(), "demo.data");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::context::{ContextLock, ContextRef};
use super::kind::ProtocolKind;
use crate::backplane::BusConnection;
use crate::error::WorkerError;

/// Boxed future returned by [`Worker::spawn`].
pub type BoxWorkerFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// # Long-running, cancelable worker body.
///
/// Implementors must stop touching the scope's context and connection once
/// the token is cancelled: teardown releases both right after requesting
/// cancellation.
pub trait Worker: Send + Sync + 'static {
    /// Returns a stable, human-readable worker name (e.g. `modbus.data`).
    fn name(&self) -> &str;

    /// Creates the worker future.
    fn spawn(&self, scope: WorkerScope, token: CancellationToken) -> BoxWorkerFuture;
}

/// Function-backed worker implementation.
#[derive(Debug)]
pub struct WorkerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates a new function-backed worker.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the worker and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(WorkerScope, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, scope: WorkerScope, token: CancellationToken) -> BoxWorkerFuture {
        Box::pin((self.f)(scope, token))
    }
}

/// A worker's view of the adapter instance.
///
/// Every field is valid for the worker's whole run: workers are only started
/// once the connection is open and the context exists.
#[derive(Clone)]
pub struct WorkerScope {
    pub(crate) kind: ProtocolKind,
    pub(crate) identity: Arc<str>,
    pub(crate) config_dir: Arc<Path>,
    pub(crate) connection: Arc<dyn BusConnection>,
    pub(crate) context: ContextRef,
    pub(crate) lock: ContextLock,
}

impl WorkerScope {
    pub fn kind(&self) -> ProtocolKind {
        self.kind
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The backplane session shared by both workers.
    pub fn connection(&self) -> &Arc<dyn BusConnection> {
        &self.connection
    }

    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    /// Guard shared with the sibling worker.
    pub fn lock(&self) -> &ContextLock {
        &self.lock
    }

    /// Downcasts the opaque context to the unit's concrete type.
    pub fn context_as<T: 'static>(&self) -> Result<&T, WorkerError> {
        self.context
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| WorkerError::Fatal {
                error: format!("{} context has unexpected type", self.kind),
            })
    }
}

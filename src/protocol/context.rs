use std::any::Any;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Opaque protocol state produced by [`ProtocolUnit::parse`](crate::ProtocolUnit::parse).
///
/// The gateway core only moves it around and calls [`close`](Self::close)
/// once during teardown. Workers recover their concrete type through
/// [`as_any`](Self::as_any).
pub trait ProtocolContext: Send + Sync + 'static {
    /// Releases protocol resources (device handles, sessions, files).
    ///
    /// Called exactly once, after workers were cancelled and before the
    /// backplane connection is released.
    fn close(&self);

    /// Downcast hook for the unit's own workers.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a protocol context.
pub type ContextRef = Arc<dyn ProtocolContext>;

/// Mutual-exclusion guard serialising data and actuate access to one context.
///
/// Owned by the adapter instance and handed to both workers. The core never
/// takes it itself.
#[derive(Clone, Debug, Default)]
pub struct ContextLock {
    inner: Arc<Mutex<()>>,
}

impl ContextLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the context.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    /// Number of live handles (adapter + workers).
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

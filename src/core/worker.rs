//! # Worker handles: admission, execution and cancellation.
//!
//! ## Flow
//! ```text
//! start_worker(cap, worker, scope)
//!   ├─► runtime token cancelled?      → WorkerStartError::ShuttingDown
//!   ├─► try_acquire worker slot       → WorkerStartError::Exhausted
//!   ├─► child token = runtime_token.child_token()
//!   ├─► tokio::spawn(run_worker(worker.spawn(scope, child)))
//!   └─► publish WorkerStarted
//!
//! run_worker:
//!   Ok(()) / Err(Canceled) → publish WorkerStopped
//!   Err(Fail/Fatal)        → publish WorkerFailed
//!
//! WorkerHandle::cancel(grace):
//!   cancel token ─► grace? wait join : abort ─► publish WorkerCancelled
//! ```
//!
//! ## Rules
//! - Each worker has its **own** child token; cancelling one never touches the sibling.
//! - The slot permit lives in the handle and is returned when the handle is dropped.
//! - Teardown never waits longer than the grace period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{WorkerError, WorkerStartError};
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{BoxWorkerFuture, Capability, WorkerRef, WorkerScope};

/// Owned handle to a running worker.
pub(crate) struct WorkerHandle {
    capability: Capability,
    name: Arc<str>,
    join: JoinHandle<()>,
    cancel: CancellationToken,
    _permit: Option<OwnedSemaphorePermit>,
}

impl WorkerHandle {
    pub(crate) fn capability(&self) -> Capability {
        self.capability
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Requests cancellation, waits up to `grace`, then aborts.
    pub(crate) async fn cancel(mut self, grace: Option<Duration>, bus: &Bus) {
        self.cancel.cancel();
        let how = if self.join.is_finished() {
            "finished"
        } else {
            match grace {
                Some(grace) => match time::timeout(grace, &mut self.join).await {
                    Ok(_) => "joined",
                    Err(_elapsed) => {
                        self.join.abort();
                        "aborted"
                    }
                },
                None => {
                    self.join.abort();
                    "aborted"
                }
            }
        };
        bus.publish(
            Event::new(EventKind::WorkerCancelled)
                .with_worker(Arc::clone(&self.name))
                .with_reason(how),
        );
    }

    /// Synchronous stop for drop paths: cancel and abort without waiting.
    pub(crate) fn abort(self) {
        self.cancel.cancel();
        self.join.abort();
    }
}

/// Admits and spawns one worker.
pub(crate) fn start_worker(
    capability: Capability,
    worker: &WorkerRef,
    scope: WorkerScope,
    runtime_token: &CancellationToken,
    slots: Option<&Arc<Semaphore>>,
    bus: &Bus,
) -> Result<WorkerHandle, WorkerStartError> {
    if runtime_token.is_cancelled() {
        return Err(WorkerStartError::ShuttingDown { capability });
    }
    let permit = match slots {
        Some(sem) => Some(Arc::clone(sem).try_acquire_owned().map_err(|err| match err {
            TryAcquireError::NoPermits => WorkerStartError::Exhausted { capability },
            TryAcquireError::Closed => WorkerStartError::ShuttingDown { capability },
        })?),
        None => None,
    };

    let name: Arc<str> = worker.name().into();
    let token = runtime_token.child_token();
    let fut = worker.spawn(scope, token.clone());
    let join = tokio::spawn(run_worker(fut, Arc::clone(&name), bus.clone()));

    bus.publish(Event::new(EventKind::WorkerStarted).with_worker(Arc::clone(&name)));
    Ok(WorkerHandle {
        capability,
        name,
        join,
        cancel: token,
        _permit: permit,
    })
}

/// Drives one worker future and reports how it ended.
async fn run_worker(fut: BoxWorkerFuture, name: Arc<str>, bus: Bus) {
    match fut.await {
        Ok(()) | Err(WorkerError::Canceled) => {
            bus.publish(Event::new(EventKind::WorkerStopped).with_worker(name));
        }
        Err(err) => {
            bus.publish(
                Event::new(EventKind::WorkerFailed)
                    .with_worker(name)
                    .with_reason(err.to_string()),
            );
        }
    }
}

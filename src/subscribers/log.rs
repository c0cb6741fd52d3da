//! # LogWriter: lifecycle events as tracing records
//!
//! ## Example output
//! ```text
//! INFO state changed state=connected
//! INFO connected identity="gateway@example"
//! INFO worker started worker="modbus.data"
//! WARN worker failed worker="modbus.data" reason="device timeout"
//! INFO worker cancelled worker="modbus.data" how="aborted"
//! INFO resource released resource="connection"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every event to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let protocol = e.protocol.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::StateChanged => {
                let state = e.state.map(|s| s.as_str()).unwrap_or("-");
                tracing::info!(seq = e.seq, state, "state changed");
            }
            EventKind::Connected => tracing::info!(identity = reason, "connected"),
            EventKind::ConnectFailed => tracing::error!(reason, "connect failed"),
            EventKind::Bound => tracing::info!(protocol, "protocol bound"),
            EventKind::UnknownType => tracing::error!(protocol, "unknown protocol type"),
            EventKind::ContextMissing => {
                tracing::warn!(protocol, "parse produced no context; no workers will start")
            }
            EventKind::CapabilityUnavailable => {
                tracing::debug!(protocol, capability = worker, "capability not offered by unit")
            }
            EventKind::WorkerStarted => tracing::info!(worker, "worker started"),
            EventKind::WorkerStartFailed => tracing::error!(worker, reason, "worker start failed"),
            EventKind::WorkerStopped => tracing::info!(worker, "worker stopped"),
            EventKind::WorkerFailed => tracing::warn!(worker, reason, "worker failed"),
            EventKind::WorkerCancelled => tracing::info!(worker, how = reason, "worker cancelled"),
            EventKind::ShutdownRequested => tracing::info!(source = reason, "shutdown requested"),
            EventKind::ResourceReleased => tracing::debug!(resource = reason, "resource released"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}

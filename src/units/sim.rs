//! # Simulated protocol unit.
//!
//! Stands in for a field-bus driver: the data worker produces a counter
//! reading per poll, the actuate worker applies commands addressed to the
//! adapter's identity. Both take the context lock around every access.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::backplane::Message;
use crate::error::WorkerError;
use crate::protocol::{
    ContextRef, ParseInput, ProtocolContext, ProtocolKind, ProtocolUnit, WorkerFn, WorkerRef,
    WorkerScope,
};

/// Default poll interval of the data worker.
pub const DEFAULT_POLL: Duration = Duration::from_secs(1);

/// Protocol state of a simulated unit.
#[derive(Debug)]
pub struct SimContext {
    node: Arc<str>,
    readings: AtomicU64,
    last_command: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl SimContext {
    fn new(node: impl Into<Arc<str>>) -> Self {
        Self {
            node: node.into(),
            readings: AtomicU64::new(0),
            last_command: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Node id readings are published under.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Number of readings taken so far.
    pub fn readings(&self) -> u64 {
        self.readings.load(Ordering::SeqCst)
    }

    pub fn last_command(&self) -> Option<String> {
        self.last_command
            .lock()
            .ok()
            .and_then(|command| command.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_reading(&self) -> u64 {
        self.readings.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, command: &str) {
        if let Ok(mut last) = self.last_command.lock() {
            *last = Some(command.to_string());
        }
    }
}

impl ProtocolContext for SimContext {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Simulated implementation of one protocol type.
pub struct SimulatedUnit {
    kind: ProtocolKind,
    data: WorkerRef,
    actuate: Option<WorkerRef>,
}

impl SimulatedUnit {
    pub fn new(kind: ProtocolKind) -> Self {
        Self::with_poll(kind, DEFAULT_POLL)
    }

    /// Builds the unit with a custom data poll interval.
    pub fn with_poll(kind: ProtocolKind, poll: Duration) -> Self {
        let data: WorkerRef = WorkerFn::arc(
            format!("{kind}.data"),
            move |scope: WorkerScope, token: CancellationToken| data_loop(scope, token, poll),
        );
        // enfuse meters are read-only
        let actuate = (kind != ProtocolKind::Enfuse).then(|| {
            let worker: WorkerRef = WorkerFn::arc(format!("{kind}.actuate"), actuate_loop);
            worker
        });
        Self {
            kind,
            data,
            actuate,
        }
    }
}

impl ProtocolUnit for SimulatedUnit {
    fn kind(&self) -> ProtocolKind {
        self.kind
    }

    fn parse(&self, input: &ParseInput<'_>) -> Option<ContextRef> {
        if !input.config_dir.is_dir() {
            tracing::warn!(
                protocol = %input.kind,
                config_dir = %input.config_dir.display(),
                "configuration directory not found"
            );
            return None;
        }
        let node = format!("{}/{}", input.kind, input.identity);
        Some(Arc::new(SimContext::new(node)))
    }

    fn data(&self) -> Option<WorkerRef> {
        Some(Arc::clone(&self.data))
    }

    fn actuate(&self) -> Option<WorkerRef> {
        self.actuate.clone()
    }
}

async fn data_loop(
    scope: WorkerScope,
    token: CancellationToken,
    poll: Duration,
) -> Result<(), WorkerError> {
    let ctx = scope.context_as::<SimContext>()?;
    loop {
        tokio::select! {
            _ = token.cancelled() => return Err(WorkerError::Canceled),
            _ = tokio::time::sleep(poll) => {}
        }
        let _guard = scope.lock().lock().await;
        if ctx.is_closed() {
            return Ok(());
        }
        let reading = ctx.take_reading();
        scope.connection().publish(Message::data(
            scope.identity(),
            ctx.node(),
            reading.to_string(),
        ))?;
    }
}

async fn actuate_loop(scope: WorkerScope, token: CancellationToken) -> Result<(), WorkerError> {
    let ctx = scope.context_as::<SimContext>()?;
    let mut rx = scope.connection().subscribe()?;
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => return Err(WorkerError::Canceled),
            received = rx.recv() => received,
        };
        match message {
            Ok(message) if message.is_command_for(scope.identity()) => {
                let _guard = scope.lock().lock().await;
                if ctx.is_closed() {
                    return Ok(());
                }
                tracing::info!(from = %message.from, command = %message.payload, "command applied");
                ctx.apply(&message.payload);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "command backlog dropped"),
            Err(RecvError::Closed) => return Err(WorkerError::Canceled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backplane::{BusConnector, LocalBackplane, MessageKind};
    use crate::config::Secret;
    use crate::protocol::{Capability, ContextLock};
    use std::path::Path;

    async fn scope_for(unit: &SimulatedUnit, backplane: &LocalBackplane, dir: &Path) -> WorkerScope {
        let connection = backplane
            .connect("gw@example", &Secret::new("s"))
            .await
            .unwrap();
        let context = unit
            .parse(&ParseInput {
                kind: unit.kind(),
                config_dir: dir,
                identity: "gw@example",
            })
            .unwrap();
        WorkerScope {
            kind: unit.kind(),
            identity: "gw@example".into(),
            config_dir: dir.into(),
            connection,
            context,
            lock: ContextLock::new(),
        }
    }

    #[test]
    fn parse_needs_an_existing_directory() {
        let unit = SimulatedUnit::new(ProtocolKind::Modbus);
        let input = ParseInput {
            kind: ProtocolKind::Modbus,
            config_dir: Path::new("/definitely/not/here"),
            identity: "gw@example",
        };
        assert!(unit.parse(&input).is_none());
    }

    #[test]
    fn enfuse_is_data_only() {
        let unit = SimulatedUnit::new(ProtocolKind::Enfuse);
        assert!(unit.worker(Capability::Data).is_some());
        assert!(unit.worker(Capability::Actuate).is_none());

        let hue = SimulatedUnit::new(ProtocolKind::Hue);
        assert_eq!(hue.actuate().unwrap().name(), "hue.actuate");
    }

    #[tokio::test(start_paused = true)]
    async fn data_worker_publishes_readings_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let backplane = LocalBackplane::open(16);
        let mut rx = backplane.subscribe();
        let unit = SimulatedUnit::with_poll(ProtocolKind::Modbus, Duration::from_millis(10));
        let scope = scope_for(&unit, &backplane, dir.path()).await;
        let token = CancellationToken::new();

        let task = tokio::spawn(unit.data().unwrap().spawn(scope, token.clone()));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, MessageKind::Data);
        assert_eq!(&*first.node, "modbus/gw@example");
        assert_eq!(&*first.payload, "1");

        token.cancel();
        assert_eq!(task.await.unwrap(), Err(WorkerError::Canceled));
    }

    #[tokio::test]
    async fn actuate_worker_applies_addressed_commands() {
        let dir = tempfile::tempdir().unwrap();
        let backplane = LocalBackplane::open(16);
        let unit = SimulatedUnit::new(ProtocolKind::Pup);
        let scope = scope_for(&unit, &backplane, dir.path()).await;
        let context = Arc::clone(scope.context());
        let token = CancellationToken::new();

        let task = tokio::spawn(unit.actuate().unwrap().spawn(scope, token.clone()));
        // let the worker subscribe before injecting
        while backplane.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        backplane.inject(Message::command("ops", "someone-else", "off"));
        backplane.inject(Message::command("ops", "gw@example", "on"));

        let ctx = context.as_any().downcast_ref::<SimContext>().unwrap();
        while ctx.last_command().is_none() {
            tokio::task::yield_now().await;
        }
        assert_eq!(ctx.last_command().as_deref(), Some("on"));

        token.cancel();
        assert_eq!(task.await.unwrap(), Err(WorkerError::Canceled));
    }

    #[tokio::test]
    async fn closed_context_stops_the_data_worker() {
        let dir = tempfile::tempdir().unwrap();
        let backplane = LocalBackplane::open(16);
        let unit = SimulatedUnit::with_poll(ProtocolKind::B3, Duration::from_millis(1));
        let scope = scope_for(&unit, &backplane, dir.path()).await;
        scope.context().close();

        let result = unit.data().unwrap().spawn(scope, CancellationToken::new()).await;
        assert_eq!(result, Ok(()));
    }
}

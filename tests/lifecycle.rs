use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use devgate::{
    AdapterError, Capability, Config, ConnectionError, ContextRef, Event, EventKind, Lifecycle,
    LifecycleState, LocalBackplane, NoPrompt, ProtocolContext, ProtocolKind, Registry,
    RuntimeConfig, UnitBundle, WorkerError, WorkerFn, WorkerRef, WorkerScope, WorkerStartError,
    control,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

struct CountingContext {
    closes: Arc<AtomicUsize>,
}

impl ProtocolContext for CountingContext {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn idle(name: &'static str) -> WorkerRef {
    WorkerFn::arc(name, |scope: WorkerScope, token: CancellationToken| async move {
        scope.context_as::<CountingContext>()?;
        token.cancelled().await;
        Err::<(), _>(WorkerError::Canceled)
    })
}

/// Unit whose parse yields a counting context and whose workers idle until cancelled.
fn counting_unit(
    kind: ProtocolKind,
    closes: &Arc<AtomicUsize>,
    parses: &Arc<AtomicUsize>,
) -> UnitBundle {
    let closes = Arc::clone(closes);
    let parses = Arc::clone(parses);
    UnitBundle::new(kind, move |_input| {
        parses.fetch_add(1, Ordering::SeqCst);
        let context: ContextRef = Arc::new(CountingContext {
            closes: Arc::clone(&closes),
        });
        Some(context)
    })
}

fn config(dir: &Path, protocol: &str, flags: &[&str]) -> Config {
    let mut tokens = vec![
        "-t".to_string(),
        protocol.to_string(),
        "-c".to_string(),
        dir.display().to_string(),
        "-j".to_string(),
        "gw@example".to_string(),
        "-p".to_string(),
        "s3cret".to_string(),
    ];
    tokens.extend(flags.iter().map(|f| f.to_string()));
    Config::resolve(tokens, &NoPrompt).unwrap()
}

fn lifecycle(runtime: RuntimeConfig, registry: Registry, backplane: &LocalBackplane) -> Lifecycle {
    Lifecycle::builder(runtime, Arc::new(registry), Arc::new(backplane.clone())).build()
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn states(events: &[Event]) -> Vec<LifecycleState> {
    events.iter().filter_map(|ev| ev.state).collect()
}

#[tokio::test]
async fn full_run_with_both_workers_then_quit() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Modbus, &closes, &parses)
        .with_data(idle("modbus.data"))
        .with_actuate(idle("modbus.actuate"));

    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    let mut events = lc.events();

    let started = lc
        .launch(&config(dir.path(), "modbus", &["-d", "-a"]))
        .await
        .unwrap();
    assert_eq!(started, 2);
    assert_eq!(lc.state(), LifecycleState::Running);
    assert_eq!(parses.load(Ordering::SeqCst), 1);
    assert_eq!(backplane.active_sessions(), 1);
    assert_eq!(lc.adapter().kind(), Some(ProtocolKind::Modbus));
    assert_eq!(lc.adapter().worker_name(Capability::Data), Some("modbus.data"));
    assert_eq!(lc.adapter().worker_name(Capability::Actuate), Some("modbus.actuate"));
    // adapter + two workers share one guard
    assert_eq!(lc.adapter().context_lock().unwrap().holders(), 3);

    let quit = std::io::Cursor::new(b"status\nq\n".to_vec());
    assert!(control::read_until_quit(quit, lc.runtime_config().quit_char).await.unwrap());

    let report = lc.shutdown().await;
    assert_eq!(report.workers_cancelled, 2);
    assert!(report.context_closed);
    assert!(report.context_lock_released);
    assert!(report.connection_released);
    assert!(report.credentials_cleared);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(backplane.active_sessions(), 0);
    assert_eq!(lc.state(), LifecycleState::Terminated);
    assert!(lc.adapter().is_empty());

    assert_eq!(
        states(&drain(&mut events)),
        vec![
            LifecycleState::Configured,
            LifecycleState::Connected,
            LifecycleState::Bound,
            LifecycleState::Running,
            LifecycleState::ShuttingDown,
            LifecycleState::Terminated,
        ]
    );
}

#[tokio::test]
async fn teardown_releases_in_reverse_order() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Hue, &closes, &parses)
        .with_data(idle("hue.data"))
        .with_actuate(idle("hue.actuate"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    lc.launch(&config(dir.path(), "hue", &["-a", "-d"])).await.unwrap();

    let mut events = lc.events();
    lc.shutdown().await;

    let order: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|ev| match ev.kind {
            EventKind::WorkerCancelled => ev.worker.map(|w| w.to_string()),
            EventKind::ResourceReleased => ev.reason.map(|r| r.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        [
            "hue.actuate",
            "hue.data",
            "context",
            "context_lock",
            "connection",
            "credentials"
        ]
    );
}

#[tokio::test]
async fn second_teardown_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Pup, &closes, &parses).with_data(idle("pup.data"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    lc.launch(&config(dir.path(), "pup", &["-d"])).await.unwrap();

    assert!(!lc.shutdown().await.is_noop());
    assert!(lc.shutdown().await.is_noop());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(backplane.releases(), 1);
    assert_eq!(lc.state(), LifecycleState::Terminated);
}

#[tokio::test]
async fn teardown_of_a_never_launched_adapter_is_a_noop() {
    let backplane = LocalBackplane::open(4);
    let mut lc = lifecycle(RuntimeConfig::default(), Registry::new(), &backplane);
    assert!(lc.shutdown().await.is_noop());
    assert_eq!(backplane.connect_attempts(), 0);
}

#[tokio::test]
async fn unknown_type_releases_the_connection_and_starts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Modbus, &closes, &parses).with_data(idle("modbus.data"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );

    let err = lc
        .launch(&config(dir.path(), "zigbee", &["-d"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownType(ref e) if e.name == "zigbee"));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(lc.state(), LifecycleState::Terminated);
    assert_eq!(parses.load(Ordering::SeqCst), 0);
    assert_eq!(backplane.connect_attempts(), 1);
    assert_eq!(backplane.active_sessions(), 0);
    assert!(lc.adapter().is_empty());
}

#[tokio::test]
async fn known_but_unregistered_type_is_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let mut lc = lifecycle(RuntimeConfig::default(), Registry::new(), &backplane);
    let err = lc
        .launch(&config(dir.path(), "bacnet", &["-a"]))
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "unknown_type");
    assert_eq!(backplane.active_sessions(), 0);
}

#[tokio::test]
async fn rejected_credentials_leave_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::with_accounts(16, [("gw@example", "other")]);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Modbus, &closes, &parses).with_data(idle("modbus.data"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );

    let err = lc
        .launch(&config(dir.path(), "modbus", &["-d"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdapterError::Connection(ConnectionError::Auth {
            identity: "gw@example".into()
        })
    );
    assert!(err.is_fatal());
    assert_eq!(lc.state(), LifecycleState::Terminated);
    assert_eq!(parses.load(Ordering::SeqCst), 0);
    assert!(lc.adapter().is_empty());
    assert!(!lc.adapter().has_secret());
}

#[tokio::test]
async fn unreachable_backplane_is_a_network_error() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::unreachable("no route");
    let mut lc = lifecycle(RuntimeConfig::default(), Registry::new(), &backplane);
    let err = lc
        .launch(&config(dir.path(), "modbus", &["-d"]))
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "connection_network");
}

#[tokio::test]
async fn missing_context_runs_idle_with_connection_open() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let unit = UnitBundle::new(ProtocolKind::B3, |_input| None)
        .with_data(idle("b3.data"))
        .with_actuate(idle("b3.actuate"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    let mut events = lc.events();

    assert_eq!(
        lc.launch(&config(dir.path(), "b3", &["-d", "-a"])).await.unwrap(),
        0
    );
    assert_eq!(lc.state(), LifecycleState::Running);
    assert_eq!(lc.adapter().worker_count(), 0);
    assert!(lc.adapter().context().is_none());
    assert!(lc.adapter().connection().unwrap().is_open());
    assert!(
        drain(&mut events)
            .iter()
            .any(|ev| ev.kind == EventKind::ContextMissing)
    );

    let report = lc.shutdown().await;
    assert!(!report.context_closed);
    assert!(report.connection_released);
}

#[tokio::test]
async fn requested_capability_without_worker_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit =
        counting_unit(ProtocolKind::Hue, &closes, &parses).with_actuate(idle("hue.actuate"));
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    let mut events = lc.events();

    assert_eq!(
        lc.launch(&config(dir.path(), "hue", &["-d"])).await.unwrap(),
        0
    );
    assert!(!lc.adapter().has_worker(Capability::Data));
    assert!(!lc.adapter().has_worker(Capability::Actuate));
    let unavailable: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|ev| ev.kind == EventKind::CapabilityUnavailable)
        .collect();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0].worker.as_deref(), Some("data"));
}

#[tokio::test]
async fn worker_slot_exhaustion_keeps_the_started_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Modbus, &closes, &parses)
        .with_data(idle("modbus.data"))
        .with_actuate(idle("modbus.actuate"));
    let runtime = RuntimeConfig {
        max_workers: 1,
        ..RuntimeConfig::default()
    };
    let mut lc = lifecycle(runtime, Registry::new().with_unit(unit), &backplane);

    let err = lc
        .launch(&config(dir.path(), "modbus", &["-d", "-a"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdapterError::WorkerStart(vec![WorkerStartError::Exhausted {
            capability: Capability::Actuate
        }])
    );
    assert!(!err.is_fatal());
    assert_eq!(err.exit_code(), 0);
    assert_eq!(lc.state(), LifecycleState::Running);
    assert!(lc.adapter().has_worker(Capability::Data));
    assert_eq!(lc.adapter().worker_finished(Capability::Data), Some(false));

    assert_eq!(lc.shutdown().await.workers_cancelled, 1);
}

#[tokio::test]
async fn cooperative_worker_is_joined_within_grace() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Pup, &closes, &parses).with_data(idle("pup.data"));
    let runtime = RuntimeConfig {
        grace: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    let mut lc = lifecycle(runtime, Registry::new().with_unit(unit), &backplane);
    lc.launch(&config(dir.path(), "pup", &["-d"])).await.unwrap();

    let mut events = lc.events();
    lc.shutdown().await;
    let events = drain(&mut events);
    let cancelled = events
        .iter()
        .find(|ev| ev.kind == EventKind::WorkerCancelled)
        .unwrap();
    assert_eq!(cancelled.reason.as_deref(), Some("joined"));
    assert!(events.iter().any(|ev| ev.kind == EventKind::WorkerStopped));
}

#[tokio::test]
async fn worker_exit_before_teardown_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let failing: WorkerRef = WorkerFn::arc(
        "enfuse.data",
        |_scope: WorkerScope, _token: CancellationToken| async move {
            Err::<(), _>(WorkerError::Fail {
                error: "meter offline".into(),
            })
        },
    );
    let unit = counting_unit(ProtocolKind::Enfuse, &closes, &parses).with_data(failing);
    let mut lc = lifecycle(
        RuntimeConfig::default(),
        Registry::new().with_unit(unit),
        &backplane,
    );
    let mut events = lc.events();
    lc.launch(&config(dir.path(), "enfuse", &["-d"])).await.unwrap();

    let failed = loop {
        let ev = events.recv().await.unwrap();
        if ev.kind == EventKind::WorkerFailed {
            break ev;
        }
    };
    assert_eq!(failed.worker.as_deref(), Some("enfuse.data"));
    assert!(failed.reason.unwrap().contains("meter offline"));
    // the adapter keeps running until the operator quits
    assert_eq!(lc.state(), LifecycleState::Running);

    let report = lc.shutdown().await;
    assert_eq!(report.workers_cancelled, 1);
    assert!(report.context_closed);
}

#[tokio::test]
async fn steps_out_of_order_are_rejected() {
    let backplane = LocalBackplane::open(4);
    let mut lc = lifecycle(RuntimeConfig::default(), Registry::new(), &backplane);
    let err = lc.connect().await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::InvalidState {
            expected: LifecycleState::Configured,
            actual: LifecycleState::Uninitialized,
        }
    );
    assert_eq!(backplane.connect_attempts(), 0);
}

#[tokio::test]
async fn finish_drains_subscribers() {
    use async_trait::async_trait;
    use devgate::Subscribe;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let backplane = LocalBackplane::open(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let parses = Arc::new(AtomicUsize::new(0));
    let unit = counting_unit(ProtocolKind::Modbus, &closes, &parses).with_data(idle("modbus.data"));
    let recorder = Arc::new(Recorder::default());
    let mut lc = Lifecycle::builder(
        RuntimeConfig::default(),
        Arc::new(Registry::new().with_unit(unit)),
        Arc::new(backplane.clone()),
    )
    .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
    .build();

    lc.launch(&config(dir.path(), "modbus", &["-d"])).await.unwrap();
    lc.finish().await;

    let kinds = recorder.kinds.lock().unwrap().clone();
    assert!(kinds.contains(&EventKind::WorkerStarted));
    assert!(kinds.contains(&EventKind::WorkerCancelled));
    assert_eq!(kinds.last(), Some(&EventKind::StateChanged));
}

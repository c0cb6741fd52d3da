//! # devgate
//!
//! **devgate** is the lifecycle and concurrency core of a device gateway
//! adapter: one process bridges one device protocol onto a messaging
//! backplane.
//!
//! It resolves the startup configuration, opens a single backplane session,
//! binds the requested protocol unit, runs its data and actuate workers
//! concurrently, and tears everything down in reverse order when the
//! operator quits.
//!
//! ## Architecture
//! ```text
//!  argv ──► Config::resolve ──► Config (immutable, valid)
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Lifecycle (state machine)                                        │
//! │  - Registry (protocol type → ProtocolUnit)                        │
//! │  - BusConnector (opens the backplane session)                     │
//! │  - Adapter (owned instance: connection, context, lock, workers)   │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//!   ┌──────────────┐              ┌──────────────┐
//!   │ data worker  │◄── lock ───► │actuate worker│
//!   │ (own token)  │   context    │ (own token)  │
//!   └──────┬───────┘              └──────┬───────┘
//!          └──────── BusConnection ──────┘
//!
//! Bus ──► subscriber_listener ──► SubscriberSet ──► LogWriter / custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Uninitialized ─► Configured ─► Connected ─► Bound ─► Running ─► ShuttingDown ─► Terminated
//! ```
//! Connection failures and unknown protocol types release everything acquired
//! so far and end in `Terminated`. A protocol unit whose `parse` yields no
//! context leaves the adapter `Running` with no workers.
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Configuration** | Command-line resolution, secret prompt, runtime tunables | [`Config`], [`SecretPrompt`], [`RuntimeConfig`] |
//! | **Protocols**     | Pluggable units, registry dispatch, workers              | [`ProtocolUnit`], [`Registry`], [`Worker`]  |
//! | **Backplane**     | Session contract and in-process implementation           | [`BusConnector`], [`LocalBackplane`]        |
//! | **Lifecycle**     | Startup, worker supervision, reverse-order teardown      | [`Lifecycle`], [`Adapter`]                  |
//! | **Events**        | Lifecycle events and subscribers                         | [`Event`], [`Subscribe`], [`LogWriter`]     |
//! | **Errors**        | Typed errors with stable labels and exit codes           | [`AdapterError`], [`WorkerError`]           |
//!
//! ## Cargo features
//! One feature per built-in protocol type (`enfuse`, `hue`, `bacnet`,
//! `modbus`, `pup`, `b3`). The default set leaves out `bacnet`; `all`
//! enables every type.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use devgate::{
//!     Config, LifecycleState, LocalBackplane, Lifecycle, NoPrompt, ProtocolKind, Registry,
//!     RuntimeConfig, UnitBundle, WorkerError, WorkerFn, WorkerScope,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = std::env::temp_dir();
//!     let config = Config::resolve(
//!         ["-t", "modbus", "-c", dir.to_str().unwrap(), "-j", "gw@example", "-p", "s", "-d"],
//!         &NoPrompt,
//!     )?;
//!
//!     // A unit with no context: the adapter runs idle.
//!     let unit = UnitBundle::new(ProtocolKind::Modbus, |_input| None).with_data(WorkerFn::arc(
//!         "modbus.data",
//!         |_scope: WorkerScope, token: CancellationToken| async move {
//!             token.cancelled().await;
//!             Err::<(), _>(WorkerError::Canceled)
//!         },
//!     ));
//!
//!     let mut lifecycle = Lifecycle::builder(
//!         RuntimeConfig::default(),
//!         Arc::new(Registry::new().with_unit(unit)),
//!         Arc::new(LocalBackplane::open(64)),
//!     )
//!     .build();
//!
//!     assert_eq!(lifecycle.launch(&config).await?, 0);
//!     assert_eq!(lifecycle.state(), LifecycleState::Running);
//!
//!     lifecycle.shutdown().await;
//!     assert!(lifecycle.adapter().is_empty());
//!     Ok(())
//! }
//! ```
mod backplane;
mod config;
mod core;
mod error;
mod events;
mod protocol;
mod subscribers;

pub mod control;
pub mod logging;
pub mod session;
pub mod units;

// ---- Public re-exports ----

pub use backplane::{BusConnection, BusConnector, LocalBackplane, LocalSession, Message, MessageKind};
pub use config::{Config, NoPrompt, RuntimeConfig, Secret, SecretPrompt, TerminalPrompt, USAGE};
pub use core::{Adapter, Lifecycle, LifecycleBuilder, LifecycleState, ReleaseReport};
pub use error::{
    AdapterError, ConfigError, ConnectionError, UnknownTypeError, WorkerError, WorkerStartError,
};
pub use events::{Event, EventKind};
pub use session::Session;
pub use protocol::{
    Binding, BoxWorkerFuture, Capability, ContextLock, ContextRef, ParseFn, ParseInput,
    ProtocolContext, ProtocolKind, ProtocolUnit, Registry, UnitBundle, Worker, WorkerFn,
    WorkerRef, WorkerScope,
};
pub use subscribers::{LogWriter, Subscribe};

//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Lifecycle`, `Adapter` teardown, worker runner.
//! - **Consumers**: the lifecycle's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver from [`Lifecycle::events`](crate::Lifecycle::events).

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};

//! # Protocol unit contract.
//!
//! A protocol unit is the pluggable implementation of one device protocol.
//! The gateway core never looks inside it; it only:
//!
//! 1. calls [`ProtocolUnit::parse`] once to obtain an opaque [`ProtocolContext`],
//! 2. runs the unit's optional `data` / `actuate` [`Worker`]s until cancelled,
//! 3. calls [`ProtocolContext::close`] during teardown.
//!
//! ## Contents
//! - [`ProtocolKind`]: closed set of protocol type names
//! - [`Capability`]: the two worker roles
//! - [`ProtocolContext`], [`ContextRef`], [`ContextLock`]: opaque state and its guard
//! - [`Worker`], [`WorkerFn`], [`WorkerScope`]: long-running worker bodies
//! - [`ProtocolUnit`], [`UnitBundle`]: the capability bundle
//! - [`Registry`], [`Binding`]: name → unit dispatch

mod context;
mod kind;
mod registry;
mod unit;
mod worker;

pub use context::{ContextLock, ContextRef, ProtocolContext};
pub use kind::{Capability, ProtocolKind};
pub use registry::{Binding, Registry};
pub use unit::{ParseFn, ParseInput, ProtocolUnit, UnitBundle};
pub use worker::{BoxWorkerFuture, Worker, WorkerFn, WorkerRef, WorkerScope};

//! Adapter core: lifecycle state machine, owned instance, and worker handles.
//!
//! Internal modules:
//! - [`lifecycle`]: drives configure → connect → bind → start, and teardown;
//! - [`adapter`]: the owned instance and its reverse-order release;
//! - [`worker`]: worker admission, cancellation tokens, and join handles;
//! - [`builder`]: wires the event bus to subscribers;
//! - [`state`]: lifecycle states.

mod adapter;
mod builder;
mod lifecycle;
mod state;
mod worker;

pub use adapter::{Adapter, ReleaseReport};
pub use builder::LifecycleBuilder;
pub use lifecycle::Lifecycle;
pub use state::LifecycleState;

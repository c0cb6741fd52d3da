//! # Messaging backplane contract.
//!
//! The gateway opens exactly one [`BusConnection`] per process through a
//! [`BusConnector`], shares it between its workers, and releases it once at
//! teardown. Serialising concurrent use is the connection's job.
//!
//! [`LocalBackplane`] is an in-process implementation over
//! [`tokio::sync::broadcast`], used by the binary and the tests.

mod local;
mod message;

pub use local::{LocalBackplane, LocalSession};
pub use message::{Message, MessageKind};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::Secret;
use crate::error::ConnectionError;

/// Opens authenticated backplane sessions.
#[async_trait]
pub trait BusConnector: Send + Sync + 'static {
    /// Authenticates `identity` with `secret`.
    ///
    /// Fails with [`ConnectionError::Auth`] on rejected credentials and
    /// [`ConnectionError::Network`] when the backplane is unreachable.
    async fn connect(
        &self,
        identity: &str,
        secret: &Secret,
    ) -> Result<Arc<dyn BusConnection>, ConnectionError>;
}

/// One authenticated session.
pub trait BusConnection: Send + Sync + 'static {
    /// Identity the session was opened for.
    fn identity(&self) -> &str;

    /// Publishes a message to every subscriber of the backplane.
    fn publish(&self, message: Message) -> Result<(), ConnectionError>;

    /// Receives messages published after this call.
    fn subscribe(&self) -> Result<broadcast::Receiver<Message>, ConnectionError>;

    /// Closes the session. Calls after the first are no-ops.
    fn release(&self);

    /// False once [`release`](Self::release) ran.
    fn is_open(&self) -> bool;
}

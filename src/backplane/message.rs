use std::sync::Arc;
use std::time::SystemTime;

/// Direction of a backplane message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Reading published by a data worker.
    Data,
    /// Command addressed to an actuate worker.
    Command,
}

/// Backplane message.
///
/// The payload is opaque to the gateway core; protocol units define it.
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageKind,
    /// Publishing identity.
    pub from: Arc<str>,
    /// Addressed node (device/transducer id, or target identity for commands).
    pub node: Arc<str>,
    pub payload: Arc<str>,
    pub at: SystemTime,
}

impl Message {
    /// A reading from `from` about `node`.
    pub fn data(
        from: impl Into<Arc<str>>,
        node: impl Into<Arc<str>>,
        payload: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(MessageKind::Data, from, node, payload)
    }

    /// A command from `from` to the adapter `node`.
    pub fn command(
        from: impl Into<Arc<str>>,
        node: impl Into<Arc<str>>,
        payload: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(MessageKind::Command, from, node, payload)
    }

    fn new(
        kind: MessageKind,
        from: impl Into<Arc<str>>,
        node: impl Into<Arc<str>>,
        payload: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            kind,
            from: from.into(),
            node: node.into(),
            payload: payload.into(),
            at: SystemTime::now(),
        }
    }

    /// True for a command addressed to `identity`.
    pub fn is_command_for(&self, identity: &str) -> bool {
        self.kind == MessageKind::Command && &*self.node == identity
    }
}

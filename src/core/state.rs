use std::fmt;

/// States of the adapter lifecycle.
///
/// ```text
/// Uninitialized ─► Configured ─► Connected ─► Bound ─► Running ─► ShuttingDown ─► Terminated
///                       │             │                                ▲
///                       └─ connect ───┴─ unknown type ─────────────────┘ (fatal: full release)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Configured,
    Connected,
    Bound,
    Running,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Configured => "configured",
            LifecycleState::Connected => "connected",
            LifecycleState::Bound => "bound",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Terminated => "terminated",
        }
    }

    /// True once teardown finished; the adapter is not reused.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Terminated)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

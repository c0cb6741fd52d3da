//! Error types used by the adapter runtime and its workers.
//!
//! This module defines one error type per failure class of the gateway:
//!
//! - [`ConfigError`]: startup parameters are malformed or incomplete.
//! - [`ConnectionError`]: the backplane session could not be opened or was closed.
//! - [`UnknownTypeError`]: the configured protocol type is not in the registry.
//! - [`WorkerStartError`]: a data/actuate worker could not be admitted.
//! - [`WorkerError`]: raised by a running worker body.
//!
//! [`AdapterError`] wraps the first four and is what the lifecycle manager
//! returns. All types provide `as_label` for logs/metrics.

use thiserror::Error;

use crate::core::LifecycleState;
use crate::protocol::Capability;

/// # Errors produced while resolving startup parameters.
///
/// A `ConfigError` always means no configuration record was built.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No tokens were supplied at all.
    #[error("no arguments given")]
    NoArguments,

    /// Neither `-d` nor `-a` was given.
    #[error("at least one of data (-d) or actuate (-a) must be enabled")]
    NoCapability,

    /// Identity (`-j`) missing or empty.
    #[error("identity (-j) is required")]
    MissingIdentity,

    /// Secret missing or empty after the interactive prompt.
    #[error("secret (-p) is required")]
    MissingSecret,

    /// Protocol type (`-t`) missing or empty.
    #[error("protocol type (-t) is required")]
    MissingProtocolType,

    /// Config directory (`-c`) missing or empty.
    #[error("config directory (-c) is required")]
    MissingConfigDir,

    /// A token could not be parsed (unknown flag, missing value, bad port).
    #[error("invalid arguments: {reason}")]
    Invalid {
        /// Parser diagnostic.
        reason: String,
    },

    /// The interactive secret prompt failed.
    #[error("secret prompt failed: {reason}")]
    Prompt {
        /// Underlying I/O error message.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use devgate::ConfigError;
    ///
    /// assert_eq!(ConfigError::NoCapability.as_label(), "config_no_capability");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NoArguments => "config_no_arguments",
            ConfigError::NoCapability => "config_no_capability",
            ConfigError::MissingIdentity => "config_missing_identity",
            ConfigError::MissingSecret => "config_missing_secret",
            ConfigError::MissingProtocolType => "config_missing_protocol_type",
            ConfigError::MissingConfigDir => "config_missing_config_dir",
            ConfigError::Invalid { .. } => "config_invalid",
            ConfigError::Prompt { .. } => "config_prompt_failed",
        }
    }
}

/// # Errors produced by the backplane connection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The backplane rejected the identity/secret pair.
    #[error("authentication failed for '{identity}'")]
    Auth {
        /// Identity that was rejected.
        identity: String,
    },

    /// The backplane could not be reached.
    #[error("network failure: {reason}")]
    Network {
        /// Transport diagnostic.
        reason: String,
    },

    /// The session was already released.
    #[error("connection closed")]
    Closed,
}

impl ConnectionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectionError::Auth { .. } => "connection_auth",
            ConnectionError::Network { .. } => "connection_network",
            ConnectionError::Closed => "connection_closed",
        }
    }
}

/// The configured protocol type has no unit in the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown protocol type '{name}'")]
pub struct UnknownTypeError {
    /// The name that failed to resolve.
    pub name: String,
}

impl UnknownTypeError {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// # Errors produced when admitting a worker.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerStartError {
    /// No worker slot is available (`RuntimeConfig::max_workers` reached).
    #[error("{capability} worker not started: worker slots exhausted")]
    Exhausted {
        /// Which worker failed to start.
        capability: Capability,
    },

    /// Shutdown already began; new workers are refused.
    #[error("{capability} worker not started: adapter is shutting down")]
    ShuttingDown {
        /// Which worker failed to start.
        capability: Capability,
    },
}

impl WorkerStartError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerStartError::Exhausted { .. } => "worker_start_exhausted",
            WorkerStartError::ShuttingDown { .. } => "worker_start_shutting_down",
        }
    }

    /// The capability whose worker failed to start.
    pub fn capability(&self) -> Capability {
        match self {
            WorkerStartError::Exhausted { capability }
            | WorkerStartError::ShuttingDown { capability } => *capability,
        }
    }
}

/// # Errors produced by a running worker.
///
/// Workers run until cancelled; returning at all is reported as an event.
/// `Canceled` is the graceful exit after the token fired.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Non-recoverable error; the worker has given up.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The worker failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The worker observed its cancellation token.
    #[error("worker cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }
}

impl From<ConnectionError> for WorkerError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Closed => WorkerError::Canceled,
            other => WorkerError::Fail {
                error: other.to_string(),
            },
        }
    }
}

/// # Errors returned by the lifecycle manager.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Startup parameters were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backplane session could not be established.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The protocol type is not registered.
    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    /// One or both workers could not be started; siblings keep running.
    #[error("{} worker(s) failed to start: {}", .0.len(), join_errors(.0))]
    WorkerStart(Vec<WorkerStartError>),

    /// An operation was invoked out of order.
    #[error("operation requires state {expected}, adapter is {actual}")]
    InvalidState {
        /// State the operation needs.
        expected: LifecycleState,
        /// State the adapter is in.
        actual: LifecycleState,
    },
}

impl AdapterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdapterError::Config(e) => e.as_label(),
            AdapterError::Connection(e) => e.as_label(),
            AdapterError::UnknownType(_) => "unknown_type",
            AdapterError::WorkerStart(_) => "worker_start",
            AdapterError::InvalidState { .. } => "invalid_state",
        }
    }

    /// Whether the process must exit. Only worker start failures are tolerated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AdapterError::WorkerStart(_))
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() { 1 } else { 0 }
    }
}

fn join_errors(errors: &[WorkerStartError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

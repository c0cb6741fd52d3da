//! # Resolved configuration record.
//!
//! A [`Config`] is built only by [`Config::resolve`](crate::Config::resolve) and
//! has no setters: once it exists, every invariant holds.
//!
//! ## Invariants
//! - `wants_data || wants_actuate`
//! - identity, secret, protocol type and config directory are non-empty

use std::fmt;
use std::path::{Path, PathBuf};

use crate::protocol::Capability;

/// Credential material. `Debug` and `Display` never show the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value. Only the backplane connector should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Validated startup parameters of one adapter process.
#[derive(Clone, Debug)]
pub struct Config {
    pub(super) identity: String,
    pub(super) secret: Secret,
    pub(super) protocol: String,
    pub(super) config_dir: PathBuf,
    pub(super) log_file: Option<PathBuf>,
    pub(super) wants_data: bool,
    pub(super) wants_actuate: bool,
    pub(super) ipc_port: Option<u16>,
}

impl Config {
    /// Backplane identity (e.g. `gateway@example`).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Backplane secret.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Protocol type name, resolved later by the registry.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Directory handed to the protocol unit's `parse`.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Log destination; `None` means stderr.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn wants_data(&self) -> bool {
        self.wants_data
    }

    pub fn wants_actuate(&self) -> bool {
        self.wants_actuate
    }

    /// Whether the given capability was requested.
    pub fn wants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Data => self.wants_data,
            Capability::Actuate => self.wants_actuate,
        }
    }

    /// Local port of the auxiliary control channel.
    pub fn ipc_port(&self) -> Option<u16> {
        self.ipc_port
    }
}

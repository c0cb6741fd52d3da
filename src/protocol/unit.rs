//! # Protocol unit: the parse/data/actuate bundle.
//!
//! [`ProtocolUnit`] is the seam between the gateway core and one protocol
//! implementation. [`UnitBundle`] builds a unit out of a parse closure and
//! optional workers, which is how compiled-in units and test doubles are
//! assembled.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::context::ContextRef;
use super::kind::{Capability, ProtocolKind};
use super::worker::WorkerRef;

/// Read-only adapter fields handed to [`ProtocolUnit::parse`].
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    pub kind: ProtocolKind,
    pub config_dir: &'a Path,
    pub identity: &'a str,
}

/// # Capability bundle of one protocol.
///
/// `parse` is pure setup and must not start threads or tasks. Returning
/// `None` means "nothing to run": the adapter stays connected and idle.
pub trait ProtocolUnit: Send + Sync + 'static {
    /// Protocol type this unit implements.
    fn kind(&self) -> ProtocolKind;

    /// Builds the protocol context from the configuration directory.
    fn parse(&self, input: &ParseInput<'_>) -> Option<ContextRef>;

    /// Data worker, if the protocol offers one.
    fn data(&self) -> Option<WorkerRef> {
        None
    }

    /// Actuate worker, if the protocol offers one.
    fn actuate(&self) -> Option<WorkerRef> {
        None
    }

    /// Worker for the given capability.
    fn worker(&self, capability: Capability) -> Option<WorkerRef> {
        match capability {
            Capability::Data => self.data(),
            Capability::Actuate => self.actuate(),
        }
    }
}

/// Parse entry point of a [`UnitBundle`].
pub type ParseFn = Arc<dyn Fn(&ParseInput<'_>) -> Option<ContextRef> + Send + Sync>;

/// Closure-backed [`ProtocolUnit`].
///
/// ## Example
/// ```rust
/// use devgate::{ProtocolKind, ProtocolUnit, UnitBundle};
///
/// let unit = UnitBundle::new(ProtocolKind::Enfuse, |_input| None);
/// assert_eq!(unit.kind(), ProtocolKind::Enfuse);
/// assert!(unit.data().is_none());
/// ```
#[derive(Clone)]
pub struct UnitBundle {
    kind: ProtocolKind,
    parse: ParseFn,
    data: Option<WorkerRef>,
    actuate: Option<WorkerRef>,
}

impl UnitBundle {
    /// Creates a unit with only a parse entry point.
    pub fn new<P>(kind: ProtocolKind, parse: P) -> Self
    where
        P: Fn(&ParseInput<'_>) -> Option<ContextRef> + Send + Sync + 'static,
    {
        Self {
            kind,
            parse: Arc::new(parse),
            data: None,
            actuate: None,
        }
    }

    /// Adds a data worker.
    pub fn with_data(mut self, worker: WorkerRef) -> Self {
        self.data = Some(worker);
        self
    }

    /// Adds an actuate worker.
    pub fn with_actuate(mut self, worker: WorkerRef) -> Self {
        self.actuate = Some(worker);
        self
    }
}

impl fmt::Debug for UnitBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitBundle")
            .field("kind", &self.kind)
            .field("data", &self.data.as_ref().map(|w| w.name().to_string()))
            .field("actuate", &self.actuate.as_ref().map(|w| w.name().to_string()))
            .finish()
    }
}

impl ProtocolUnit for UnitBundle {
    fn kind(&self) -> ProtocolKind {
        self.kind
    }

    fn parse(&self, input: &ParseInput<'_>) -> Option<ContextRef> {
        (self.parse)(input)
    }

    fn data(&self) -> Option<WorkerRef> {
        self.data.clone()
    }

    fn actuate(&self) -> Option<WorkerRef> {
        self.actuate.clone()
    }
}

//! # Adapter registry: protocol type name → protocol unit.
//!
//! The registry is filled once at startup (from the compiled-in units, or by
//! the embedding program) and then only read. Dispatch is a single lookup:
//!
//! ```text
//! "modbus" ──► ProtocolKind::Modbus ──► units[Modbus] ──► Binding { parse, data?, actuate? }
//!    │                 │                      │
//!    └─ not a kind ────┴─ not registered ─────┴──► UnknownTypeError
//! ```
//!
//! ## Rules
//! - A capability is bound only if it was requested **and** the unit offers it.
//! - Requesting a capability the unit lacks is not an error; the slot stays empty.
//! - Registering a second unit for the same kind replaces the first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::context::ContextRef;
use super::kind::{Capability, ProtocolKind};
use super::unit::{ParseInput, ProtocolUnit};
use super::worker::WorkerRef;
use crate::error::UnknownTypeError;

/// Resolved dispatch triple for one run.
#[derive(Clone)]
pub struct Binding {
    unit: Arc<dyn ProtocolUnit>,
    data: Option<WorkerRef>,
    actuate: Option<WorkerRef>,
}

impl Binding {
    pub fn kind(&self) -> ProtocolKind {
        self.unit.kind()
    }

    /// Invokes the unit's parse entry point.
    pub fn parse(&self, input: &ParseInput<'_>) -> Option<ContextRef> {
        self.unit.parse(input)
    }

    /// Bound worker for the capability, if any.
    pub fn worker(&self, capability: Capability) -> Option<&WorkerRef> {
        match capability {
            Capability::Data => self.data.as_ref(),
            Capability::Actuate => self.actuate.as_ref(),
        }
    }

    /// Number of bound workers.
    pub fn worker_count(&self) -> usize {
        usize::from(self.data.is_some()) + usize::from(self.actuate.is_some())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind())
            .field("data", &self.data.as_ref().map(|w| w.name().to_string()))
            .field("actuate", &self.actuate.as_ref().map(|w| w.name().to_string()))
            .finish()
    }
}

/// Read-mostly map of protocol units.
#[derive(Clone, Default)]
pub struct Registry {
    units: HashMap<ProtocolKind, Arc<dyn ProtocolUnit>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit (builder style).
    pub fn with_unit(mut self, unit: impl ProtocolUnit) -> Self {
        self.register(Arc::new(unit));
        self
    }

    /// Adds a unit, returning the one it replaced.
    pub fn register(&mut self, unit: Arc<dyn ProtocolUnit>) -> Option<Arc<dyn ProtocolUnit>> {
        self.units.insert(unit.kind(), unit)
    }

    /// Returns sorted list of registered kinds.
    pub fn kinds(&self) -> Vec<ProtocolKind> {
        let mut kinds: Vec<ProtocolKind> = self.units.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// True if a unit is registered for `kind`.
    pub fn contains(&self, kind: ProtocolKind) -> bool {
        self.units.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Looks up the unit for a type name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ProtocolUnit>, UnknownTypeError> {
        let kind: ProtocolKind = name.parse()?;
        self.units
            .get(&kind)
            .cloned()
            .ok_or_else(|| UnknownTypeError::new(name))
    }

    /// Resolves `name` and binds the requested capabilities the unit offers.
    pub fn bind(
        &self,
        name: &str,
        wants_data: bool,
        wants_actuate: bool,
    ) -> Result<Binding, UnknownTypeError> {
        let unit = self.resolve(name)?;
        let data = if wants_data { unit.data() } else { None };
        let actuate = if wants_actuate { unit.actuate() } else { None };
        Ok(Binding {
            unit,
            data,
            actuate,
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::protocol::{UnitBundle, WorkerFn, WorkerScope};
    use tokio_util::sync::CancellationToken;

    fn idle(name: &'static str) -> WorkerRef {
        WorkerFn::arc(name, |_scope: WorkerScope, token: CancellationToken| async move {
            token.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        })
    }

    fn registry() -> Registry {
        Registry::new()
            .with_unit(
                UnitBundle::new(ProtocolKind::Modbus, |_| None)
                    .with_data(idle("modbus.data"))
                    .with_actuate(idle("modbus.actuate")),
            )
            .with_unit(UnitBundle::new(ProtocolKind::Enfuse, |_| None).with_data(idle("enfuse.data")))
    }

    #[test]
    fn binds_only_requested_capabilities() {
        let binding = registry().bind("modbus", true, false).unwrap();
        assert_eq!(binding.kind(), ProtocolKind::Modbus);
        assert_eq!(binding.worker(Capability::Data).unwrap().name(), "modbus.data");
        assert!(binding.worker(Capability::Actuate).is_none());
        assert_eq!(binding.worker_count(), 1);
    }

    #[test]
    fn unsupported_capability_is_silently_unbound() {
        let binding = registry().bind("enfuse", true, true).unwrap();
        assert!(binding.worker(Capability::Data).is_some());
        assert!(binding.worker(Capability::Actuate).is_none());
    }

    #[test]
    fn unknown_or_unregistered_type_fails() {
        let reg = registry();
        assert_eq!(reg.bind("zigbee", true, false).unwrap_err().name, "zigbee");
        // a real kind that was not compiled in
        assert_eq!(reg.bind("hue", true, false).unwrap_err().name, "hue");
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut reg = registry();
        let old = reg.register(Arc::new(UnitBundle::new(ProtocolKind::Modbus, |_| None)));
        assert!(old.is_some());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.kinds(), vec![ProtocolKind::Enfuse, ProtocolKind::Modbus]);
        assert_eq!(reg.bind("modbus", true, true).unwrap().worker_count(), 0);
    }
}

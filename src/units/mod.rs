//! Built-in protocol units.
//!
//! Each protocol type is compiled in behind a cargo feature of the same
//! name. The default build carries every type except `bacnet`; the `all`
//! feature adds it.

mod sim;

pub use sim::{DEFAULT_POLL, SimContext, SimulatedUnit};

use crate::protocol::Registry;
#[cfg(any(
    feature = "enfuse",
    feature = "hue",
    feature = "bacnet",
    feature = "modbus",
    feature = "pup",
    feature = "b3"
))]
use crate::protocol::ProtocolKind;

/// Registry of every protocol type compiled into this build.
pub fn builtin() -> Registry {
    #[allow(unused_mut)]
    let mut registry = Registry::new();
    #[cfg(feature = "enfuse")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::Enfuse)));
    #[cfg(feature = "hue")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::Hue)));
    #[cfg(feature = "bacnet")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::Bacnet)));
    #[cfg(feature = "modbus")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::Modbus)));
    #[cfg(feature = "pup")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::Pup)));
    #[cfg(feature = "b3")]
    registry.register(std::sync::Arc::new(SimulatedUnit::new(ProtocolKind::B3)));
    registry
}

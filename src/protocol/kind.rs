use std::fmt;
use std::str::FromStr;

use crate::error::UnknownTypeError;

/// Closed set of protocol types the registry can dispatch to.
///
/// Names are matched exactly (case-sensitive) against the `-t` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolKind {
    /// Filesystem/HTTP "fuse" bridge (data only).
    Enfuse,
    /// Lighting bridge HTTP API.
    Hue,
    /// BACnet building automation.
    Bacnet,
    /// Modbus field bus.
    Modbus,
    /// Plug-load controller.
    Pup,
    /// GPIO bank.
    B3,
}

impl ProtocolKind {
    /// Every kind, in declaration order.
    pub const ALL: [ProtocolKind; 6] = [
        ProtocolKind::Enfuse,
        ProtocolKind::Hue,
        ProtocolKind::Bacnet,
        ProtocolKind::Modbus,
        ProtocolKind::Pup,
        ProtocolKind::B3,
    ];

    /// The type name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Enfuse => "enfuse",
            ProtocolKind::Hue => "hue",
            ProtocolKind::Bacnet => "bacnet",
            ProtocolKind::Modbus => "modbus",
            ProtocolKind::Pup => "pup",
            ProtocolKind::B3 => "b3",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTypeError::new(s))
    }
}

/// Worker role of a protocol unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Pulls readings from the device toward the backplane.
    Data,
    /// Applies commands received from the backplane.
    Actuate,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Data => "data",
            Capability::Actuate => "actuate",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

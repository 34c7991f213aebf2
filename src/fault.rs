//! Fault records emitted when a unit disables itself.

use std::fmt;

use crate::placement::BlockId;
use crate::unit::LogicFault;

/// Why a unit faulted.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultReason {
    /// One of the unit's cells stored NaN or an infinity.
    NonFinite { port: String },
    /// The leaf behaviour reported a domain error.
    Logic(LogicFault),
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { port } => write!(f, "non-finite value on port '{port}'"),
            Self::Logic(fault) => write!(f, "{fault}"),
        }
    }
}

/// Externally observable effect of a unit fault. Presentation and physics
/// collaborators use it to make the block visibly non-functional.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultEffect {
    pub block: BlockId,
    pub catalog_id: String,
    pub reason: FaultReason,
    /// Machine tick during which the fault was detected; zero for faults
    /// raised while wiring.
    pub tick: u64,
}

impl fmt::Display for FaultEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} ({}) faulted at tick {}: {}",
            self.block, self.catalog_id, self.tick, self.reason
        )
    }
}

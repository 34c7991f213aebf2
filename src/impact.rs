//! Seam to the collision and impact-breaking subsystem.
//!
//! The machine hands the collaborator the placed blocks once assembly has
//! succeeded and detaches it on teardown. What happens in between is owned
//! by the collaborator.

use crate::placement::PlacedBlock;

pub trait ImpactSubsystem {
    /// Start monitoring the structure built from `blocks`.
    fn attach(&mut self, blocks: &[PlacedBlock]);

    /// Stop monitoring. Called at most once per machine.
    fn detach(&mut self);
}

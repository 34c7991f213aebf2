//! Machine-scoped force field shared by every magnet of one structure.

use glam::Vec3;

use crate::cell::{CellGraph, CellId};
use crate::constants::{FIELD_CUTOFF, FIELD_DISTANCE_EPSILON};
use crate::numeric::expect_f32;
use crate::unit::UnitId;
use crate::value::Value;
use crate::vector_math::inverse_square;

#[derive(Debug, Clone, Copy)]
struct Member {
    unit: UnitId,
    position: Vec3,
    strength: CellId,
    force: CellId,
}

#[derive(Debug, Default)]
pub(crate) struct ForceField {
    members: Vec<Member>,
}

impl ForceField {
    pub fn join(&mut self, unit: UnitId, position: Vec3, strength: CellId, force: CellId) {
        self.members.push(Member {
            unit,
            position,
            strength,
            force,
        });
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Write the summed pairwise force into every live member's force cell.
    /// Like strengths repel, opposite strengths attract.
    pub fn apply(&self, graph: &mut CellGraph) {
        let live: Vec<(Member, f32)> = self
            .members
            .iter()
            .filter(|m| graph.is_live(m.force))
            .filter_map(|m| {
                let strength = graph.get(m.strength)?.as_number()?;
                strength.is_finite().then(|| (*m, expect_f32(strength)))
            })
            .collect();
        for (member, strength) in &live {
            let total = live
                .iter()
                .filter(|(other, _)| other.unit != member.unit)
                .map(|(other, other_strength)| {
                    inverse_square(
                        member.position,
                        other.position,
                        -(strength * other_strength),
                        FIELD_DISTANCE_EPSILON,
                        FIELD_CUTOFF,
                    )
                })
                .fold(Vec3::ZERO, |acc, force| acc + force);
            graph.enqueue(member.force, Value::Vector(total));
        }
        graph.flush();
    }
}

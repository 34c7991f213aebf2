//! Pilot seat body state and its velocity limits.

use glam::Vec3;

use crate::config::EngineConfig;
use crate::unit::UnitId;
use crate::vector_math::clamp_length;

/// Velocities of the rigid body the pilot seat drives. The host physics
/// layer reads and writes these between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyState {
    pub linear: Vec3,
    pub angular: Vec3,
}

#[derive(Debug)]
pub(crate) struct PilotSeat {
    pub unit: UnitId,
    pub body: BodyState,
    max_linear: f32,
    max_angular: f32,
}

impl PilotSeat {
    pub fn new(unit: UnitId, config: &EngineConfig) -> Self {
        Self {
            unit,
            body: BodyState::default(),
            max_linear: config.max_linear_velocity,
            max_angular: config.max_angular_velocity,
        }
    }

    pub fn clamp(&mut self) {
        self.body.linear = clamp_length(self.body.linear, self.max_linear);
        self.body.angular = clamp_length(self.body.angular, self.max_angular);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    fn clamp_limits_both_velocities() {
        let mut seat = PilotSeat::new(UnitId(0), &EngineConfig::default());
        seat.body.linear = Vec3::new(1000.0, 0.0, 0.0);
        seat.body.angular = Vec3::new(0.0, 0.0, -500.0);
        seat.clamp();
        assert_relative_eq!(seat.body.linear.length(), EngineConfig::default().max_linear_velocity);
        assert_relative_eq!(seat.body.angular.length(), EngineConfig::default().max_angular_velocity);
    }
}

//! Leaves that act on the world: motors, thrusters and magnets.

use glam::Vec3;

use crate::constants::{DEFAULT_MAX_THRUST, DEFAULT_RAMP};
use crate::numeric::expect_f32;
use crate::registry::ValueKind;
use crate::unit::{BlockLogic, BuildError, LogicFault, Reactive, TickCtx, UnitBuilder};
use crate::value::Value;

/// Reason a configured ramp rate is unusable, if it is.
fn ramp_problem(ramp: f64) -> Option<String> {
    let usable = ramp.is_finite() && ramp > 0.0 && ramp <= 1.0;
    (!usable).then(|| format!("ramp must lie in (0, 1], got {ramp}"))
}

struct Motor {
    invalid: Option<String>,
}

impl BlockLogic for Motor {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if let Some(reason) = &self.invalid {
            return Err(LogicFault::InvalidConfig(reason.clone()));
        }
        let throttle = ctx.input_number("throttle").unwrap_or(0.0);
        ctx.set("speed", throttle)
    }
}

/// `speed` eases towards `throttle` at the configured ramp rate. A ramp
/// outside `(0, 1]` assembles with the default rate and faults on the first
/// tick.
pub(super) fn motor(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let ramp = b.number_or("ramp", DEFAULT_RAMP)?;
    let invalid = ramp_problem(ramp);
    let ramp = if invalid.is_some() { DEFAULT_RAMP } else { ramp };
    b.input("throttle", &ValueKind::Number { default: 0.0 })?;
    b.output("speed", &ValueKind::Motor { ramp })?;
    Ok(Box::new(Motor { invalid }))
}

struct Thruster {
    max: f64,
    direction: Vec3,
    invalid: Option<String>,
}

impl BlockLogic for Thruster {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if let Some(reason) = &self.invalid {
            return Err(LogicFault::InvalidConfig(reason.clone()));
        }
        let throttle = ctx.input_number("throttle").unwrap_or(0.0);
        ctx.set("thrust", throttle.clamp(0.0, 1.0) * self.max)?;
        let thrust = ctx
            .output("thrust")
            .and_then(Value::as_number)
            .filter(|t| t.is_finite())
            .unwrap_or(0.0);
        ctx.set("force", self.direction * expect_f32(thrust))
    }
}

/// Thrust ramps towards `throttle * max`; `force` is the current thrust
/// along the block's configured direction. A non-positive `max` or a ramp
/// outside `(0, 1]` faults on the first tick.
pub(super) fn thruster(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let max = b.number_or("max", DEFAULT_MAX_THRUST)?;
    let ramp = b.number_or("ramp", DEFAULT_RAMP)?;
    let direction = match b.config().get("direction") {
        None => Vec3::Z,
        Some(raw) => serde_json::from_value::<[f32; 3]>(raw.clone())
            .ok()
            .map(Vec3::from_array)
            .and_then(Vec3::try_normalize)
            .ok_or_else(|| BuildError::Config {
                key: "direction".to_owned(),
                reason: "must be a non-zero [x, y, z] array".to_owned(),
            })?,
    };
    let invalid = if max.is_finite() && max > 0.0 {
        ramp_problem(ramp)
    } else {
        Some(format!("thrust limit must be positive, got {max}"))
    };
    let (max, ramp) = if invalid.is_some() {
        (DEFAULT_MAX_THRUST, DEFAULT_RAMP)
    } else {
        (max, ramp)
    };
    b.input("throttle", &ValueKind::Number { default: 0.0 })?;
    b.output("thrust", &ValueKind::Thrust { max, ramp })?;
    b.output("force", &ValueKind::Vector)?;
    Ok(Box::new(Thruster {
        max,
        direction,
        invalid,
    }))
}

/// Force-field participant. The machine writes the summed field force into
/// `force` each frame.
pub(super) fn magnet(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let default = b.number_or("strength", 1.0)?;
    let strength = b.input("strength", &ValueKind::Number { default })?;
    let force = b.output("force", &ValueKind::Vector)?;
    b.join_force_field(strength, force);
    Ok(Box::new(Reactive))
}

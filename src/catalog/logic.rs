//! Combinational leaves: constants, boolean gates and the clamp.

use crate::registry::ValueKind;
use crate::unit::{BlockLogic, BuildError, LogicFault, Reactive, TickCtx, UnitBuilder};
use crate::value::Value;

pub(super) fn constant(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let value = b.number_or("value", 0.0)?;
    b.output("value", &ValueKind::Number { default: value })?;
    Ok(Box::new(Reactive))
}

/// Inverter driven by a subscription on its input.
pub(super) fn not(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let input = b.input("in", &ValueKind::Bool)?;
    let output = b.output("out", &ValueKind::Bool)?;
    b.subscribe(
        input,
        true,
        Box::new(move |new, _, writer| {
            writer.set(output, !new.as_bool().unwrap_or(false));
        }),
    );
    Ok(Box::new(Reactive))
}

struct Gate {
    combine: fn(bool, bool) -> bool,
}

impl BlockLogic for Gate {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        let out = (self.combine)(ctx.input_bool("a"), ctx.input_bool("b"));
        ctx.set("out", out)
    }
}

fn gate(b: &mut UnitBuilder<'_>, combine: fn(bool, bool) -> bool) -> Result<Box<dyn BlockLogic>, BuildError> {
    b.input("a", &ValueKind::Bool)?;
    b.input("b", &ValueKind::Bool)?;
    b.output("out", &ValueKind::Bool)?;
    Ok(Box::new(Gate { combine }))
}

pub(super) fn and(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    gate(b, |x, y| x && y)
}

pub(super) fn or(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    gate(b, |x, y| x || y)
}

struct Clamp {
    min: f64,
    max: f64,
}

impl BlockLogic for Clamp {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if self.min > self.max {
            return Err(LogicFault::InvalidConfig(format!(
                "clamp min {} exceeds max {}",
                self.min, self.max
            )));
        }
        let Some(value) = ctx.input("in").and_then(Value::as_number) else {
            return Ok(());
        };
        ctx.set("out", value.clamp(self.min, self.max))
    }
}

/// Bounds are only checked once ticking starts, so a misconfigured clamp
/// still assembles and then faults on its first tick.
pub(super) fn clamp(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let min = b.number_or("min", 0.0)?;
    let max = b.number_or("max", 1.0)?;
    b.input("in", &ValueKind::Number { default: 0.0 })?;
    b.output("out", &ValueKind::Number { default: 0.0 })?;
    Ok(Box::new(Clamp { min, max }))
}

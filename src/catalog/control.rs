//! Operator-facing leaves: key inputs, the seat and simple displays.

use crate::registry::ValueKind;
use crate::unit::{BlockLogic, BuildError, LogicFault, Reactive, TickCtx, UnitBuilder};
use crate::value::{Color, KeyCode, Value};

/// Boolean output that follows a bound key while the machine is piloted.
/// The unit drives the cell from host key state before each tick.
pub(super) fn key_button(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let key = b.count_or("key", 0)?;
    b.output("pressed", &ValueKind::BoolKey { key })?;
    Ok(Box::new(Reactive))
}

struct Keypad {
    keys: Vec<KeyCode>,
}

impl BlockLogic for Keypad {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        let held: Vec<KeyCode> = if ctx.controls_enabled() {
            self.keys
                .iter()
                .copied()
                .filter(|key| ctx.is_pressed(*key))
                .collect()
        } else {
            Vec::new()
        };
        ctx.set("keys", Value::Keys(held))
    }
}

/// Publishes which of its configured keys are held.
pub(super) fn keypad(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let invalid = || BuildError::Config {
        key: "keys".to_owned(),
        reason: "must be an array of key codes".to_owned(),
    };
    let keys = match b.config().get("keys") {
        None => Vec::new(),
        Some(raw) => raw
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|code| {
                code.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .map(KeyCode)
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    b.output("keys", &ValueKind::MultiKey)?;
    Ok(Box::new(Keypad { keys }))
}

/// Occupancy source. The host writes `occupied` through the machine.
pub(super) fn seat(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let occupied = b.output("occupied", &ValueKind::Bool)?;
    b.declare_seat(occupied);
    Ok(Box::new(Reactive))
}

struct Lamp {
    tint: Color,
}

impl BlockLogic for Lamp {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        let emitted = if ctx.input_bool("on") {
            match ctx.input("color") {
                Some(Value::Color(color)) => *color,
                _ => self.tint,
            }
        } else {
            Color::rgb(0.0, 0.0, 0.0)
        };
        ctx.set("emitted", emitted)
    }
}

/// Light that emits its `color` input while `on` is high. The placement
/// colour is used until a colour is wired in.
pub(super) fn lamp(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let tint = b.block().color.unwrap_or(Color::WHITE);
    b.input("on", &ValueKind::Bool)?;
    b.input("color", &ValueKind::Color)?;
    b.output("emitted", &ValueKind::Color)?;
    Ok(Box::new(Lamp { tint }))
}

/// Mirrors `input` to `output` through a subscription that fires at once.
fn mirror(b: &mut UnitBuilder<'_>, input: &str, output: &str, kind: &ValueKind) -> Result<(), BuildError> {
    let source = b.input(input, kind)?;
    let target = b.output(output, kind)?;
    b.subscribe(
        source,
        true,
        Box::new(move |new, _, writer| writer.set(target, new.clone())),
    );
    Ok(())
}

/// Text display; `shown` mirrors the wired `text`.
pub(super) fn label(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    mirror(b, "text", "shown", &ValueKind::Text)?;
    Ok(Box::new(Reactive))
}

/// Passes any value through unchanged, for inspection by the host.
pub(super) fn probe(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    mirror(b, "in", "out", &ValueKind::Derived)?;
    Ok(Box::new(Reactive))
}

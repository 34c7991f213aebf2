//! Stateful leaves: delays, latches, counters, timers and registers.

use std::collections::VecDeque;

use crate::constants::{DEFAULT_DELAY_TICKS, MAX_BYTE_ARRAY_LEN};
use crate::registry::ValueKind;
use crate::unit::{BlockLogic, BuildError, LogicFault, TickCtx, UnitBuilder};
use crate::value::Value;

struct Delay {
    ticks: usize,
    history: VecDeque<Value>,
}

impl BlockLogic for Delay {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        let Some(current) = ctx.input("in").cloned() else {
            return Ok(());
        };
        self.history.push_back(current);
        if self.history.len() > self.ticks {
            if let Some(due) = self.history.pop_front() {
                ctx.set("out", due)?;
            }
        }
        Ok(())
    }
}

/// Emits its input `ticks` frames later. Input and output take whatever
/// type is wired in.
pub(super) fn delay(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let ticks = b.count_or("ticks", DEFAULT_DELAY_TICKS)?;
    b.input("in", &ValueKind::Derived)?;
    b.output("out", &ValueKind::Derived)?;
    let ticks = usize::try_from(ticks).map_err(|_| BuildError::Config {
        key: "ticks".to_owned(),
        reason: "is too large".to_owned(),
    })?;
    Ok(Box::new(Delay {
        ticks,
        history: VecDeque::with_capacity(ticks + 1),
    }))
}

struct Latch;

impl BlockLogic for Latch {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if ctx.input_bool("reset") {
            ctx.set("out", false)
        } else if ctx.input_bool("set") {
            ctx.set("out", true)
        } else {
            Ok(())
        }
    }
}

/// Set/reset memory; reset wins when both are high.
pub(super) fn latch(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    b.input("set", &ValueKind::Bool)?;
    b.input("reset", &ValueKind::Bool)?;
    b.output("out", &ValueKind::Bool)?;
    Ok(Box::new(Latch))
}

#[derive(Default)]
struct Counter {
    last: bool,
    count: u8,
}

impl BlockLogic for Counter {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        let level = ctx.input_bool("in");
        if ctx.input_bool("reset") {
            self.count = 0;
        } else if level && !self.last {
            self.count = self.count.wrapping_add(1);
        }
        self.last = level;
        ctx.set("count", self.count)
    }
}

/// Counts rising edges into a wrapping byte.
pub(super) fn counter(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    b.input("in", &ValueKind::Bool)?;
    b.input("reset", &ValueKind::Bool)?;
    b.output("count", &ValueKind::Byte)?;
    Ok(Box::<Counter>::default())
}

struct Timer {
    zero_hold: bool,
}

impl BlockLogic for Timer {
    fn tick(&mut self, _ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if self.zero_hold {
            return Err(LogicFault::InvalidConfig(
                "timer must hold for at least one tick".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Holds `out` high for `ticks` frames after each rising edge on `trigger`.
/// A zero `ticks` assembles with a one-tick hold and faults on the first
/// tick.
pub(super) fn timer(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let hold = b.count_or("ticks", 1)?;
    let trigger = b.input("trigger", &ValueKind::Bool)?;
    let out = b.output("out", &ValueKind::Pulse { hold: hold.max(1) })?;
    b.subscribe(
        trigger,
        false,
        Box::new(move |new, old, writer| {
            if new.as_bool() == Some(true) && old.as_bool() != Some(true) {
                writer.set(out, true);
            }
        }),
    );
    Ok(Box::new(Timer { zero_hold: hold == 0 }))
}

struct Register {
    oversized: Option<u32>,
}

impl BlockLogic for Register {
    fn tick(&mut self, ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        if let Some(len) = self.oversized {
            return Err(LogicFault::InvalidConfig(format!(
                "register length {len} exceeds the {MAX_BYTE_ARRAY_LEN}-byte limit"
            )));
        }
        if !ctx.input_bool("store") {
            return Ok(());
        }
        match ctx.input("write").cloned() {
            Some(data) => ctx.set("data", data),
            None => Ok(()),
        }
    }
}

/// Byte-array memory that copies `write` to `data` while `store` is high.
///
/// An oversized `len` assembles with empty buffers and faults on the first
/// tick.
pub(super) fn register(b: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
    let requested = b.count_or("len", 8)?;
    let len = usize::try_from(requested)
        .ok()
        .filter(|len| *len <= MAX_BYTE_ARRAY_LEN);
    let oversized = len.is_none().then_some(requested);
    let len = len.unwrap_or(0);
    b.input("write", &ValueKind::ByteArray { len })?;
    b.input("store", &ValueKind::Bool)?;
    b.output("data", &ValueKind::ByteArray { len })?;
    Ok(Box::new(Register { oversized }))
}

//! Per-kind admission and timing rules for cells.

use crate::numeric::{approach, quantize};
use crate::value::{KeyCode, Value, ValueType};

/// Outcome of offering a value to a cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Admit {
    /// Store this value (it may differ from the offered one after clamping).
    Store(Value),
    /// Internal state absorbed the write; the visible value is unchanged.
    Hold,
    /// The value has the wrong type for this cell.
    Reject(Value),
}

/// Runtime behaviour of a cell, produced by the value type registry.
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    /// Stores any value of the given type unchanged. `ValueType::Any` is the
    /// derived kind.
    Plain(ValueType),
    /// Number clamped to `[min, max]` and snapped to `step`.
    Bounded { min: f64, max: f64, step: f64 },
    /// Byte buffer padded or truncated to `len`.
    ByteArray { len: usize },
    /// Number that eases towards the last written target each tick.
    Ramp {
        min: f64,
        max: f64,
        rate: f64,
        target: f64,
    },
    /// Boolean that falls back to `false` `hold` ticks after going high.
    Pulse { hold: u32, remaining: u32 },
    /// Boolean driven by the state of a bound key.
    BoolKey { key: KeyCode },
}

impl CellKind {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Plain(value_type) => *value_type,
            Self::Bounded { .. } | Self::Ramp { .. } => ValueType::Number,
            Self::ByteArray { .. } => ValueType::Bytes,
            Self::Pulse { .. } | Self::BoolKey { .. } => ValueType::Bool,
        }
    }

    /// Key bound to a boolean-key cell.
    #[must_use]
    pub const fn bound_key(&self) -> Option<KeyCode> {
        match self {
            Self::BoolKey { key } => Some(*key),
            _ => None,
        }
    }

    pub(crate) fn admit(&mut self, incoming: Value) -> Admit {
        if !incoming.value_type().feeds(self.value_type()) {
            return Admit::Reject(incoming);
        }
        // Non-finite numbers bypass clamping so the fault watcher sees them.
        if !incoming.is_finite() {
            return Admit::Store(incoming);
        }
        match (self, incoming) {
            (Self::Bounded { min, max, step }, Value::Number(n)) => {
                Admit::Store(Value::Number(quantize(n, *min, *max, *step)))
            }
            (Self::ByteArray { len }, Value::Bytes(mut bytes)) => {
                bytes.resize(*len, 0);
                Admit::Store(Value::Bytes(bytes))
            }
            (Self::Ramp { min, max, target, .. }, Value::Number(n)) => {
                *target = n.clamp(*min, *max);
                Admit::Hold
            }
            (Self::Pulse { hold, remaining }, Value::Bool(high)) => {
                if high {
                    *remaining = *hold;
                    Admit::Store(Value::Bool(true))
                } else if *remaining > 0 {
                    Admit::Hold
                } else {
                    Admit::Store(Value::Bool(false))
                }
            }
            (_, value) => Admit::Store(value),
        }
    }

    /// Advance timing state by `ticks`, returning the new visible value when
    /// it changes.
    pub(crate) fn advance(&mut self, current: &Value, ticks: u32) -> Option<Value> {
        match self {
            Self::Ramp { rate, target, .. } => {
                let now = current.as_number()?;
                let next = approach(now, *target, *rate, ticks);
                #[expect(clippy::float_cmp, reason = "Exact equality means the ramp settled.")]
                let settled = next == now;
                (!settled).then_some(Value::Number(next))
            }
            Self::Pulse { remaining, .. } if *remaining > 0 => {
                *remaining = remaining.saturating_sub(ticks);
                (*remaining == 0).then_some(Value::Bool(false))
            }
            _ => None,
        }
    }
}

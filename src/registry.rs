//! Value type registry: turns a declared port schema into a cell.
//!
//! Block factories describe each port with a [`ValueKind`]. The registry
//! validates the kind's parameters and produces the [`CellKind`] plus the
//! initial value for the new cell. Kinds deserialize from tagged objects such
//! as `{"kind": "bounded", "min": 0, "max": 10, "step": 1}` so schemas can
//! also come from data files.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::CellKind;
use crate::constants::{DEFAULT_MAX_THRUST, DEFAULT_RAMP, MAX_BYTE_ARRAY_LEN};
use crate::numeric::quantize;
use crate::value::{Color, KeyCode, Value, ValueType};

/// Declared kind of a port, with kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Number {
        #[serde(default)]
        default: f64,
    },
    Bounded {
        min: f64,
        max: f64,
        #[serde(default)]
        step: f64,
        #[serde(default)]
        default: Option<f64>,
    },
    Byte,
    Vector,
    Key {
        #[serde(default)]
        default: u32,
    },
    MultiKey,
    BoolKey {
        key: u32,
    },
    Text,
    Color,
    /// Takes the type of whatever feeds it.
    Derived,
    ByteArray {
        len: usize,
    },
    /// Throttle in `[-1, 1]` easing towards its target.
    Motor {
        #[serde(default = "default_ramp")]
        ramp: f64,
    },
    /// Thrust in `[0, max]` easing towards its target.
    Thrust {
        #[serde(default = "default_max_thrust")]
        max: f64,
        #[serde(default = "default_ramp")]
        ramp: f64,
    },
    /// Boolean that stays high for `hold` ticks after a rising write.
    Pulse {
        hold: u32,
    },
}

const fn default_ramp() -> f64 {
    DEFAULT_RAMP
}

const fn default_max_thrust() -> f64 {
    DEFAULT_MAX_THRUST
}

/// A named port and its declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSchema {
    pub name: String,
    #[serde(flatten)]
    pub kind: ValueKind,
}

impl PortSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Invalid parameters in a port schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("bounds must be finite with min <= max, got [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },
    #[error("step must be finite and non-negative, got {0}")]
    InvalidStep(f64),
    #[error("ramp must lie in (0, 1], got {0}")]
    InvalidRamp(f64),
    #[error("thrust limit must be positive, got {0}")]
    InvalidThrust(f64),
    #[error("byte array of {len} bytes exceeds the {max}-byte limit")]
    ByteArrayTooLong { len: usize, max: usize },
    #[error("pulse hold must be at least one tick")]
    ZeroHold,
    #[error("default {0} is not finite")]
    NonFiniteDefault(f64),
}

impl ValueKind {
    /// Wire type of cells built from this kind.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool | Self::BoolKey { .. } | Self::Pulse { .. } => ValueType::Bool,
            Self::Number { .. } | Self::Bounded { .. } | Self::Motor { .. } | Self::Thrust { .. } => {
                ValueType::Number
            }
            Self::Byte => ValueType::Byte,
            Self::Vector => ValueType::Vector,
            Self::Key { .. } => ValueType::Key,
            Self::MultiKey => ValueType::Keys,
            Self::Text => ValueType::Text,
            Self::Color => ValueType::Color,
            Self::Derived => ValueType::Any,
            Self::ByteArray { .. } => ValueType::Bytes,
        }
    }

    /// Validate the parameters and build the cell behaviour and initial value.
    ///
    /// # Errors
    /// Returns a [`SchemaError`] describing the first invalid parameter.
    ///
    /// # Examples
    /// ```
    /// use cogwork::registry::ValueKind;
    /// use cogwork::value::Value;
    /// let kind = ValueKind::Bounded { min: 0.0, max: 1.0, step: 0.5, default: Some(0.7) };
    /// let (_, initial) = kind.instantiate().expect("valid schema");
    /// assert_eq!(initial, Value::Number(0.5));
    /// assert!(ValueKind::Bounded { min: 1.0, max: 0.0, step: 0.0, default: None }
    ///     .instantiate()
    ///     .is_err());
    /// ```
    pub fn instantiate(&self) -> Result<(CellKind, Value), SchemaError> {
        let built = match self {
            Self::Bool => (CellKind::Plain(ValueType::Bool), Value::Bool(false)),
            Self::Number { default } => {
                ensure_finite(*default)?;
                (CellKind::Plain(ValueType::Number), Value::Number(*default))
            }
            Self::Bounded {
                min,
                max,
                step,
                default,
            } => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(SchemaError::InvalidBounds {
                        min: *min,
                        max: *max,
                    });
                }
                if !step.is_finite() || *step < 0.0 {
                    return Err(SchemaError::InvalidStep(*step));
                }
                let start = default.unwrap_or(*min);
                ensure_finite(start)?;
                (
                    CellKind::Bounded {
                        min: *min,
                        max: *max,
                        step: *step,
                    },
                    Value::Number(quantize(start, *min, *max, *step)),
                )
            }
            Self::Byte => (CellKind::Plain(ValueType::Byte), Value::Byte(0)),
            Self::Vector => (
                CellKind::Plain(ValueType::Vector),
                Value::Vector(glam::Vec3::ZERO),
            ),
            Self::Key { default } => (
                CellKind::Plain(ValueType::Key),
                Value::Key(KeyCode(*default)),
            ),
            Self::MultiKey => (CellKind::Plain(ValueType::Keys), Value::Keys(Vec::new())),
            Self::BoolKey { key } => (CellKind::BoolKey { key: KeyCode(*key) }, Value::Bool(false)),
            Self::Text => (CellKind::Plain(ValueType::Text), Value::Text(String::new())),
            Self::Color => (CellKind::Plain(ValueType::Color), Value::Color(Color::WHITE)),
            // Derived cells start as `false` until their upstream pushes a value.
            Self::Derived => (CellKind::Plain(ValueType::Any), Value::Bool(false)),
            Self::ByteArray { len } => {
                if *len > MAX_BYTE_ARRAY_LEN {
                    return Err(SchemaError::ByteArrayTooLong {
                        len: *len,
                        max: MAX_BYTE_ARRAY_LEN,
                    });
                }
                (CellKind::ByteArray { len: *len }, Value::Bytes(vec![0; *len]))
            }
            Self::Motor { ramp } => (ramp_kind(-1.0, 1.0, *ramp)?, Value::Number(0.0)),
            Self::Thrust { max, ramp } => {
                if !max.is_finite() || *max <= 0.0 {
                    return Err(SchemaError::InvalidThrust(*max));
                }
                (ramp_kind(0.0, *max, *ramp)?, Value::Number(0.0))
            }
            Self::Pulse { hold } => {
                if *hold == 0 {
                    return Err(SchemaError::ZeroHold);
                }
                (
                    CellKind::Pulse {
                        hold: *hold,
                        remaining: 0,
                    },
                    Value::Bool(false),
                )
            }
        };
        Ok(built)
    }
}

fn ensure_finite(value: f64) -> Result<(), SchemaError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SchemaError::NonFiniteDefault(value))
    }
}

fn ramp_kind(min: f64, max: f64, rate: f64) -> Result<CellKind, SchemaError> {
    if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
        return Err(SchemaError::InvalidRamp(rate));
    }
    Ok(CellKind::Ramp {
        min,
        max,
        rate,
        target: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn schema_deserializes_from_tagged_json() {
        let schema: PortSchema = serde_json::from_str(
            r#"{"name": "throttle", "kind": "bounded", "min": -1, "max": 1, "step": 0.1}"#,
        )
        .expect("schema should parse");
        assert_eq!(schema.name, "throttle");
        assert_eq!(
            schema.kind,
            ValueKind::Bounded {
                min: -1.0,
                max: 1.0,
                step: 0.1,
                default: None,
            }
        );
    }

    #[rstest]
    fn thrust_defaults_are_applied() {
        let kind: ValueKind = serde_json::from_str(r#"{"kind": "thrust"}"#).expect("parse");
        assert_eq!(
            kind,
            ValueKind::Thrust {
                max: DEFAULT_MAX_THRUST,
                ramp: DEFAULT_RAMP,
            }
        );
    }

    #[rstest]
    #[case(ValueKind::Bounded { min: 0.0, max: 1.0, step: -1.0, default: None })]
    #[case(ValueKind::Bounded { min: f64::NAN, max: 1.0, step: 0.0, default: None })]
    #[case(ValueKind::Motor { ramp: 0.0 })]
    #[case(ValueKind::Thrust { max: -5.0, ramp: 0.5 })]
    #[case(ValueKind::Pulse { hold: 0 })]
    #[case(ValueKind::ByteArray { len: MAX_BYTE_ARRAY_LEN + 1 })]
    #[case(ValueKind::Number { default: f64::INFINITY })]
    fn invalid_schemas_are_rejected(#[case] kind: ValueKind) {
        assert!(kind.instantiate().is_err());
    }

    #[rstest]
    #[case(ValueKind::Bool)]
    #[case(ValueKind::Number { default: 1.0 })]
    #[case(ValueKind::Byte)]
    #[case(ValueKind::Vector)]
    #[case(ValueKind::Key { default: 32 })]
    #[case(ValueKind::MultiKey)]
    #[case(ValueKind::BoolKey { key: 87 })]
    #[case(ValueKind::Text)]
    #[case(ValueKind::Color)]
    #[case(ValueKind::ByteArray { len: 4 })]
    #[case(ValueKind::Motor { ramp: 0.5 })]
    #[case(ValueKind::Pulse { hold: 3 })]
    fn built_cells_match_declared_type(#[case] kind: ValueKind) {
        let (cell, initial) = kind.instantiate().expect("valid schema");
        assert_eq!(cell.value_type(), kind.value_type());
        assert_eq!(initial.value_type(), kind.value_type());
    }
}

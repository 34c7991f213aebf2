//! Values carried by cells and the wire types used to check connections.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Identifier of a physical key as reported by the host input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u32);

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Linear RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

const fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

/// Wire type of a cell, used to reject incompatible connections at
/// assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Number,
    Byte,
    Vector,
    Key,
    Keys,
    Text,
    Color,
    Bytes,
    /// Accepts whatever its upstream produces.
    Any,
}

impl ValueType {
    /// Whether a cell of type `self` may feed a cell of type `downstream`.
    ///
    /// # Examples
    /// ```
    /// use cogwork::value::ValueType;
    /// assert!(ValueType::Number.feeds(ValueType::Number));
    /// assert!(ValueType::Number.feeds(ValueType::Any));
    /// assert!(!ValueType::Number.feeds(ValueType::Bool));
    /// ```
    #[must_use]
    pub fn feeds(self, downstream: Self) -> bool {
        self == downstream || self == Self::Any || downstream == Self::Any
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Byte => "byte",
            Self::Vector => "vector",
            Self::Key => "key",
            Self::Keys => "keys",
            Self::Text => "text",
            Self::Color => "color",
            Self::Bytes => "bytes",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// A value held by a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Byte(u8),
    Vector(Vec3),
    Key(KeyCode),
    Keys(Vec<KeyCode>),
    Text(String),
    Color(Color),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Number(_) => ValueType::Number,
            Self::Byte(_) => ValueType::Byte,
            Self::Vector(_) => ValueType::Vector,
            Self::Key(_) => ValueType::Key,
            Self::Keys(_) => ValueType::Keys,
            Self::Text(_) => ValueType::Text,
            Self::Color(_) => ValueType::Color,
            Self::Bytes(_) => ValueType::Bytes,
        }
    }

    /// Returns `false` for numbers, vectors and colours carrying NaN or an
    /// infinity; every other value is finite.
    ///
    /// # Examples
    /// ```
    /// use cogwork::value::Value;
    /// assert!(Value::Number(3.0).is_finite());
    /// assert!(!Value::Number(f64::NAN).is_finite());
    /// assert!(Value::Bool(true).is_finite());
    /// ```
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::Vector(v) => v.is_finite(),
            Self::Color(c) => c.is_finite(),
            _ => true,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_vector(&self) -> Option<Vec3> {
        match self {
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u8> for Value {
    fn from(b: u8) -> Self {
        Self::Byte(b)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Self::Vector(v)
    }
}

impl From<KeyCode> for Value {
    fn from(k: KeyCode) -> Self {
        Self::Key(k)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Byte(b) => write!(f, "{b:#04x}"),
            Self::Vector(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Key(k) => write!(f, "key {}", k.0),
            Self::Keys(keys) => {
                let codes: Vec<String> = keys.iter().map(|k| k.0.to_string()).collect();
                write!(f, "keys [{}]", codes.join(", "))
            }
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::Bytes(bytes) => write!(f, "{} bytes", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Vector(Vec3::new(0.0, f32::INFINITY, 0.0)))]
    #[case(Value::Color(Color { r: f32::NAN, g: 0.0, b: 0.0, a: 1.0 }))]
    #[case(Value::Number(f64::NEG_INFINITY))]
    fn non_finite_values_are_detected(#[case] value: Value) {
        assert!(!value.is_finite());
    }

    #[rstest]
    fn any_is_compatible_both_ways() {
        assert!(ValueType::Any.feeds(ValueType::Bool));
        assert!(ValueType::Color.feeds(ValueType::Any));
        assert!(!ValueType::Key.feeds(ValueType::Keys));
    }

    #[rstest]
    fn nan_never_equals_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[rstest]
    fn display_is_compact() {
        assert_eq!(Value::Byte(10).to_string(), "0x0a");
        assert_eq!(Value::Keys(vec![KeyCode(1), KeyCode(2)]).to_string(), "keys [1, 2]");
    }
}

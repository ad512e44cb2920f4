//! Runtime values held in registers and heap cells.

use num_traits::ToPrimitive;
use serde::Deserialize;
use std::fmt;

/// Runtime value produced by evaluating an operand or instruction.
///
/// Pointers are plain heap indices, so they share the integer variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer, boolean (0/1) or heap index.
    Int(i64),
    /// String constant, only ever produced by global initializers.
    Str(String),
}

impl Value {
    /// The null pointer / zero value.
    pub const ZERO: Value = Value::Int(0);

    /// Create a boolean value (1 or 0).
    pub fn from_bool(value: bool) -> Self {
        Value::Int(value as i64)
    }

    /// Try to interpret as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// Try to interpret as a heap index. Negative integers are not addresses.
    pub fn as_address(&self) -> Option<usize> {
        self.as_int().and_then(|v| v.to_usize())
    }

    /// Try to interpret as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// One heap cell. Fresh allocations start out as [`Cell::Uninit`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Uninit,
    Value(Value),
}

impl Cell {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Uninit => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(v) => v.fmt(f),
            Cell::Uninit => f.write_str("uninit"),
        }
    }
}

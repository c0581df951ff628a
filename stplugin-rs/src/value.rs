//! Values exchanged with the scripting side.
//!
//! Reads produce a [`Value`]: a number, a piece of text, or one of the host's
//! missing sentinels.  Numeric writes take a [`SetValue`], which is exactly
//! the three shapes a numeric slot can accept.

use std::fmt;

use crate::error::BridgeError;
use crate::missing::{self, MissingValue};

/// Host text buffers hold at most this many bytes.
pub const TEXT_LIMIT: usize = 244;

/// A value read from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing(MissingValue),
}

impl Default for Value {
    fn default() -> Self {
        Value::Missing(MissingValue::GENERIC)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Missing(mv) => write!(f, "{mv}"),
        }
    }
}

impl Value {
    /// `true` for missing values and for numbers in the missing band.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing(_) => true,
            Value::Number(x) => missing::is_missing(*x),
            Value::Text(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Missing(_) => "missing",
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        missing::to_external(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<MissingValue> for Value {
    fn from(mv: MissingValue) -> Self {
        Value::Missing(mv)
    }
}

// ── SetValue ──────────────────────────────────────────────────────────────────

/// A value accepted by a numeric write: a number, "absent" (stored as the
/// generic missing value), or a specific missing sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetValue {
    Number(f64),
    Absent,
    Missing(MissingValue),
}

impl SetValue {
    /// `true` for `Absent`, `Missing`, and band numbers.
    pub fn is_missing(&self) -> bool {
        match self {
            SetValue::Number(x) => missing::is_missing(*x),
            SetValue::Absent | SetValue::Missing(_) => true,
        }
    }
}

impl From<f64> for SetValue {
    fn from(x: f64) -> Self {
        SetValue::Number(x)
    }
}

impl From<i32> for SetValue {
    fn from(n: i32) -> Self {
        SetValue::Number(n as f64)
    }
}

impl From<MissingValue> for SetValue {
    fn from(mv: MissingValue) -> Self {
        SetValue::Missing(mv)
    }
}

impl From<Option<f64>> for SetValue {
    fn from(x: Option<f64>) -> Self {
        x.map_or(SetValue::Absent, SetValue::Number)
    }
}

impl TryFrom<Value> for SetValue {
    type Error = BridgeError;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Number(x) => Ok(SetValue::Number(x)),
            Value::Missing(mv) => Ok(SetValue::Missing(mv)),
            Value::Text(_) => Err(BridgeError::type_mismatch(
                "value must be number, absent, or missing-code",
            )),
        }
    }
}

/// Truncate `s` to at most `limit` bytes on a character boundary.
pub fn bound_text(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn display() {
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("hi".into()).to_string(), "hi");
        assert_eq!(Value::Missing(MissingValue::from_letter('b').unwrap()).to_string(), ".b");
        assert_eq!(Value::default().to_string(), ".");
    }

    #[test]
    fn is_missing() {
        assert!(Value::Missing(MissingValue::GENERIC).is_missing());
        assert!(Value::Number(f64::MAX).is_missing());
        assert!(!Value::Number(1.0).is_missing());
        assert!(!Value::Text(".".into()).is_missing());
        assert!(SetValue::Absent.is_missing());
        assert!(!SetValue::Number(0.0).is_missing());
    }

    #[test]
    fn from_f64_classifies() {
        assert_eq!(Value::from(1.0), Value::Number(1.0));
        assert!(matches!(Value::from(MissingValue::GENERIC.raw()), Value::Missing(_)));
    }

    #[test]
    fn missing_values_compare_by_code() {
        let a = Value::Missing(MissingValue::from_letter('a').unwrap());
        let b = Value::Missing(MissingValue::from_letter('b').unwrap());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn text_is_not_settable() {
        let err = SetValue::try_from(Value::Text("x".into())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.to_string(), "value must be number, absent, or missing-code");
        assert_eq!(SetValue::try_from(Value::Number(4.0)).unwrap(), SetValue::Number(4.0));
    }

    #[test]
    fn option_maps_none_to_absent() {
        assert_eq!(SetValue::from(None), SetValue::Absent);
        assert_eq!(SetValue::from(Some(1.5)), SetValue::Number(1.5));
    }

    #[test]
    fn bound_text_respects_char_boundaries() {
        assert_eq!(bound_text("abc", 5), "abc");
        assert_eq!(bound_text("abcdef", 3), "abc");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(bound_text("aé", 2), "a");
        assert_eq!(bound_text(&"x".repeat(300), TEXT_LIMIT).len(), TEXT_LIMIT);
    }
}

//! Scalar leaves and mapping keys

use std::fmt;

use super::types::ScalarType;
use crate::{Error, Result};

const F64_EXACT_INT: u64 = 1 << 53;
const F32_EXACT_INT: u64 = 1 << 24;

/// A leaf value. The normalizer never touches these.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Int32(i32),
    Integer(i64),
    Float32(f32),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Zero value of a scalar type
    pub fn zero(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Boolean => Scalar::Boolean(false),
            ScalarType::Int32 => Scalar::Int32(0),
            ScalarType::Integer => Scalar::Integer(0),
            ScalarType::Float32 => Scalar::Float32(0.0),
            ScalarType::Float => Scalar::Float(0.0),
            ScalarType::String => Scalar::String(String::new()),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Boolean(_) => ScalarType::Boolean,
            Scalar::Int32(_) => ScalarType::Int32,
            Scalar::Integer(_) => ScalarType::Integer,
            Scalar::Float32(_) => ScalarType::Float32,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::String(_) => ScalarType::String,
        }
    }

    /// Convert to another scalar type when no information is lost.
    ///
    /// Widening always succeeds; narrowing succeeds only when the value
    /// fits the target exactly. Booleans and strings convert to nothing
    /// but themselves.
    pub fn convert(&self, to: ScalarType) -> Option<Scalar> {
        if self.scalar_type() == to {
            return Some(self.clone());
        }
        match (self, to) {
            (Scalar::Int32(v), ScalarType::Integer) => Some(Scalar::Integer(i64::from(*v))),
            (Scalar::Int32(v), ScalarType::Float) => Some(Scalar::Float(f64::from(*v))),
            (Scalar::Int32(v), ScalarType::Float32) => {
                (u64::from(v.unsigned_abs()) <= F32_EXACT_INT).then(|| Scalar::Float32(*v as f32))
            }
            (Scalar::Integer(v), ScalarType::Int32) => i32::try_from(*v).ok().map(Scalar::Int32),
            (Scalar::Integer(v), ScalarType::Float) => {
                (v.unsigned_abs() <= F64_EXACT_INT).then(|| Scalar::Float(*v as f64))
            }
            (Scalar::Integer(v), ScalarType::Float32) => {
                (v.unsigned_abs() <= F32_EXACT_INT).then(|| Scalar::Float32(*v as f32))
            }
            (Scalar::Float32(v), ScalarType::Float) => Some(Scalar::Float(f64::from(*v))),
            (Scalar::Float32(v), ScalarType::Integer | ScalarType::Int32) => {
                Scalar::Float(f64::from(*v)).convert(to)
            }
            (Scalar::Float(v), ScalarType::Float32) => {
                let narrowed = *v as f32;
                (v.is_nan() || f64::from(narrowed) == *v).then_some(Scalar::Float32(narrowed))
            }
            (Scalar::Float(v), ScalarType::Integer) => {
                // `i64::MAX as f64` rounds up to 2^63, the exclusive end
                integral_in_range(*v, i64::MIN as f64, i64::MAX as f64)
                    .then(|| Scalar::Integer(*v as i64))
            }
            (Scalar::Float(v), ScalarType::Int32) => {
                integral_in_range(*v, f64::from(i32::MIN), f64::from(i32::MAX) + 1.0)
                    .then(|| Scalar::Int32(*v as i32))
            }
            _ => None,
        }
    }
}

/// `start` is inclusive, `end` exclusive
fn integral_in_range(v: f64, start: f64, end: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v >= start && v < end
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "{}", b),
            Scalar::Int32(i) => write!(f, "{}", i),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

// ── Mapping keys ──────────────────────────────────────────

/// A mapping key. Ordered, so mapping iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl Key {
    /// Check this key against a mapping's declared key type
    pub fn check(self, ty: ScalarType) -> Result<Key> {
        match (&self, ty) {
            (Key::Boolean(_), ScalarType::Boolean)
            | (Key::Integer(_), ScalarType::Integer)
            | (Key::String(_), ScalarType::String) => Ok(self),
            (Key::Integer(v), ScalarType::Int32) if i32::try_from(*v).is_ok() => Ok(self),
            _ => Err(Error::mismatch(ty, self.type_name())),
        }
    }

    /// Parse a key from its textual form (JSON object keys)
    pub fn parse(text: &str, ty: ScalarType) -> Result<Key> {
        let key = match ty {
            ScalarType::String => Key::String(text.to_string()),
            ScalarType::Integer | ScalarType::Int32 => text
                .parse::<i64>()
                .map(Key::Integer)
                .map_err(|_| Error::mismatch(ty, format!("key {:?}", text)))?,
            _ => return Err(Error::mismatch("a string or integer key type", ty)),
        };
        key.check(ty)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Key::Boolean(_) => "Boolean",
            Key::Integer(_) => "Integer",
            Key::String(_) => "String",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Boolean(b) => write!(f, "{}", b),
            Key::Integer(i) => write!(f, "{}", i),
            Key::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Integer(i)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Boolean(b)
    }
}

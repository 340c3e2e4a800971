//! Compile-time constant values.
//!
//! Floating point values are carried as their raw IEEE-754 bit patterns so a
//! folded constant is bit-identical to what the target computes at runtime.

use std::fmt;

/// A folded constant value.
///
/// `byte`, `short` and `char` constants are stored as `Int`; the owning
/// expression's type says how many bits are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    Null,
}

impl ConstValue {
    pub fn from_f32(value: f32) -> Self {
        ConstValue::Float(value.to_bits())
    }

    pub fn from_f64(value: f64) -> Self {
        ConstValue::Double(value.to_bits())
    }

    /// Raw bit pattern as loaded into a register, zero-extended to 64 bits.
    pub fn bits(self) -> u64 {
        match self {
            ConstValue::Bool(b) => b as u64,
            ConstValue::Int(v) => v as u32 as u64,
            ConstValue::Long(v) => v as u64,
            ConstValue::Float(bits) => bits as u64,
            ConstValue::Double(bits) => bits,
            ConstValue::Null => 0,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i32> {
        match self {
            ConstValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Integral value widened to `i64`.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(v as i64),
            ConstValue::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(self) -> Option<f32> {
        match self {
            ConstValue::Float(bits) => Some(f32::from_bits(bits)),
            _ => None,
        }
    }

    /// Any numeric value as `f64`.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(v as f64),
            ConstValue::Long(v) => Some(v as f64),
            ConstValue::Float(bits) => Some(f32::from_bits(bits) as f64),
            ConstValue::Double(bits) => Some(f64::from_bits(bits)),
            ConstValue::Bool(_) | ConstValue::Null => None,
        }
    }

    /// Integral zero. Used for the division-by-zero check.
    pub fn is_integral_zero(self) -> bool {
        matches!(self, ConstValue::Int(0) | ConstValue::Long(0))
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Long(v) => write!(f, "{v}L"),
            ConstValue::Float(bits) => write!(f, "{}f", f32::from_bits(bits)),
            ConstValue::Double(bits) => write!(f, "{}", f64::from_bits(bits)),
            ConstValue::Null => f.write_str("null"),
        }
    }
}

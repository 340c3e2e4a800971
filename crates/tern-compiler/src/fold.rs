//! Constant folding.
//!
//! Folded results must be bit-identical to what the target computes at
//! runtime, so integral arithmetic wraps, shift counts are masked to the
//! operand width, and floating point is carried as raw bits and computed in
//! the operand's own precision.

use std::cmp::Ordering;

use tern_ast::{BinaryOp, UnaryOp};
use tern_core::{ConstValue, PrimitiveKind};

const F32_SIGN: u32 = 0x8000_0000;
const F64_SIGN: u64 = 0x8000_0000_0000_0000;

/// Fold `left op right` where both operands already have type `kind`.
///
/// Comparisons yield `Bool`. Returns `None` when the operation cannot be
/// folded: integral division by zero, or operands of the wrong shape.
pub fn fold_binary(
    op: BinaryOp,
    kind: PrimitiveKind,
    left: ConstValue,
    right: ConstValue,
) -> Option<ConstValue> {
    use BinaryOp::*;

    match (kind, left, right) {
        (PrimitiveKind::Bool, ConstValue::Bool(l), ConstValue::Bool(r)) => Some(ConstValue::Bool(match op {
            LogicalAnd | BitwiseAnd => l & r,
            LogicalOr | BitwiseOr => l | r,
            BitwiseXor | NotEqual => l ^ r,
            Equal => l == r,
            _ => return None,
        })),
        (PrimitiveKind::Long, ConstValue::Long(l), r) if op.is_shift() => {
            let count = (r.as_i64()? & 63) as u32;
            Some(ConstValue::Long(match op {
                ShiftLeft => l.wrapping_shl(count),
                ShiftRight => l.wrapping_shr(count),
                _ => ((l as u64) >> count) as i64,
            }))
        }
        (_, ConstValue::Int(l), r) if op.is_shift() => {
            let count = (r.as_i64()? & 31) as u32;
            Some(ConstValue::Int(match op {
                ShiftLeft => l.wrapping_shl(count),
                ShiftRight => l.wrapping_shr(count),
                _ => ((l as u32) >> count) as i32,
            }))
        }
        (_, ConstValue::Int(l), ConstValue::Int(r)) => fold_int(op, l, r),
        (_, ConstValue::Long(l), ConstValue::Long(r)) => fold_long(op, l, r),
        (_, ConstValue::Float(l), ConstValue::Float(r)) => {
            let (l, r) = (f32::from_bits(l), f32::from_bits(r));
            if let Some(result) = compare(op, l.partial_cmp(&r)) {
                return Some(result);
            }
            Some(ConstValue::from_f32(match op {
                Add => l + r,
                Sub => l - r,
                Mul => l * r,
                Div => l / r,
                Mod => l % r,
                _ => return None,
            }))
        }
        (_, ConstValue::Double(l), ConstValue::Double(r)) => {
            let (l, r) = (f64::from_bits(l), f64::from_bits(r));
            if let Some(result) = compare(op, l.partial_cmp(&r)) {
                return Some(result);
            }
            Some(ConstValue::from_f64(match op {
                Add => l + r,
                Sub => l - r,
                Mul => l * r,
                Div => l / r,
                Mod => l % r,
                _ => return None,
            }))
        }
        (_, ConstValue::Null, ConstValue::Null) => match op {
            Equal => Some(ConstValue::Bool(true)),
            NotEqual => Some(ConstValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_int(op: BinaryOp, l: i32, r: i32) -> Option<ConstValue> {
    use BinaryOp::*;
    if let Some(result) = compare(op, Some(l.cmp(&r))) {
        return Some(result);
    }
    Some(ConstValue::Int(match op {
        Add => l.wrapping_add(r),
        Sub => l.wrapping_sub(r),
        Mul => l.wrapping_mul(r),
        Div => l.checked_div(r).or_else(|| (r == -1).then_some(l.wrapping_neg()))?,
        Mod => {
            if r == 0 {
                return None;
            }
            l.wrapping_rem(r)
        }
        BitwiseAnd => l & r,
        BitwiseOr => l | r,
        BitwiseXor => l ^ r,
        _ => return None,
    }))
}

fn fold_long(op: BinaryOp, l: i64, r: i64) -> Option<ConstValue> {
    use BinaryOp::*;
    if let Some(result) = compare(op, Some(l.cmp(&r))) {
        return Some(result);
    }
    Some(ConstValue::Long(match op {
        Add => l.wrapping_add(r),
        Sub => l.wrapping_sub(r),
        Mul => l.wrapping_mul(r),
        Div => l.checked_div(r).or_else(|| (r == -1).then_some(l.wrapping_neg()))?,
        Mod => {
            if r == 0 {
                return None;
            }
            l.wrapping_rem(r)
        }
        BitwiseAnd => l & r,
        BitwiseOr => l | r,
        BitwiseXor => l ^ r,
        _ => return None,
    }))
}

/// Comparison result; an unordered pair (NaN) is unequal to everything.
fn compare(op: BinaryOp, ordering: Option<Ordering>) -> Option<ConstValue> {
    if !op.is_comparison() {
        return None;
    }
    let Some(ordering) = ordering else {
        return Some(ConstValue::Bool(op == BinaryOp::NotEqual));
    };
    let result = match op {
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterEqual => ordering != Ordering::Less,
        _ => return None,
    };
    Some(ConstValue::Bool(result))
}

/// Fold a prefix operator. `Neg` of a float flips the sign bit only, so NaN
/// payloads survive.
pub fn fold_unary(op: UnaryOp, value: ConstValue) -> Option<ConstValue> {
    Some(match (op, value) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Neg, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_neg()),
        (UnaryOp::Neg, ConstValue::Long(v)) => ConstValue::Long(v.wrapping_neg()),
        (UnaryOp::Neg, ConstValue::Float(bits)) => ConstValue::Float(bits ^ F32_SIGN),
        (UnaryOp::Neg, ConstValue::Double(bits)) => ConstValue::Double(bits ^ F64_SIGN),
        (UnaryOp::BitwiseNot, ConstValue::Int(v)) => ConstValue::Int(!v),
        (UnaryOp::BitwiseNot, ConstValue::Long(v)) => ConstValue::Long(!v),
        (UnaryOp::LogicalNot, ConstValue::Bool(b)) => ConstValue::Bool(!b),
        _ => return None,
    })
}

/// Numeric conversion of a constant, with cast semantics: integers truncate
/// to the target width, floating point saturates toward integers and NaN
/// becomes zero.
pub fn convert(value: ConstValue, to: PrimitiveKind) -> Option<ConstValue> {
    if to == PrimitiveKind::Bool {
        return value.as_bool().map(ConstValue::Bool);
    }
    let converted = match value {
        ConstValue::Int(v) => from_i64(v as i64, to),
        ConstValue::Long(v) => from_i64(v, to),
        ConstValue::Float(bits) => from_f64(f32::from_bits(bits) as f64, Some(bits), to),
        ConstValue::Double(bits) => from_f64(f64::from_bits(bits), None, to),
        ConstValue::Bool(_) | ConstValue::Null => return None,
    };
    Some(converted)
}

fn from_i64(v: i64, to: PrimitiveKind) -> ConstValue {
    match to {
        PrimitiveKind::Byte => ConstValue::Int(v as i8 as i32),
        PrimitiveKind::Short => ConstValue::Int(v as i16 as i32),
        PrimitiveKind::Char => ConstValue::Int(v as u16 as i32),
        PrimitiveKind::Long => ConstValue::Long(v),
        PrimitiveKind::Float => ConstValue::from_f32(v as f32),
        PrimitiveKind::Double => ConstValue::from_f64(v as f64),
        _ => ConstValue::Int(v as i32),
    }
}

/// `float_bits` is set when the source was a `float`, so float-to-float
/// keeps the exact payload.
fn from_f64(v: f64, float_bits: Option<u32>, to: PrimitiveKind) -> ConstValue {
    match to {
        PrimitiveKind::Float => match float_bits {
            Some(bits) => ConstValue::Float(bits),
            None => ConstValue::from_f32(v as f32),
        },
        PrimitiveKind::Double => ConstValue::from_f64(v),
        PrimitiveKind::Long => ConstValue::Long(v as i64),
        // float to a narrow integer goes through int first
        small => from_i64(v as i32 as i64, small),
    }
}

/// Whether converting `value` to `to` preserves it exactly.
pub fn is_exact(value: ConstValue, to: PrimitiveKind) -> bool {
    let Some(converted) = convert(value, to) else {
        return false;
    };
    match (value, converted) {
        (ConstValue::Int(_) | ConstValue::Long(_), ConstValue::Int(_) | ConstValue::Long(_)) => {
            value.as_i64() == converted.as_i64()
        }
        (ConstValue::Int(_) | ConstValue::Long(_), ConstValue::Float(_) | ConstValue::Double(_)) => {
            let back = converted.as_f64().map(|f| f as i128);
            back == value.as_i64().map(|v| v as i128)
        }
        (ConstValue::Double(bits), ConstValue::Float(f)) => {
            let original = f64::from_bits(bits);
            original.is_nan() || f32::from_bits(f) as f64 == original
        }
        (ConstValue::Float(_), ConstValue::Double(_)) => true,
        (ConstValue::Float(_) | ConstValue::Double(_), _) => {
            let original = value.as_f64();
            original.is_some_and(|f| f.fract() == 0.0) && converted.as_f64() == original
        }
        _ => value == converted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn int_division_follows_target() {
        let min = ConstValue::Int(i32::MIN);
        assert_eq!(
            fold_binary(BinaryOp::Div, PrimitiveKind::Int, min, ConstValue::Int(-1)),
            Some(min)
        );
        assert_eq!(
            fold_binary(BinaryOp::Mod, PrimitiveKind::Int, min, ConstValue::Int(-1)),
            Some(ConstValue::Int(0))
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, PrimitiveKind::Int, ConstValue::Int(-7), ConstValue::Int(2)),
            Some(ConstValue::Int(-3))
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, PrimitiveKind::Int, ConstValue::Int(1), ConstValue::Int(0)),
            None
        );
    }

    #[test]
    fn shift_counts_are_masked() {
        assert_eq!(
            fold_binary(BinaryOp::ShiftLeft, PrimitiveKind::Int, ConstValue::Int(1), ConstValue::Int(33)),
            Some(ConstValue::Int(2))
        );
        assert_eq!(
            fold_binary(
                BinaryOp::ShiftRightUnsigned,
                PrimitiveKind::Int,
                ConstValue::Int(-1),
                ConstValue::Int(28)
            ),
            Some(ConstValue::Int(15))
        );
        assert_eq!(
            fold_binary(BinaryOp::ShiftLeft, PrimitiveKind::Long, ConstValue::Long(1), ConstValue::Int(65)),
            Some(ConstValue::Long(2))
        );
    }

    #[test]
    fn float_comparisons_with_nan() {
        let nan = ConstValue::from_f32(f32::NAN);
        let one = ConstValue::from_f32(1.0);
        for op in [BinaryOp::Less, BinaryOp::GreaterEqual, BinaryOp::Equal] {
            assert_eq!(
                fold_binary(op, PrimitiveKind::Float, nan, one),
                Some(ConstValue::Bool(false))
            );
        }
        assert_eq!(
            fold_binary(BinaryOp::NotEqual, PrimitiveKind::Float, nan, nan),
            Some(ConstValue::Bool(true))
        );
    }

    #[test]
    fn negation_keeps_nan_payload() {
        let nan = ConstValue::Float(0x7fc0_1234);
        assert_eq!(fold_unary(UnaryOp::Neg, nan), Some(ConstValue::Float(0xffc0_1234)));
        assert_eq!(
            fold_unary(UnaryOp::Neg, ConstValue::Int(i32::MIN)),
            Some(ConstValue::Int(i32::MIN))
        );
    }

    #[test]
    fn casts() {
        assert_eq!(convert(ConstValue::Int(200), PrimitiveKind::Byte), Some(ConstValue::Int(-56)));
        assert_eq!(convert(ConstValue::Int(-1), PrimitiveKind::Char), Some(ConstValue::Int(65535)));
        assert_eq!(
            convert(ConstValue::from_f64(1e10), PrimitiveKind::Int),
            Some(ConstValue::Int(i32::MAX))
        );
        assert_eq!(
            convert(ConstValue::from_f32(f32::NAN), PrimitiveKind::Long),
            Some(ConstValue::Long(0))
        );
        assert_eq!(
            convert(ConstValue::from_f64(300.7), PrimitiveKind::Byte),
            Some(ConstValue::Int(44))
        );
        assert_eq!(convert(ConstValue::Bool(true), PrimitiveKind::Int), None);
    }

    #[test]
    fn exactness() {
        assert!(is_exact(ConstValue::Int(100), PrimitiveKind::Byte));
        assert!(!is_exact(ConstValue::Int(200), PrimitiveKind::Byte));
        assert!(is_exact(ConstValue::Int(16_777_216), PrimitiveKind::Float));
        assert!(!is_exact(ConstValue::Int(16_777_217), PrimitiveKind::Float));
        assert!(!is_exact(ConstValue::Long(i64::MAX), PrimitiveKind::Double));
        assert!(is_exact(ConstValue::from_f64(0.5), PrimitiveKind::Float));
        assert!(!is_exact(ConstValue::from_f64(0.1), PrimitiveKind::Float));
        assert!(!is_exact(ConstValue::from_f64(2.5), PrimitiveKind::Int));
    }

    proptest! {
        #[test]
        fn int_arithmetic_matches_wrapping(l: i32, r: i32) {
            let fold = |op| fold_binary(op, PrimitiveKind::Int, ConstValue::Int(l), ConstValue::Int(r));
            prop_assert_eq!(fold(BinaryOp::Add), Some(ConstValue::Int(l.wrapping_add(r))));
            prop_assert_eq!(fold(BinaryOp::Sub), Some(ConstValue::Int(l.wrapping_sub(r))));
            prop_assert_eq!(fold(BinaryOp::Mul), Some(ConstValue::Int(l.wrapping_mul(r))));
            prop_assert_eq!(fold(BinaryOp::Less), Some(ConstValue::Bool(l < r)));
            if r != 0 {
                prop_assert_eq!(fold(BinaryOp::Div), Some(ConstValue::Int(l.wrapping_div(r))));
                prop_assert_eq!(fold(BinaryOp::Mod), Some(ConstValue::Int(l.wrapping_rem(r))));
            }
        }

        #[test]
        fn double_arithmetic_is_bit_identical(l: f64, r: f64) {
            let fold = |op| {
                fold_binary(op, PrimitiveKind::Double, ConstValue::from_f64(l), ConstValue::from_f64(r))
            };
            prop_assert_eq!(fold(BinaryOp::Add), Some(ConstValue::Double((l + r).to_bits())));
            prop_assert_eq!(fold(BinaryOp::Mul), Some(ConstValue::Double((l * r).to_bits())));
            prop_assert_eq!(fold(BinaryOp::Div), Some(ConstValue::Double((l / r).to_bits())));
        }

        #[test]
        fn float_casts_saturate(v: f32) {
            let folded = convert(ConstValue::from_f32(v), PrimitiveKind::Int);
            prop_assert_eq!(folded, Some(ConstValue::Int(v as i32)));
        }
    }
}

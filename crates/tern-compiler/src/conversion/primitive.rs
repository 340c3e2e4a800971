//! Primitive type conversions.
//!
//! Implicitly only widening is allowed (`byte < short < int < long < float <
//! double`, with `char` widening to `int` and up). Explicit casts convert
//! between any two numeric kinds. `boolean` converts to nothing but itself.

use tern_ast::Conversion;
use tern_core::PrimitiveKind;

/// Find a primitive conversion from `from` to `to`.
pub fn find_primitive_conversion(
    from: PrimitiveKind,
    to: PrimitiveKind,
    explicit: bool,
) -> Option<Conversion> {
    if from == PrimitiveKind::Void || to == PrimitiveKind::Void {
        return None;
    }
    if from == to {
        return Some(Conversion::Identity);
    }
    if !(from.is_numeric() && to.is_numeric()) {
        return None;
    }
    if explicit || from.widens_to(to) {
        return Some(Conversion::Primitive { from, to });
    }
    None
}

/// Whether a conversion between two numeric kinds can lose information.
pub fn is_narrowing(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    from != to && from.is_numeric() && to.is_numeric() && !from.widens_to(to)
}

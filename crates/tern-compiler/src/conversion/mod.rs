//! Type conversion system.
//!
//! Determines whether a value of one type can be used where another is
//! expected, and which [`Conversion`] node the resolver inserts for it. Used
//! for:
//!
//! - Assignment and argument passing (implicit conversions)
//! - Overload resolution (how many conversions a candidate needs)
//! - Explicit casts
//!
//! Constant narrowing (`byte b = 10;`) is not decided here; it depends on the
//! value and is handled by the resolver on top of these rules.

use tern_ast::Conversion;
use tern_core::DataType;

use crate::context::CompileContext;

mod primitive;
mod reference;

pub use primitive::{find_primitive_conversion, is_narrowing};
pub use reference::{find_reference_cast, find_reference_conversion, null_kind_for};

/// Find the implicit conversion from `source` to `target`.
pub fn find_conversion(
    ctx: &CompileContext<'_>,
    source: &DataType,
    target: &DataType,
) -> Option<Conversion> {
    match (source.as_primitive(), target.as_primitive()) {
        (Some(from), Some(to)) => find_primitive_conversion(from, to, false),
        (None, None) => find_reference_conversion(ctx, source, target),
        _ => None,
    }
}

/// Find the conversions an explicit cast from `source` to `target` performs,
/// in order.
pub fn find_cast(
    ctx: &CompileContext<'_>,
    source: &DataType,
    target: &DataType,
) -> Option<Vec<Conversion>> {
    match (source.as_primitive(), target.as_primitive()) {
        (Some(from), Some(to)) => find_primitive_conversion(from, to, true).map(|c| vec![c]),
        (None, None) => find_reference_cast(ctx, source, target),
        _ => None,
    }
}

/// Type a conversion produces when applied to `source`, for node annotation.
pub fn converted_type(conversion: &Conversion, source: &DataType, target: &DataType) -> DataType {
    match conversion {
        Conversion::Identity if source.is_null() => *source,
        Conversion::NullRetype(kind) => DataType::null_of(*kind),
        _ => *target,
    }
}

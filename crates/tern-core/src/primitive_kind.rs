//! Primitive type kinds of the source language.

use std::fmt;

use crate::TypeHash;

/// Primitive type kinds.
///
/// `Void` is only valid as a method return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    /// All non-void primitives, in declaration order.
    pub const VALUES: [PrimitiveKind; 8] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source-level keyword for this primitive.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Identity of this primitive, used in method signature hashes.
    pub fn type_hash(self) -> TypeHash {
        TypeHash::from_name(self.name())
    }

    /// Storage size in bytes.
    pub const fn size(self) -> u32 {
        match self {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Bool | PrimitiveKind::Byte => 1,
            PrimitiveKind::Short | PrimitiveKind::Char => 2,
            PrimitiveKind::Int | PrimitiveKind::Float => 4,
            PrimitiveKind::Long | PrimitiveKind::Double => 8,
        }
    }

    /// Integral kinds (`char` included, `boolean` excluded).
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Char
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    /// Floating point kinds.
    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Kinds arithmetic operators accept.
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// Kinds that widen to `int` before arithmetic.
    pub const fn is_small_int(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char
        )
    }

    /// Binary numeric promotion of a single operand.
    pub const fn promoted(self) -> PrimitiveKind {
        if self.is_small_int() {
            PrimitiveKind::Int
        } else {
            self
        }
    }

    /// Rank in the widening order `byte < short < int < long < float < double`.
    ///
    /// `char` shares the rank of `short` but neither widens to the other.
    pub const fn widening_rank(self) -> Option<u8> {
        match self {
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Short | PrimitiveKind::Char => Some(1),
            PrimitiveKind::Int => Some(2),
            PrimitiveKind::Long => Some(3),
            PrimitiveKind::Float => Some(4),
            PrimitiveKind::Double => Some(5),
            PrimitiveKind::Void | PrimitiveKind::Bool => None,
        }
    }

    /// Whether a value of `self` converts to `to` without an explicit cast
    /// and without losing range.
    pub const fn widens_to(self, to: PrimitiveKind) -> bool {
        if self as u8 == to as u8 {
            return true;
        }
        match (self, to) {
            // char is unsigned, so neither byte nor short widen to it
            (_, PrimitiveKind::Char) => false,
            (PrimitiveKind::Char, PrimitiveKind::Short) => false,
            _ => match (self.widening_rank(), to.widening_rank()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_promote_to_int() {
        assert_eq!(PrimitiveKind::Byte.promoted(), PrimitiveKind::Int);
        assert_eq!(PrimitiveKind::Char.promoted(), PrimitiveKind::Int);
        assert_eq!(PrimitiveKind::Long.promoted(), PrimitiveKind::Long);
        assert_eq!(PrimitiveKind::Bool.promoted(), PrimitiveKind::Bool);
    }

    #[test]
    fn widening_table() {
        assert!(PrimitiveKind::Byte.widens_to(PrimitiveKind::Int));
        assert!(PrimitiveKind::Int.widens_to(PrimitiveKind::Long));
        assert!(PrimitiveKind::Long.widens_to(PrimitiveKind::Float));
        assert!(PrimitiveKind::Char.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Byte.widens_to(PrimitiveKind::Char));
        assert!(!PrimitiveKind::Char.widens_to(PrimitiveKind::Short));
        assert!(!PrimitiveKind::Long.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Bool.widens_to(PrimitiveKind::Int));
    }
}

//! Resolved type descriptors.
//!
//! A [`DataType`] is what the resolver stores on every expression node: a base
//! type, an array dimension count and a [`ArraySpecial`] sub-kind telling the
//! code generator how the array length is known.

use std::fmt;

use crate::{PrimitiveKind, TypeHash};

/// Flavour of a `null` value before it is bound to a concrete slot.
///
/// A bare `null` literal starts as `Untyped`; the resolver rebinds it to an
/// object or interface null once the other side of the expression is known, so
/// the code generator loads a value of the right register width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullKind {
    Untyped,
    Object,
    Interface,
}

/// The non-array part of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Primitive(PrimitiveKind),
    Class(TypeHash),
    Interface(TypeHash),
    Null(NullKind),
}

/// How an array's length is known to the code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArraySpecial {
    /// Length stored in the array header and checked at runtime.
    #[default]
    None,
    /// Fixed bound known at compile time; constant indices are checked statically.
    Inline(u32),
    /// No length information, never checked.
    Unchecked,
}

/// Register width class of a value.
///
/// Interface references travel as an object pointer plus an interface-map
/// pointer, hence the double-width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegClass {
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Ptr,
    DoublePtr,
}

impl RegClass {
    /// Whether a value of this class occupies two machine words on 32-bit targets.
    pub const fn is_wide(self) -> bool {
        matches!(self, RegClass::Long | RegClass::Double | RegClass::DoublePtr)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, RegClass::Float | RegClass::Double)
    }
}

/// A fully resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub base: BaseType,
    pub dims: u8,
    pub special: ArraySpecial,
}

impl DataType {
    pub const VOID: DataType = DataType::primitive(PrimitiveKind::Void);
    pub const BOOL: DataType = DataType::primitive(PrimitiveKind::Bool);
    pub const BYTE: DataType = DataType::primitive(PrimitiveKind::Byte);
    pub const SHORT: DataType = DataType::primitive(PrimitiveKind::Short);
    pub const CHAR: DataType = DataType::primitive(PrimitiveKind::Char);
    pub const INT: DataType = DataType::primitive(PrimitiveKind::Int);
    pub const LONG: DataType = DataType::primitive(PrimitiveKind::Long);
    pub const FLOAT: DataType = DataType::primitive(PrimitiveKind::Float);
    pub const DOUBLE: DataType = DataType::primitive(PrimitiveKind::Double);
    pub const NULL: DataType = DataType::scalar(BaseType::Null(NullKind::Untyped));

    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            dims: 0,
            special: ArraySpecial::None,
        }
    }

    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self::scalar(BaseType::Primitive(kind))
    }

    pub const fn class(hash: TypeHash) -> Self {
        Self::scalar(BaseType::Class(hash))
    }

    pub const fn interface(hash: TypeHash) -> Self {
        Self::scalar(BaseType::Interface(hash))
    }

    pub const fn null_of(kind: NullKind) -> Self {
        Self::scalar(BaseType::Null(kind))
    }

    /// Array of `dims` dimensions over this type's base.
    pub const fn with_dims(self, dims: u8) -> Self {
        Self {
            base: self.base,
            dims,
            special: self.special,
        }
    }

    pub const fn with_special(self, special: ArraySpecial) -> Self {
        Self {
            base: self.base,
            dims: self.dims,
            special,
        }
    }

    /// One more array dimension.
    pub const fn array_of(self) -> Self {
        Self {
            base: self.base,
            dims: self.dims + 1,
            special: ArraySpecial::None,
        }
    }

    /// Element type of an array type. Non-arrays return `None`.
    pub const fn element(self) -> Option<Self> {
        if self.dims == 0 {
            return None;
        }
        Some(Self {
            base: self.base,
            dims: self.dims - 1,
            special: ArraySpecial::None,
        })
    }

    pub const fn is_array(&self) -> bool {
        self.dims > 0
    }

    pub const fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self.base {
            BaseType::Primitive(kind) if self.dims == 0 => Some(kind),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        self.as_primitive() == Some(PrimitiveKind::Bool)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_numeric)
    }

    pub fn is_integral(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_integral)
    }

    /// Object, interface, array and null values.
    pub const fn is_reference(&self) -> bool {
        self.dims > 0 || !matches!(self.base, BaseType::Primitive(_))
    }

    pub const fn is_null(&self) -> bool {
        self.dims == 0 && matches!(self.base, BaseType::Null(_))
    }

    /// Scalar interface reference (two-word value).
    pub const fn is_interface_ref(&self) -> bool {
        self.dims == 0
            && matches!(
                self.base,
                BaseType::Interface(_) | BaseType::Null(NullKind::Interface)
            )
    }

    /// Array whose elements are interface references.
    pub const fn is_interface_array(&self) -> bool {
        self.dims > 0 && matches!(self.base, BaseType::Interface(_))
    }

    /// Class hash of a scalar class type.
    pub const fn class_hash(&self) -> Option<TypeHash> {
        match self.base {
            BaseType::Class(hash) if self.dims == 0 => Some(hash),
            _ => None,
        }
    }

    /// Declaring type hash of a scalar class or interface type.
    pub const fn object_hash(&self) -> Option<TypeHash> {
        match self.base {
            BaseType::Class(hash) | BaseType::Interface(hash) if self.dims == 0 => Some(hash),
            _ => None,
        }
    }

    /// Register class a value of this type is held in. `void` has none.
    pub fn reg_class(&self) -> Option<RegClass> {
        if self.dims > 0 {
            return Some(RegClass::Ptr);
        }
        Some(match self.base {
            BaseType::Primitive(kind) => match kind {
                PrimitiveKind::Void => return None,
                PrimitiveKind::Bool | PrimitiveKind::Byte => RegClass::Byte,
                PrimitiveKind::Short => RegClass::Short,
                PrimitiveKind::Char => RegClass::Char,
                PrimitiveKind::Int => RegClass::Int,
                PrimitiveKind::Long => RegClass::Long,
                PrimitiveKind::Float => RegClass::Float,
                PrimitiveKind::Double => RegClass::Double,
            },
            BaseType::Class(_) | BaseType::Null(NullKind::Object | NullKind::Untyped) => {
                RegClass::Ptr
            }
            BaseType::Interface(_) | BaseType::Null(NullKind::Interface) => RegClass::DoublePtr,
        })
    }

    /// Identity used in method signature hashes. Ignores the array special code.
    pub fn type_hash(&self) -> TypeHash {
        let base = match self.base {
            BaseType::Primitive(kind) => kind.type_hash(),
            BaseType::Class(hash) | BaseType::Interface(hash) => hash,
            BaseType::Null(_) => TypeHash::from_name("null"),
        };
        if self.dims == 0 {
            base
        } else {
            TypeHash(base.0.rotate_left(7 * self.dims as u32) ^ self.dims as u64)
        }
    }

    /// Whether two types are identical ignoring the array special code.
    pub fn same_shape(&self, other: &DataType) -> bool {
        self.base == other.base && self.dims == other.dims
    }

    /// Storage size of an element or scalar of this type in bytes.
    pub fn storage_size(&self, pointer_bytes: u32) -> u32 {
        match self.reg_class() {
            None => 0,
            Some(RegClass::Ptr) => pointer_bytes,
            Some(RegClass::DoublePtr) => pointer_bytes * 2,
            Some(_) => self.as_primitive().map_or(pointer_bytes, PrimitiveKind::size),
        }
    }
}

impl From<PrimitiveKind> for DataType {
    fn from(kind: PrimitiveKind) -> Self {
        DataType::primitive(kind)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            BaseType::Primitive(kind) => write!(f, "{kind}")?,
            BaseType::Class(hash) | BaseType::Interface(hash) => write!(f, "<{hash}>")?,
            BaseType::Null(_) => f.write_str("null")?,
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_classes() {
        assert_eq!(DataType::BOOL.reg_class(), Some(RegClass::Byte));
        assert_eq!(DataType::LONG.reg_class(), Some(RegClass::Long));
        assert_eq!(DataType::VOID.reg_class(), None);

        let iface = DataType::interface(TypeHash::from_name("Runnable"));
        assert_eq!(iface.reg_class(), Some(RegClass::DoublePtr));
        // arrays of interfaces are plain pointers
        assert_eq!(iface.array_of().reg_class(), Some(RegClass::Ptr));
        assert!(iface.array_of().is_interface_array());
        assert_eq!(
            DataType::null_of(NullKind::Interface).reg_class(),
            Some(RegClass::DoublePtr)
        );
    }

    #[test]
    fn array_element_drops_special() {
        let arr = DataType::INT.array_of().with_special(ArraySpecial::Inline(4));
        assert_eq!(arr.element(), Some(DataType::INT));
        assert_eq!(DataType::INT.element(), None);
        assert!(arr.same_shape(&DataType::INT.array_of()));
    }

    #[test]
    fn display_primitive_arrays() {
        assert_eq!(DataType::INT.with_dims(2).to_string(), "int[][]");
        assert_eq!(DataType::NULL.to_string(), "null");
    }
}

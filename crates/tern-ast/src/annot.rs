//! Annotations the resolver attaches to nodes.
//!
//! The parser leaves all of these empty. After a successful resolve every
//! reachable node carries them, and the code generator reads them without
//! further lookups.

use tern_core::{ConstValue, DataType, LocalId, NullKind, PrimitiveKind, StorageClass, TypeHash, VarRef};

/// Resolved type, constancy and effect of an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprInfo {
    pub data_type: DataType,
    /// Folded value. Once set it never changes.
    pub constant: Option<ConstValue>,
    /// The expression has an observable side effect.
    pub effect: bool,
}

impl ExprInfo {
    pub fn value(data_type: DataType) -> Self {
        Self {
            data_type,
            constant: None,
            effect: false,
        }
    }

    pub fn constant(data_type: DataType, value: ConstValue) -> Self {
        Self {
            data_type,
            constant: Some(value),
            effect: false,
        }
    }

    pub fn with_effect(mut self) -> Self {
        self.effect = true;
        self
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }
}

/// A frame slot owned by one local, parameter or hidden temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalSlot {
    pub id: LocalId,
    /// Frame offset in words; parameters are negative.
    pub offset: i32,
}

/// Binding of a variable reference or field dereference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVar {
    pub var: VarRef,
    pub storage: StorageClass,
    /// Byte offset of a field, relocation slot of a relocatable static,
    /// frame offset of a local.
    pub offset: i32,
    /// Instance field reached through the implicit `this`.
    pub implicit_this: bool,
}

impl ResolvedVar {
    pub fn local(slot: LocalSlot, storage: StorageClass) -> Self {
        Self {
            var: VarRef::Local {
                id: slot.id,
                slot: slot.offset,
            },
            storage,
            offset: slot.offset,
            implicit_this: false,
        }
    }
}

/// What a `a.b` dereference resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum DerefTarget {
    Field(ResolvedVar),
    ArrayLength,
}

/// How a call reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Static method at the declaring type.
    Static,
    /// Non-virtual instance call: constructors, private and `super` calls.
    Direct,
    /// Virtual call through the receiver's vtable.
    Virtual { slot: u32 },
    /// Call through the interface map of an interface reference.
    Interface { iface: TypeHash, slot: u32 },
    /// Implicit zero-argument initializer of a type without constructors.
    DefaultInit,
}

/// Target of a resolved call or constructor invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    pub method: TypeHash,
    /// Real declaring type.
    pub owner: TypeHash,
    pub dispatch: Dispatch,
    pub params: Vec<DataType>,
    pub return_type: DataType,
}

impl CallTarget {
    pub fn is_static(&self) -> bool {
        self.dispatch == Dispatch::Static
    }
}

/// An implicit or explicit conversion between two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Same representation, no code.
    Identity,
    /// Numeric conversion between primitives.
    Primitive { from: PrimitiveKind, to: PrimitiveKind },
    /// Class reference to a supertype; no code.
    Upcast,
    /// Object reference to an interface reference: the interface map is
    /// looked up at runtime.
    ToInterface { iface: TypeHash },
    /// Interface reference to another interface.
    InterfaceToInterface { iface: TypeHash },
    /// Interface reference to its object pointer.
    InterfaceToObject,
    /// Class reference to a subtype, checked at runtime when enabled.
    Downcast { target: TypeHash },
    /// Array reference cast with a runtime check.
    ArrayCast,
    /// Rebind an untyped null to a concrete pointer kind.
    NullRetype(NullKind),
}

impl Conversion {
    /// Conversions that emit no code.
    pub fn is_free(&self) -> bool {
        matches!(self, Conversion::Identity | Conversion::Upcast)
    }
}

/// Lowering plan of an enhanced `for`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForEachPlan {
    /// Iterate an array with a hidden index.
    Array {
        array: LocalSlot,
        index: LocalSlot,
        element: DataType,
        /// Element to loop variable.
        conversion: Conversion,
    },
    /// Iterate an object with `hasNext()`/`next()`.
    Iterator {
        iterator: LocalSlot,
        has_next: CallTarget,
        next: CallTarget,
        conversion: Conversion,
    },
}

/// Hidden slots of a `try` statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrySlots {
    /// First word of the stack-resident throw frame.
    pub frame: LocalSlot,
    /// Pending exception slot.
    pub exception: LocalSlot,
}

//! Variable bindings handed to the resolver.
//!
//! Field bindings come from the layout engine through the registry; local and
//! parameter bindings are created by the compiler's scope.

use crate::{ConstValue, DataType, Modifiers, TypeHash};

/// Where a variable lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Stack slot of the current method.
    Local,
    /// Incoming argument slot.
    Parameter,
    /// Instance field stored inline in the object.
    InstanceScalar,
    /// Instance field reached through a pointer stored in the object.
    InstanceIndirectScalar,
    /// Static field at a fixed address.
    ClassScalar,
    /// Static reference field reached through a relocation-table slot.
    ClassRelocatableReference,
    /// Folded away entirely; only the constant value remains.
    CompileTimeConstant,
}

impl StorageClass {
    pub const fn is_instance(self) -> bool {
        matches!(
            self,
            StorageClass::InstanceScalar | StorageClass::InstanceIndirectScalar
        )
    }

    pub const fn is_class(self) -> bool {
        matches!(
            self,
            StorageClass::ClassScalar | StorageClass::ClassRelocatableReference
        )
    }

    pub const fn is_frame(self) -> bool {
        matches!(self, StorageClass::Local | StorageClass::Parameter)
    }
}

/// Identity of a local variable or parameter within one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// A resolved variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum VarRef {
    /// Local variable or parameter.
    Local { id: LocalId, slot: i32 },
    /// Field of the registry type `owner`.
    Field { owner: TypeHash, field: TypeHash },
}

/// Symbol record for a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBinding {
    pub name: String,
    pub data_type: DataType,
    pub storage: StorageClass,
    /// Byte offset for fields, frame slot for locals, relocation slot for
    /// relocatable statics.
    pub offset: i32,
    pub modifiers: Modifiers,
    /// Value of a compile-time constant.
    pub constant: Option<ConstValue>,
}

impl VarBinding {
    pub fn new(name: impl Into<String>, data_type: DataType, storage: StorageClass) -> Self {
        Self {
            name: name.into(),
            data_type,
            storage,
            offset: 0,
            modifiers: Modifiers::empty(),
            constant: None,
        }
    }

    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Make this a compile-time constant.
    pub fn with_constant(mut self, value: ConstValue) -> Self {
        self.storage = StorageClass::CompileTimeConstant;
        self.constant = Some(value);
        self
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static() || self.storage.is_class()
    }
}

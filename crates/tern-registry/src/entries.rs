//! Registry entries for types and their members.

use tern_core::{ConstValue, DataType, Modifiers, StorageClass, TypeHash};

/// Class or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A class or interface of the unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    /// Fully qualified name.
    pub name: String,
    pub hash: TypeHash,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// Direct superclass. `None` only for the root class and interfaces.
    pub extends: Option<TypeHash>,
    /// Directly implemented (or, for interfaces, extended) interfaces.
    pub implements: Vec<TypeHash>,
    /// Lexically enclosing type of a nested type.
    pub outer: Option<TypeHash>,
    /// Fields declared by this type, in declaration order.
    pub fields: Vec<TypeHash>,
    /// Methods and constructors declared by this type.
    pub methods: Vec<TypeHash>,
    /// Instance size in bytes including inherited fields and the header.
    pub instance_size: u32,
    /// Number of vtable slots, inherited ones included.
    pub vtable_len: u32,
}

impl TypeEntry {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.is_abstract()
    }

    /// Reference type naming this entry.
    pub fn data_type(&self) -> DataType {
        match self.kind {
            TypeKind::Class => DataType::class(self.hash),
            TypeKind::Interface => DataType::interface(self.hash),
        }
    }
}

/// A field as laid out by the layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub data_type: DataType,
    pub storage: StorageClass,
    /// Byte offset, static address slot, or relocation slot.
    pub offset: i32,
    pub modifiers: Modifiers,
    pub constant: Option<ConstValue>,
    /// Written by a declaration initializer before any constructor body runs.
    pub has_initializer: bool,
}

impl FieldEntry {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }
}

/// A method or constructor signature as laid out by the layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub name: String,
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub modifiers: Modifiers,
    pub is_constructor: bool,
    /// Vtable slot of a virtual method, or interface-map slot of an
    /// interface method. `None` for static, private and constructors.
    pub slot: Option<u32>,
}

impl MethodEntry {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract()
    }

    /// Dispatched through a table rather than called directly.
    pub fn is_virtual(&self) -> bool {
        !self.is_constructor
            && !self.modifiers.intersects(Modifiers::STATIC | Modifiers::PRIVATE)
    }

    /// Same name and parameter list.
    pub fn same_signature(&self, other: &MethodEntry) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.same_shape(b))
    }
}

//! UnitRegistry - types, fields and methods of one statically linked unit.
//!
//! The layout engine fills the registry before compilation starts; the
//! compiler only reads it. Types are stored by [`TypeHash`] with a name index,
//! and the class/interface hierarchy is kept in a `petgraph::DiGraph` with
//! edges pointing from a type to its direct supertypes.
//!
//! # Example
//!
//! ```
//! use tern_core::DataType;
//! use tern_registry::UnitRegistry;
//!
//! let mut registry = UnitRegistry::new();
//! registry.class("Object").build().unwrap();
//! let point = registry
//!     .class("Point")
//!     .extends("Object")
//!     .field("x", DataType::INT)
//!     .field("y", DataType::INT)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.ancestors(point).len(), 1);
//! assert!(registry.lookup_field(point, "y").is_some());
//! ```

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use rustc_hash::FxHashMap;

use tern_core::{BaseType, ConstValue, DataType, Modifiers, StorageClass, TypeHash};

use crate::entries::{FieldEntry, MethodEntry, TypeEntry, TypeKind};
use crate::error::RegistryError;

/// Edge kinds of the hierarchy graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEdge {
    Extends,
    Implements,
}

/// Types and members of one compilation unit.
#[derive(Debug)]
pub struct UnitRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
    by_name: FxHashMap<String, TypeHash>,
    fields: FxHashMap<TypeHash, FieldEntry>,
    methods: FxHashMap<TypeHash, MethodEntry>,

    /// Nodes are type hashes, edges point at direct supertypes.
    hierarchy: DiGraph<TypeHash, HierarchyEdge>,
    nodes: FxHashMap<TypeHash, NodeIndex>,

    throwable: Option<TypeHash>,
    string_class: Option<TypeHash>,

    pointer_bytes: u32,
    next_static: i32,
    next_reloc: i32,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::with_pointer_bytes(4)
    }
}

impl UnitRegistry {
    /// Create an empty registry for a 32-bit target.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pointer_bytes(pointer_bytes: u32) -> Self {
        Self {
            types: FxHashMap::default(),
            by_name: FxHashMap::default(),
            fields: FxHashMap::default(),
            methods: FxHashMap::default(),
            hierarchy: DiGraph::new(),
            nodes: FxHashMap::default(),
            throwable: None,
            string_class: None,
            pointer_bytes,
            next_static: 0,
            next_reloc: 0,
        }
    }

    pub fn pointer_bytes(&self) -> u32 {
        self.pointer_bytes
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Start declaring a class.
    pub fn class(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, TypeKind::Class)
    }

    /// Start declaring an interface.
    pub fn interface(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, TypeKind::Interface)
    }

    /// Register a fully formed type entry.
    ///
    /// Supertypes must already be registered.
    pub fn register_type(&mut self, entry: TypeEntry) -> Result<TypeHash, RegistryError> {
        if self.types.contains_key(&entry.hash) || self.by_name.contains_key(&entry.name) {
            return Err(RegistryError::DuplicateType(entry.name));
        }
        if entry.extends == Some(entry.hash) || entry.implements.contains(&entry.hash) {
            return Err(RegistryError::CircularInheritance(entry.name));
        }

        if let Some(base) = entry.extends {
            let base_entry = self
                .types
                .get(&base)
                .ok_or_else(|| RegistryError::TypeNotFound(base.to_string()))?;
            if entry.is_interface() || base_entry.is_interface() {
                return Err(RegistryError::InvalidSupertype {
                    name: entry.name,
                    supertype: base_entry.name.clone(),
                });
            }
        }
        for iface in &entry.implements {
            let iface_entry = self
                .types
                .get(iface)
                .ok_or_else(|| RegistryError::TypeNotFound(iface.to_string()))?;
            if !iface_entry.is_interface() {
                return Err(RegistryError::InvalidSupertype {
                    name: entry.name,
                    supertype: iface_entry.name.clone(),
                });
            }
        }

        let hash = entry.hash;
        let node = self.hierarchy.add_node(hash);
        self.nodes.insert(hash, node);
        if let Some(base) = entry.extends {
            self.hierarchy
                .add_edge(node, self.nodes[&base], HierarchyEdge::Extends);
        }
        for iface in &entry.implements {
            self.hierarchy
                .add_edge(node, self.nodes[iface], HierarchyEdge::Implements);
        }

        self.by_name.insert(entry.name.clone(), hash);
        self.types.insert(hash, entry);
        Ok(hash)
    }

    fn add_field(&mut self, entry: FieldEntry) -> Result<TypeHash, RegistryError> {
        let hash = entry.hash;
        if self.fields.contains_key(&hash) {
            return Err(RegistryError::DuplicateMember {
                owner: self.type_name(entry.owner).to_string(),
                member: entry.name,
            });
        }
        if let Some(owner) = self.types.get_mut(&entry.owner) {
            owner.fields.push(hash);
        }
        self.fields.insert(hash, entry);
        Ok(hash)
    }

    fn add_method(&mut self, entry: MethodEntry) -> Result<TypeHash, RegistryError> {
        let hash = entry.hash;
        if self.methods.contains_key(&hash) {
            return Err(RegistryError::DuplicateMember {
                owner: self.type_name(entry.owner).to_string(),
                member: entry.name,
            });
        }
        if let Some(owner) = self.types.get_mut(&entry.owner) {
            owner.methods.push(hash);
        }
        self.methods.insert(hash, entry);
        Ok(hash)
    }

    /// Designate the root of the throwable hierarchy.
    pub fn set_throwable(&mut self, name: &str) -> Result<(), RegistryError> {
        let hash = self.require(name)?;
        self.throwable = Some(hash);
        Ok(())
    }

    /// Designate the class string literals are instances of.
    pub fn set_string_class(&mut self, name: &str) -> Result<(), RegistryError> {
        let hash = self.require(name)?;
        self.string_class = Some(hash);
        Ok(())
    }

    fn require(&self, name: &str) -> Result<TypeHash, RegistryError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::TypeNotFound(name.to_string()))
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).and_then(|hash| self.types.get(hash))
    }

    pub fn field(&self, hash: TypeHash) -> Option<&FieldEntry> {
        self.fields.get(&hash)
    }

    pub fn method(&self, hash: TypeHash) -> Option<&MethodEntry> {
        self.methods.get(&hash)
    }

    /// Name of a type, or a placeholder for unknown hashes.
    pub fn type_name(&self, hash: TypeHash) -> &str {
        self.types
            .get(&hash)
            .map_or("<unknown>", |entry| entry.name.as_str())
    }

    /// Source-like spelling of a resolved type.
    pub fn display_type(&self, data_type: &DataType) -> String {
        let mut out = match data_type.base {
            BaseType::Primitive(kind) => kind.name().to_string(),
            BaseType::Class(hash) | BaseType::Interface(hash) => self.type_name(hash).to_string(),
            BaseType::Null(_) => "null".to_string(),
        };
        for _ in 0..data_type.dims {
            out.push_str("[]");
        }
        out
    }

    pub fn throwable(&self) -> Option<TypeHash> {
        self.throwable
    }

    pub fn string_class(&self) -> Option<TypeHash> {
        self.string_class
    }

    /// Lexically enclosing type of a nested type.
    pub fn enclosing(&self, hash: TypeHash) -> Option<TypeHash> {
        self.types.get(&hash).and_then(|entry| entry.outer)
    }

    // ==========================================================================
    // Hierarchy
    // ==========================================================================

    pub fn superclass(&self, hash: TypeHash) -> Option<TypeHash> {
        let node = *self.nodes.get(&hash)?;
        self.hierarchy
            .edges_directed(node, Direction::Outgoing)
            .find(|edge| *edge.weight() == HierarchyEdge::Extends)
            .map(|edge| self.hierarchy[edge.target()])
    }

    /// Superclass chain from the direct parent to the root.
    pub fn ancestors(&self, hash: TypeHash) -> Vec<TypeHash> {
        let mut chain = Vec::new();
        let mut current = hash;
        while let Some(parent) = self.superclass(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Every class and interface `hash` inherits from, excluding itself.
    pub fn supertypes(&self, hash: TypeHash) -> Vec<TypeHash> {
        let Some(&start) = self.nodes.get(&hash) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.hierarchy, start);
        let mut out = Vec::new();
        while let Some(node) = dfs.next(&self.hierarchy) {
            if node != start {
                out.push(self.hierarchy[node]);
            }
        }
        out
    }

    /// Reflexive, transitive subtype check over classes and interfaces.
    pub fn is_subtype(&self, sub: TypeHash, sup: TypeHash) -> bool {
        if sub == sup {
            return true;
        }
        match (self.nodes.get(&sub), self.nodes.get(&sup)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.hierarchy, a, b, None),
            _ => false,
        }
    }

    pub fn is_throwable(&self, hash: TypeHash) -> bool {
        self.throwable
            .is_some_and(|root| self.is_subtype(hash, root))
    }

    /// Find a field by name on `owner`, its superclasses, then its interfaces.
    pub fn lookup_field(&self, owner: TypeHash, name: &str) -> Option<&FieldEntry> {
        let own = self.declared_field(owner, name);
        if own.is_some() {
            return own;
        }
        for ancestor in self.ancestors(owner) {
            if let Some(field) = self.declared_field(ancestor, name) {
                return Some(field);
            }
        }
        self.supertypes(owner)
            .into_iter()
            .filter(|hash| self.get(*hash).is_some_and(TypeEntry::is_interface))
            .find_map(|iface| self.declared_field(iface, name))
    }

    fn declared_field(&self, owner: TypeHash, name: &str) -> Option<&FieldEntry> {
        let entry = self.types.get(&owner)?;
        entry
            .fields
            .iter()
            .filter_map(|hash| self.fields.get(hash))
            .find(|field| field.name == name)
    }

    /// Non-constructor methods named `name` declared directly on `owner`.
    pub fn declared_methods<'a, 'n>(
        &'a self,
        owner: TypeHash,
        name: &'n str,
    ) -> impl Iterator<Item = &'a MethodEntry> + use<'a, 'n> {
        self.types
            .get(&owner)
            .into_iter()
            .flat_map(|entry| entry.methods.iter())
            .filter_map(|hash| self.methods.get(hash))
            .filter(move |method| !method.is_constructor && method.name == name)
    }

    /// Constructors declared on `owner`.
    pub fn constructors(&self, owner: TypeHash) -> Vec<&MethodEntry> {
        self.types
            .get(&owner)
            .into_iter()
            .flat_map(|entry| entry.methods.iter())
            .filter_map(|hash| self.methods.get(hash))
            .filter(|method| method.is_constructor)
            .collect()
    }

    /// Whether `method` overrides `other`: same signature and a declaring type
    /// that is a proper subtype of `other`'s.
    pub fn overrides(&self, method: &MethodEntry, other: &MethodEntry) -> bool {
        method.owner != other.owner
            && method.same_signature(other)
            && self.is_subtype(method.owner, other.owner)
    }

    /// Non-static final instance fields of `owner` without an initializer.
    pub fn blank_final_fields(&self, owner: TypeHash) -> Vec<&FieldEntry> {
        self.types
            .get(&owner)
            .into_iter()
            .flat_map(|entry| entry.fields.iter())
            .filter_map(|hash| self.fields.get(hash))
            .filter(|field| field.is_final() && !field.is_static() && !field.has_initializer)
            .collect()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Find an inherited virtual slot with the same signature.
    fn inherited_slot(&self, base: Option<TypeHash>, name: &str, params: &[DataType]) -> Option<u32> {
        let base = base?;
        std::iter::once(base)
            .chain(self.ancestors(base))
            .flat_map(|owner| self.declared_methods(owner, name))
            .find(|m| {
                m.params.len() == params.len()
                    && m.params.iter().zip(params).all(|(a, b)| a.same_shape(b))
            })
            .and_then(|m| m.slot)
    }
}

struct PendingField {
    name: String,
    data_type: DataType,
    modifiers: Modifiers,
    storage: Option<StorageClass>,
    constant: Option<ConstValue>,
    has_initializer: bool,
}

struct PendingMethod {
    name: String,
    params: Vec<DataType>,
    return_type: DataType,
    modifiers: Modifiers,
    is_constructor: bool,
}

/// Fluent declaration of one type, with a default field and vtable layout.
///
/// Instance fields are packed after the superclass's fields, aligned to their
/// size; statics get sequential slots; virtual methods reuse the slot of the
/// method they override.
pub struct TypeBuilder<'r> {
    registry: &'r mut UnitRegistry,
    name: String,
    kind: TypeKind,
    modifiers: Modifiers,
    extends: Option<String>,
    implements: Vec<String>,
    outer: Option<String>,
    fields: Vec<PendingField>,
    methods: Vec<PendingMethod>,
}

impl<'r> TypeBuilder<'r> {
    fn new(registry: &'r mut UnitRegistry, name: &str, kind: TypeKind) -> Self {
        Self {
            registry,
            name: name.to_string(),
            kind,
            modifiers: Modifiers::empty(),
            extends: None,
            implements: Vec::new(),
            outer: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.extends = Some(name.to_string());
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        self.implements.push(name.to_string());
        self
    }

    /// Mark this as a nested type of `name`.
    pub fn outer(mut self, name: &str) -> Self {
        self.outer = Some(name.to_string());
        self
    }

    pub fn field(self, name: &str, data_type: DataType) -> Self {
        self.field_with(name, data_type, Modifiers::empty())
    }

    pub fn field_with(mut self, name: &str, data_type: DataType, modifiers: Modifiers) -> Self {
        self.fields.push(PendingField {
            name: name.to_string(),
            data_type,
            modifiers,
            storage: None,
            constant: None,
            has_initializer: false,
        });
        self
    }

    /// Field with a declaration initializer.
    pub fn initialized_field(mut self, name: &str, data_type: DataType, modifiers: Modifiers) -> Self {
        self = self.field_with(name, data_type, modifiers);
        if let Some(field) = self.fields.last_mut() {
            field.has_initializer = true;
        }
        self
    }

    /// Instance field reached through a pointer stored in the object.
    pub fn indirect_field(mut self, name: &str, data_type: DataType) -> Self {
        self = self.field(name, data_type);
        if let Some(field) = self.fields.last_mut() {
            field.storage = Some(StorageClass::InstanceIndirectScalar);
        }
        self
    }

    /// `static final` field folded to a constant.
    pub fn constant(mut self, name: &str, data_type: DataType, value: ConstValue) -> Self {
        self.fields.push(PendingField {
            name: name.to_string(),
            data_type,
            modifiers: Modifiers::STATIC | Modifiers::FINAL,
            storage: Some(StorageClass::CompileTimeConstant),
            constant: Some(value),
            has_initializer: true,
        });
        self
    }

    pub fn method(self, name: &str, params: &[DataType], return_type: DataType) -> Self {
        self.method_with(name, params, return_type, Modifiers::empty())
    }

    pub fn static_method(self, name: &str, params: &[DataType], return_type: DataType) -> Self {
        self.method_with(name, params, return_type, Modifiers::STATIC)
    }

    pub fn method_with(
        mut self,
        name: &str,
        params: &[DataType],
        return_type: DataType,
        modifiers: Modifiers,
    ) -> Self {
        self.methods.push(PendingMethod {
            name: name.to_string(),
            params: params.to_vec(),
            return_type,
            modifiers,
            is_constructor: false,
        });
        self
    }

    pub fn constructor(mut self, params: &[DataType]) -> Self {
        self.methods.push(PendingMethod {
            name: "<init>".to_string(),
            params: params.to_vec(),
            return_type: DataType::VOID,
            modifiers: Modifiers::empty(),
            is_constructor: true,
        });
        self
    }

    /// Register the type and lay out its members.
    pub fn build(self) -> Result<TypeHash, RegistryError> {
        let TypeBuilder {
            registry,
            name,
            kind,
            modifiers,
            extends,
            implements,
            outer,
            fields,
            methods,
        } = self;

        let extends = extends.map(|n| registry.require(&n)).transpose()?;
        let implements = implements
            .iter()
            .map(|n| registry.require(n))
            .collect::<Result<Vec<_>, _>>()?;
        let outer = outer.map(|n| registry.require(&n)).transpose()?;

        let pointer_bytes = registry.pointer_bytes;
        let (mut size, mut vtable_len) = match extends.and_then(|b| registry.get(b)) {
            Some(base) => (base.instance_size, base.vtable_len),
            None => (pointer_bytes, 0),
        };

        let hash = TypeHash::from_name(&name);
        registry.register_type(TypeEntry {
            name,
            hash,
            kind,
            modifiers,
            extends,
            implements,
            outer,
            fields: Vec::new(),
            methods: Vec::new(),
            instance_size: 0,
            vtable_len: 0,
        })?;

        for field in fields {
            let is_static = field.modifiers.is_static();
            let storage = field.storage.unwrap_or(if !is_static {
                StorageClass::InstanceScalar
            } else if field.data_type.is_reference() {
                StorageClass::ClassRelocatableReference
            } else {
                StorageClass::ClassScalar
            });
            let offset = match storage {
                StorageClass::InstanceScalar | StorageClass::InstanceIndirectScalar => {
                    let width = if storage == StorageClass::InstanceIndirectScalar {
                        pointer_bytes
                    } else {
                        field.data_type.storage_size(pointer_bytes).max(1)
                    };
                    let offset = size.div_ceil(width) * width;
                    size = offset + width;
                    offset as i32
                }
                StorageClass::ClassRelocatableReference => {
                    registry.next_reloc += 1;
                    registry.next_reloc - 1
                }
                StorageClass::ClassScalar => {
                    registry.next_static += 8;
                    registry.next_static - 8
                }
                _ => 0,
            };
            registry.add_field(FieldEntry {
                hash: TypeHash::from_field(hash, &field.name),
                name: field.name,
                owner: hash,
                data_type: field.data_type,
                storage,
                offset,
                modifiers: field.modifiers,
                constant: field.constant,
                has_initializer: field.has_initializer,
            })?;
        }

        let mut interface_slot = 0;
        for method in methods {
            let param_hashes: Vec<TypeHash> = method.params.iter().map(DataType::type_hash).collect();
            let method_hash = if method.is_constructor {
                TypeHash::from_constructor(hash, &param_hashes)
            } else {
                TypeHash::from_method(hash, &method.name, &param_hashes)
            };
            let mut modifiers = method.modifiers;
            if kind == TypeKind::Interface && !modifiers.is_static() {
                modifiers |= Modifiers::ABSTRACT;
            }
            let mut entry = MethodEntry {
                name: method.name,
                hash: method_hash,
                owner: hash,
                params: method.params,
                return_type: method.return_type,
                modifiers,
                is_constructor: method.is_constructor,
                slot: None,
            };
            if entry.is_virtual() {
                entry.slot = Some(match kind {
                    TypeKind::Interface => {
                        interface_slot += 1;
                        interface_slot - 1
                    }
                    TypeKind::Class => registry
                        .inherited_slot(extends, &entry.name, &entry.params)
                        .unwrap_or_else(|| {
                            vtable_len += 1;
                            vtable_len - 1
                        }),
                });
            }
            registry.add_method(entry)?;
        }

        if let Some(entry) = registry.types.get_mut(&hash) {
            entry.instance_size = size;
            entry.vtable_len = match kind {
                TypeKind::Class => vtable_len,
                TypeKind::Interface => interface_slot,
            };
        }
        Ok(hash)
    }
}

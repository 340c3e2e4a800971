//! CompileContext - the registry, options and target facts shared by every
//! phase of a compilation.

use tern_ast::{TypeName, TypeRef};
use tern_core::{BaseType, CompilationError, DataType, PrimitiveKind, Span, TypeHash};
use tern_registry::{MethodEntry, TypeEntry, UnitRegistry};

use crate::options::{ArchConstants, CompileOptions};

type Result<T> = std::result::Result<T, CompilationError>;

/// Read-only state threaded through resolve and code generation.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'r> {
    pub registry: &'r UnitRegistry,
    pub options: CompileOptions,
    pub arch: ArchConstants,
}

impl<'r> CompileContext<'r> {
    pub fn new(registry: &'r UnitRegistry, options: CompileOptions, arch: ArchConstants) -> Self {
        Self {
            registry,
            options,
            arch,
        }
    }

    /// Look up a type by name as seen from inside `from`.
    ///
    /// The name is tried as written, then qualified with each enclosing
    /// type of `from`, innermost first.
    pub fn lookup_type(&self, name: &str, from: TypeHash) -> Option<&'r TypeEntry> {
        let mut scope = Some(from);
        while let Some(current) = scope {
            let qualified = format!("{}.{}", self.registry.type_name(current), name);
            if let Some(entry) = self.registry.get_by_name(&qualified) {
                return Some(entry);
            }
            scope = self.registry.enclosing(current);
        }
        self.registry.get_by_name(name)
    }

    /// Resolve a written type to a [`DataType`].
    pub fn resolve_type(&self, ty: &TypeRef, from: TypeHash) -> Result<DataType> {
        let scalar = match &ty.name {
            TypeName::Primitive(kind) => {
                if *kind == PrimitiveKind::Void && ty.dims > 0 {
                    return Err(CompilationError::TypeMismatch {
                        message: "array of void".to_string(),
                        span: ty.span,
                    });
                }
                DataType::primitive(*kind)
            }
            TypeName::Named(name) => self
                .lookup_type(name, from)
                .map(TypeEntry::data_type)
                .ok_or_else(|| CompilationError::UnknownType {
                    name: name.clone(),
                    span: ty.span,
                })?,
        };
        Ok(scalar.with_dims(ty.dims).with_special(ty.special))
    }

    pub fn type_entry(&self, hash: TypeHash, span: Span) -> Result<&'r TypeEntry> {
        self.registry.get(hash).ok_or_else(|| CompilationError::UnknownType {
            name: hash.to_string(),
            span,
        })
    }

    pub fn method_entry(&self, hash: TypeHash) -> Result<&'r MethodEntry> {
        self.registry
            .method(hash)
            .ok_or_else(|| CompilationError::internal(format!("method {hash} not in registry")))
    }

    /// Source-like spelling of a type for diagnostics.
    pub fn display(&self, data_type: &DataType) -> String {
        self.registry.display_type(data_type)
    }

    /// The root class every reference converts to, if the unit has one.
    pub fn root_class(&self) -> Option<TypeHash> {
        let throwable = self.registry.throwable()?;
        self.registry.ancestors(throwable).last().copied().or(Some(throwable))
    }

    /// Whether `data_type` is the root class.
    pub fn is_root(&self, data_type: &DataType) -> bool {
        match data_type.class_hash() {
            Some(hash) => self.root_class() == Some(hash),
            None => false,
        }
    }

    pub fn is_interface(&self, hash: TypeHash) -> bool {
        self.registry.get(hash).is_some_and(TypeEntry::is_interface)
    }

    /// Reference subtyping over classes, interfaces and arrays.
    pub fn is_ref_subtype(&self, sub: &DataType, sup: &DataType) -> bool {
        if sub.same_shape(sup) {
            return true;
        }
        if sub.is_null() {
            return sup.is_reference();
        }
        if self.is_root(sup) && sub.is_reference() {
            return true;
        }
        if sub.dims != sup.dims {
            return false;
        }
        match (sub.base, sup.base) {
            (
                BaseType::Class(a) | BaseType::Interface(a),
                BaseType::Class(b) | BaseType::Interface(b),
            ) => self.registry.is_subtype(a, b),
            _ => false,
        }
    }
}

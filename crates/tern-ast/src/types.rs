//! Type expressions as written in source.

use std::fmt;

use tern_core::{ArraySpecial, PrimitiveKind, Span};

/// Base of a written type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    Primitive(PrimitiveKind),
    /// Class or interface name, possibly qualified with dots.
    Named(String),
}

/// A type as written in a declaration, cast or `new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: TypeName,
    pub dims: u8,
    /// Array sub-kind carried by an annotation on the declaration.
    pub special: ArraySpecial,
    pub span: Span,
}

impl TypeRef {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            name: TypeName::Primitive(kind),
            dims: 0,
            special: ArraySpecial::None,
            span: Span::default(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: TypeName::Named(name.into()),
            dims: 0,
            special: ArraySpecial::None,
            span: Span::default(),
        }
    }

    pub fn with_dims(mut self, dims: u8) -> Self {
        self.dims = dims;
        self
    }

    pub fn with_special(mut self, special: ArraySpecial) -> Self {
        self.special = special;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            TypeName::Primitive(kind) => write!(f, "{kind}")?,
            TypeName::Named(name) => f.write_str(name)?,
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

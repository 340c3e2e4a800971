//! Method bodies handed to the compiler.

use tern_core::{Span, TypeHash};

use crate::stmt::Block;

/// A parameter name; its type comes from the registry signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }
}

/// One method body, bound to its registry entry by hash.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub owner: TypeHash,
    pub method: TypeHash,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
    /// Frame words used by locals and temporaries, set by the resolver.
    pub frame_words: Option<u32>,
}

impl MethodDecl {
    pub fn new(owner: TypeHash, method: TypeHash, params: Vec<Param>, body: Block) -> Self {
        Self {
            owner,
            method,
            params,
            span: body.span,
            body,
            frame_words: None,
        }
    }
}

//! Syntax tree of the tern source language.
//!
//! Nodes are produced by the external parser, annotated in place by the
//! resolver, and read by the code generator. A method body owns its whole
//! tree; nodes are never freed individually.

mod annot;
pub mod build;
mod decl;
mod expr;
mod ops;
mod print;
mod stmt;
mod types;

pub use annot::*;
pub use decl::{MethodDecl, Param};
pub use expr::*;
pub use ops::{AssignOp, BinaryOp, PostfixOp, TERNARY_BINDING_POWER, UnaryOp};
pub use stmt::*;
pub use types::{TypeName, TypeRef};

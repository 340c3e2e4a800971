//! Tern: semantic resolution and code generation for an ahead-of-time
//! compiler targeting bare metal.
//!
//! The parser hands over method bodies as [`ast`] trees and the layout
//! engine a filled [`registry::UnitRegistry`]. [`compile_unit`] resolves
//! every body in place and generates its code through a [`Backend`].
//!
//! ```
//! use tern::prelude::*;
//! use tern::ast::{MethodDecl, Param, build};
//!
//! let mut registry = UnitRegistry::new();
//! registry.class("Object").build().unwrap();
//! let main = registry
//!     .class("Main")
//!     .extends("Object")
//!     .static_method("twice", &[DataType::INT], DataType::INT)
//!     .build()
//!     .unwrap();
//! let twice = TypeHash::from_method(main, "twice", &[DataType::INT.type_hash()]);
//!
//! let body = build::block_of(vec![build::ret(Some(build::bin(
//!     tern::ast::BinaryOp::Add,
//!     build::var("n"),
//!     build::var("n"),
//! )))]);
//! let mut decls = vec![MethodDecl::new(main, twice, vec![Param::new("n")], body)];
//!
//! let ctx = CompileContext::new(&registry, CompileOptions::default(), ArchConstants::ia32());
//! let unit = compile_unit(&ctx, &mut decls).unwrap();
//! assert_eq!(unit.methods.len(), 1);
//! ```

pub use tern_ast as ast;
pub use tern_compiler as compiler;
pub use tern_core as core;
pub use tern_registry as registry;

pub use tern_compiler::{
    ArchConstants, Backend, CompileContext, CompileOptions, CompiledMethod, CompiledUnit,
    Instr, InstrStream, compile_unit,
};
pub use tern_core::{CompilationError, Diagnostics};

pub mod prelude {
    pub use tern_compiler::emit::backend::{Addr, Callee, Cond, Label, Reg, Runtime};
    pub use tern_compiler::{
        ArchConstants, Backend, CompileContext, CompileOptions, CompiledUnit, Instr,
        InstrStream, StringTable, compile_unit, generate_method, resolve_method,
    };
    pub use tern_core::{
        CompilationError, ConstValue, DataType, Diagnostics, ErrorCategory, FlowResult,
        PrimitiveKind, RegClass, Span, TypeHash, Warning, WarningKind,
    };
    pub use tern_registry::UnitRegistry;
}

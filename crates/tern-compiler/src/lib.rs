//! Tern Compiler
//!
//! Semantic resolution and code generation for method bodies of a unit
//! whose layout is already fixed.
//!
//! ## Architecture
//!
//! - **Resolve**: annotate the parsed tree in place with types, storage,
//!   inserted conversions, folded constants and flow results, checking
//!   definite assignment and reachability on the way
//! - **Generate**: walk the annotated tree once and drive an abstract
//!   register machine through the [`Backend`] trait
//!
//! ## Modules
//!
//! - [`context`]: registry, options and target facts shared by both phases
//! - [`conversion`]: implicit conversions and casts
//! - [`driver`]: compile every method of a unit, collecting diagnostics
//! - [`emit`]: code generator, register protocol, jump and throw frames
//! - [`flow`]: definite-assignment states
//! - [`fold`]: constant folding with target arithmetic
//! - [`overload`]: overload resolution for calls
//! - [`resolve`]: the resolver
//! - [`scope`]: locals and frame slots

pub mod context;
pub mod conversion;
pub mod driver;
pub mod emit;
pub mod flow;
pub mod fold;
pub mod options;
pub mod overload;
pub mod resolve;
pub mod scope;

pub use context::CompileContext;
pub use conversion::{find_cast, find_conversion};
pub use driver::{CompiledMethod, CompiledUnit, compile_unit};
pub use emit::backend::{Addr, Backend, Callee, Cond, Label, Reg, Runtime};
pub use emit::stream::{Instr, InstrStream};
pub use emit::strings::StringTable;
pub use emit::{EmitError, Emitter, generate_method};
pub use options::{ArchConstants, CompileOptions};
pub use overload::resolve_overload;
pub use resolve::resolve_method;

// Re-export CompilationError from core for convenience
pub use tern_core::CompilationError;

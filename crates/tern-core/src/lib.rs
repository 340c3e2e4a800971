//! Shared vocabulary of the tern compiler: spans, identities, types,
//! constants, bindings, flow bits and diagnostics.

mod binding;
mod constant;
mod data_type;
mod diagnostics;
mod error;
mod flow;
mod modifiers;
mod primitive_kind;
mod span;
pub mod type_hash;

pub use binding::{LocalId, StorageClass, VarBinding, VarRef};
pub use constant::ConstValue;
pub use data_type::{ArraySpecial, BaseType, DataType, NullKind, RegClass};
pub use diagnostics::Diagnostics;
pub use error::{CompilationError, ErrorCategory, Warning, WarningKind};
pub use flow::{FlowResult, WriteState};
pub use modifiers::Modifiers;
pub use primitive_kind::PrimitiveKind;
pub use span::Span;
pub use type_hash::TypeHash;

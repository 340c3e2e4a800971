//! The unit registry: every class, interface, field and method of the
//! statically linked program, as laid out by the layout engine.

mod entries;
mod error;
mod registry;

pub use entries::{FieldEntry, MethodEntry, TypeEntry, TypeKind};
pub use error::RegistryError;
pub use registry::{HierarchyEdge, TypeBuilder, UnitRegistry};

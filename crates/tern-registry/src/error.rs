use thiserror::Error;

/// Errors raised while filling the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A referenced type was not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A member with the same signature already exists on the type.
    #[error("duplicate member '{member}' in '{owner}'")]
    DuplicateMember { owner: String, member: String },

    /// The hierarchy would contain a cycle.
    #[error("circular inheritance for '{0}'")]
    CircularInheritance(String),

    /// A class extends an interface or implements a class.
    #[error("invalid supertype '{supertype}' for '{name}'")]
    InvalidSupertype { name: String, supertype: String },
}

//! Compilation errors and warnings.
//!
//! ## Error taxonomy
//!
//! ```text
//! CompilationError
//! ├── type errors     - bad operands, failed or ambiguous overloads, bad l-values
//! ├── flow errors     - unwritten reads, unreachable catches, duplicate cases
//! └── Internal        - compiler bugs, never caused by user input
//! ```
//!
//! Type and flow errors abandon the current method only. An internal error
//! aborts the whole unit.

use std::fmt;

use thiserror::Error;

use crate::Span;

/// Broad category of a [`CompilationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Type,
    Flow,
    Internal,
}

/// Errors raised while resolving or generating one method.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    // ------------------------------------------------------------------
    // Type errors
    // ------------------------------------------------------------------
    /// A referenced type could not be found.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    /// A referenced variable could not be found.
    #[error("at {span}: unknown variable '{name}'")]
    UnknownVariable { name: String, span: Span },

    /// A field does not exist on the given type.
    #[error("at {span}: type '{type_name}' has no field '{field}'")]
    UnknownField {
        type_name: String,
        field: String,
        span: Span,
    },

    /// No method of that name exists on the given type or its ancestors.
    #[error("at {span}: type '{type_name}' has no method '{method}'")]
    UnknownMethod {
        type_name: String,
        method: String,
        span: Span,
    },

    /// Operand or assignment types are incompatible.
    #[error("at {span}: {message}")]
    TypeMismatch { message: String, span: Span },

    /// An operator or construct is not valid here.
    #[error("at {span}: {message}")]
    InvalidOperation { message: String, span: Span },

    /// An explicit cast between unrelated types.
    #[error("at {span}: cannot cast '{from}' to '{to}'")]
    InvalidCast { from: String, to: String, span: Span },

    /// No candidate accepts the given arguments.
    #[error("at {span}: no matching overload for '{name}({args})'")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    /// Several candidates are equally good.
    #[error("at {span}: ambiguous call to '{name}': {candidates}")]
    AmbiguousOverload {
        name: String,
        candidates: String,
        span: Span,
    },

    /// The left side of an assignment is not addressable.
    #[error("at {span}: expression is not assignable")]
    NotAnLvalue { span: Span },

    /// Write to a final variable outside its initializing context.
    #[error("at {span}: cannot assign to final variable '{name}'")]
    CannotModifyFinal { name: String, span: Span },

    /// Instance member used where no `this` exists.
    #[error("at {span}: cannot use instance member '{name}' from a static context")]
    StaticContext { name: String, span: Span },

    /// `new` on an abstract class or interface.
    #[error("at {span}: cannot instantiate abstract type '{name}'")]
    AbstractInstantiation { name: String, span: Span },

    /// Integral division or remainder by a constant zero.
    #[error("at {span}: division by zero")]
    DivisionByZero { span: Span },

    /// Constant index outside a fixed array bound.
    #[error("at {span}: index {index} out of bounds for length {bound}")]
    IndexOutOfBounds { index: i64, bound: u32, span: Span },

    /// Expression or statement nesting exceeds the configured limit.
    #[error("at {span}: expression nested too deeply (limit {limit})")]
    NestingTooDeep { limit: usize, span: Span },

    /// A variable was redeclared in the same scope.
    #[error("at {new_span}: variable '{name}' redeclared (originally declared at {original_span})")]
    VariableRedeclaration {
        name: String,
        original_span: Span,
        new_span: Span,
    },

    /// `break` or `continue` outside a matching statement.
    #[error("at {span}: '{keyword}' outside of loop or switch")]
    InvalidJump { keyword: &'static str, span: Span },

    /// A generic compilation error.
    #[error("at {span}: {message}")]
    Other { message: String, span: Span },

    // ------------------------------------------------------------------
    // Flow errors
    // ------------------------------------------------------------------
    /// Read of a variable that may not have been written.
    #[error("at {span}: variable '{name}' might not have been initialized")]
    UnassignedRead { name: String, span: Span },

    /// A catch clause shadowed by an earlier supertype clause.
    #[error("at {span}: unreachable catch: '{caught}' is already caught by '{earlier}'")]
    UnreachableCatch {
        caught: String,
        earlier: String,
        span: Span,
    },

    /// Two case labels of one switch share a value.
    #[error("at {span}: case constant already used: {value}")]
    DuplicateCase { value: String, span: Span },

    /// Statement after one that never completes.
    #[error("at {span}: unreachable statement")]
    UnreachableStatement { span: Span },

    /// A `finally` block that never completes normally.
    #[error("at {span}: finally block cannot complete normally")]
    FinallyCannotComplete { span: Span },

    /// A non-void method can fall off its end.
    #[error("at {span}: method '{method}' is missing a return statement")]
    MissingReturn { method: String, span: Span },

    /// A final field not written by the end of a constructor.
    #[error("at {span}: final field '{name}' might not have been initialized")]
    FinalNotWritten { name: String, span: Span },

    /// A final variable written when it may already hold a value.
    #[error("at {span}: final variable '{name}' might already have been assigned")]
    FinalAlreadyWritten { name: String, span: Span },

    // ------------------------------------------------------------------
    // Compiler bugs
    // ------------------------------------------------------------------
    /// Internal invariant violated.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownType { span, .. } => *span,
            CompilationError::UnknownVariable { span, .. } => *span,
            CompilationError::UnknownField { span, .. } => *span,
            CompilationError::UnknownMethod { span, .. } => *span,
            CompilationError::TypeMismatch { span, .. } => *span,
            CompilationError::InvalidOperation { span, .. } => *span,
            CompilationError::InvalidCast { span, .. } => *span,
            CompilationError::NoMatchingOverload { span, .. } => *span,
            CompilationError::AmbiguousOverload { span, .. } => *span,
            CompilationError::NotAnLvalue { span } => *span,
            CompilationError::CannotModifyFinal { span, .. } => *span,
            CompilationError::StaticContext { span, .. } => *span,
            CompilationError::AbstractInstantiation { span, .. } => *span,
            CompilationError::DivisionByZero { span } => *span,
            CompilationError::IndexOutOfBounds { span, .. } => *span,
            CompilationError::NestingTooDeep { span, .. } => *span,
            CompilationError::VariableRedeclaration { new_span, .. } => *new_span,
            CompilationError::InvalidJump { span, .. } => *span,
            CompilationError::Other { span, .. } => *span,
            CompilationError::UnassignedRead { span, .. } => *span,
            CompilationError::UnreachableCatch { span, .. } => *span,
            CompilationError::DuplicateCase { span, .. } => *span,
            CompilationError::UnreachableStatement { span } => *span,
            CompilationError::FinallyCannotComplete { span } => *span,
            CompilationError::MissingReturn { span, .. } => *span,
            CompilationError::FinalNotWritten { span, .. } => *span,
            CompilationError::FinalAlreadyWritten { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CompilationError::UnassignedRead { .. }
            | CompilationError::UnreachableCatch { .. }
            | CompilationError::DuplicateCase { .. }
            | CompilationError::UnreachableStatement { .. }
            | CompilationError::FinallyCannotComplete { .. }
            | CompilationError::MissingReturn { .. }
            | CompilationError::FinalNotWritten { .. }
            | CompilationError::FinalAlreadyWritten { .. } => ErrorCategory::Flow,
            CompilationError::Internal { .. } => ErrorCategory::Internal,
            _ => ErrorCategory::Type,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CompilationError::Internal { .. })
    }

    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

/// Kind of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A constant lost bits in a narrowing conversion.
    ValueTruncated,
    /// A static member reached through an instance or subclass receiver.
    StaticViaInstance,
    /// An expression statement without observable effect.
    NoEffect,
}

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Span,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: warning: {}", self.span, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span() {
        let err = CompilationError::DuplicateCase {
            value: "3".to_string(),
            span: Span::new(4, 9, 1),
        };
        assert_eq!(err.to_string(), "at 4:9: case constant already used: 3");
        assert_eq!(err.span(), Span::new(4, 9, 1));
    }

    #[test]
    fn categories() {
        assert_eq!(
            CompilationError::DivisionByZero { span: Span::default() }.category(),
            ErrorCategory::Type
        );
        assert_eq!(
            CompilationError::UnreachableStatement { span: Span::default() }.category(),
            ErrorCategory::Flow
        );
        let bug = CompilationError::internal("register leak");
        assert!(bug.is_internal());
        assert_eq!(bug.to_string(), "internal compiler error: register leak");
    }
}

//! Semantic resolution of method bodies.
//!
//! The [`Resolver`] walks a [`MethodDecl`] once, top-down, and annotates every
//! node in place:
//! - expressions get their [`ExprInfo`] (type, folded constant, effect), and
//!   implicit conversions become explicit [`ConvertExpr`] nodes
//! - names are bound to locals, fields and call targets
//! - statements get their [`FlowResult`], with definite assignment tracked in
//!   a [`WriteStates`] copied and joined along the way
//!
//! After a successful resolve the code generator needs no further lookups.
//!
//! # Example
//!
//! ```ignore
//! let mut resolver = Resolver::new(&ctx, &mut decl)?;
//! resolver.resolve_body(&mut decl)?;
//! let diagnostics = resolver.into_diagnostics();
//! ```

pub(crate) mod expr;
pub(crate) mod stmt;

use bitflags::bitflags;
use tern_ast::{Conversion, ConvertExpr, Expr, ExprInfo, ExprKind, MethodDecl};
use tern_core::{
    CompilationError, ConstValue, DataType, Diagnostics, PrimitiveKind, Span, TypeHash, Warning,
    WarningKind,
};
use tern_registry::{FieldEntry, MethodEntry};

use crate::context::CompileContext;
use crate::conversion::{converted_type, find_conversion};
use crate::flow::{JumpFlow, VarKey, WriteStates};
use crate::fold;
use crate::scope::LocalScope;

type Result<T> = std::result::Result<T, CompilationError>;

bitflags! {
    /// How the value of an expression is used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResolveFlags: u8 {
        /// The value is read: locals must be definitely written.
        const READ = 1 << 0;
        /// The node is the target of an assignment.
        const WRITE = 1 << 1;
        /// The value is discarded by an expression statement.
        const STATEMENT = 1 << 2;
    }
}

/// Resolves one method body.
pub struct Resolver<'r> {
    pub(crate) ctx: CompileContext<'r>,
    /// Type declaring the method.
    owner: TypeHash,
    method: &'r MethodEntry,
    scope: LocalScope,
    flow: WriteStates,
    /// Open loops and switches, innermost last.
    jumps: Vec<JumpFlow>,
    loop_depth: u32,
    depth: usize,
    /// Final fields a constructor has to write.
    blank_finals: Vec<&'r FieldEntry>,
    diagnostics: Diagnostics,
}

impl<'r> Resolver<'r> {
    /// Set up a resolver for `decl` and declare its parameters.
    pub fn new(ctx: &CompileContext<'r>, decl: &MethodDecl) -> Result<Self> {
        let method = ctx.method_entry(decl.method)?;
        if method.params.len() != decl.params.len() {
            return Err(CompilationError::Other {
                message: format!(
                    "method '{}' declares {} parameters but its signature has {}",
                    method.name,
                    decl.params.len(),
                    method.params.len()
                ),
                span: decl.span,
            });
        }

        let blank_finals = if method.is_constructor {
            ctx.registry.blank_final_fields(decl.owner)
        } else {
            Vec::new()
        };

        let mut resolver = Self {
            ctx: *ctx,
            owner: decl.owner,
            method,
            scope: LocalScope::new(),
            flow: WriteStates::new(),
            jumps: Vec::new(),
            loop_depth: 0,
            depth: 0,
            blank_finals,
            diagnostics: Diagnostics::new(),
        };

        for (param, ty) in decl.params.iter().zip(&method.params) {
            let words = resolver.ctx.arch.words_for(ty);
            let slot = resolver.scope.declare_param(&param.name, *ty, words, param.span)?;
            resolver.flow.write(VarKey::Local(slot.id));
        }
        Ok(resolver)
    }

    /// Resolve the body of `decl` and record its frame size.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_body(&mut self, decl: &mut MethodDecl) -> Result<()> {
        tracing::debug!(method = %self.method.name, "resolving");
        let flow = self.resolve_block(&mut decl.body)?;

        if flow.completes_normally() {
            if !self.method.return_type.is_void() && !self.method.is_constructor {
                return Err(CompilationError::MissingReturn {
                    method: self.method.name.clone(),
                    span: decl.body.span,
                });
            }
            self.check_finals_written(decl.body.span)?;
        }

        decl.frame_words = Some(self.scope.frame_words());
        Ok(())
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(crate) fn warn(&mut self, kind: WarningKind, message: impl Into<String>, span: Span) {
        let warning = Warning::new(kind, message, span);
        tracing::trace!(%warning, "warning recorded");
        self.diagnostics.warn(warning);
    }

    /// Count one level of AST nesting.
    fn enter(&mut self, span: Span) -> Result<()> {
        let limit = self.ctx.options.max_nesting_depth;
        if self.depth >= limit {
            return Err(CompilationError::NestingTooDeep { limit, span });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn is_static(&self) -> bool {
        self.method.is_static()
    }

    fn is_constructor(&self) -> bool {
        self.method.is_constructor
    }

    fn display(&self, data_type: &DataType) -> String {
        self.ctx.display(data_type)
    }

    /// Make `expr` usable where a `target` is expected.
    ///
    /// With `narrow_constants`, a numeric constant may also narrow; a value
    /// that does not survive the narrowing is truncated with a warning.
    pub(crate) fn coerce(&mut self, expr: &mut Expr, target: &DataType, narrow_constants: bool) -> Result<()> {
        let source = expr_type(expr)?;
        if let Some(conversion) = find_conversion(&self.ctx, &source, target) {
            if conversion != Conversion::Identity {
                wrap_conversion(expr, conversion, converted_type(&conversion, &source, target));
            }
            return Ok(());
        }

        if narrow_constants
            && let (Some(from), Some(to)) = (source.as_primitive(), target.as_primitive())
            && from.is_numeric()
            && to.is_numeric()
            && let Some(value) = expr.constant()
        {
            if !fold::is_exact(value, to) {
                let truncated = fold::convert(value, to).unwrap_or(value);
                self.warn(
                    WarningKind::ValueTruncated,
                    format!("constant {value} truncated to {truncated} in conversion to {to}"),
                    expr.span,
                );
            }
            wrap_conversion(expr, Conversion::Primitive { from, to }, *target);
            return Ok(());
        }

        Err(CompilationError::TypeMismatch {
            message: format!(
                "cannot convert '{}' to '{}'",
                self.display(&source),
                self.display(target)
            ),
            span: expr.span,
        })
    }

    /// Apply unary numeric promotion. Returns the promoted kind, or `None`
    /// for non-numeric operands.
    pub(crate) fn promote(&mut self, expr: &mut Expr) -> Result<Option<PrimitiveKind>> {
        let ty = expr_type(expr)?;
        let Some(kind) = ty.as_primitive().filter(|kind| kind.is_numeric()) else {
            return Ok(None);
        };
        let promoted = kind.promoted();
        if promoted != kind {
            wrap_conversion(
                expr,
                Conversion::Primitive {
                    from: kind,
                    to: promoted,
                },
                DataType::primitive(promoted),
            );
        }
        Ok(Some(promoted))
    }

    // =========================================================================
    // Flow helpers
    // =========================================================================

    /// Check that the blank final fields are written before the constructor
    /// returns.
    fn check_finals_written(&self, span: Span) -> Result<()> {
        if !self.flow.is_alive() {
            return Ok(());
        }
        for field in &self.blank_finals {
            if !self.flow.get(VarKey::Field(field.hash)).is_definite() {
                return Err(CompilationError::FinalNotWritten {
                    name: field.name.clone(),
                    span,
                });
            }
        }
        Ok(())
    }

    /// Whether `field` is a blank final this constructor initializes.
    fn is_tracked_final(&self, field: &FieldEntry) -> bool {
        self.blank_finals.iter().any(|f| f.hash == field.hash)
    }
}

/// Resolve one method body, returning the warnings it produced.
pub fn resolve_method(ctx: &CompileContext<'_>, decl: &mut MethodDecl) -> Result<Diagnostics> {
    let mut resolver = Resolver::new(ctx, decl)?;
    resolver.resolve_body(decl)?;
    Ok(resolver.into_diagnostics())
}

/// Resolved type of a visited node.
pub(crate) fn expr_type(expr: &Expr) -> Result<DataType> {
    expr.data_type()
        .ok_or_else(|| CompilationError::internal(format!("unresolved expression at {}", expr.span)))
}

/// Replace `expr` by a conversion node producing `data_type`.
pub(crate) fn wrap_conversion(expr: &mut Expr, conversion: Conversion, data_type: DataType) {
    let span = expr.span;
    let constant = expr
        .constant()
        .and_then(|value| fold_conversion(value, &conversion));
    let effect = expr.has_effect();
    let operand = std::mem::replace(expr, Expr::new(ExprKind::This, span));
    *expr = Expr {
        kind: ExprKind::Convert(ConvertExpr {
            operand: Box::new(operand),
            conversion,
        }),
        span,
        info: Some(ExprInfo {
            data_type,
            constant,
            effect,
        }),
    };
}

/// Value of a constant after `conversion`.
pub(crate) fn fold_conversion(value: ConstValue, conversion: &Conversion) -> Option<ConstValue> {
    match conversion {
        Conversion::Identity | Conversion::NullRetype(_) => Some(value),
        Conversion::Primitive { to, .. } => fold::convert(value, *to),
        _ => None,
    }
}

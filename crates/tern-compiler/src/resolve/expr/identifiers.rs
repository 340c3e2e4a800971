//! Simple names, `this`, and the field bindings they share with `a.b`.

use tern_ast::{ExprInfo, ExprKind, Receiver, ResolvedVar, VarExpr};
use tern_core::{CompilationError, DataType, Span, StorageClass, VarRef};
use tern_registry::FieldEntry;

use super::Result;
use crate::flow::VarKey;
use crate::resolve::{ResolveFlags, Resolver};

/// How a field was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FieldAccess {
    /// Bare name or `this.f`: the current object.
    This,
    /// Bare name found on a lexically enclosing type.
    Enclosing,
    /// Any other object reference.
    Object,
    /// `Type.f`, or a static field however it was written.
    Static,
}

pub(super) fn resolve_this(resolver: &mut Resolver<'_>, span: Span) -> Result<ExprInfo> {
    if resolver.is_static() {
        return Err(CompilationError::StaticContext {
            name: "this".to_string(),
            span,
        });
    }
    Ok(ExprInfo::value(DataType::class(resolver.owner)))
}

pub(super) fn resolve_var(
    resolver: &mut Resolver<'_>,
    var: &mut VarExpr,
    span: Span,
    flags: ResolveFlags,
) -> Result<ExprInfo> {
    if let Some(local) = resolver.scope.get(&var.name) {
        if flags.contains(ResolveFlags::READ) && !resolver.flow.is_definite(VarKey::Local(local.slot.id)) {
            return Err(CompilationError::UnassignedRead {
                name: var.name.clone(),
                span,
            });
        }
        var.resolved = Some(ResolvedVar::local(local.slot, local.storage));
        return Ok(ExprInfo::value(local.data_type));
    }

    let Some((field, access)) = resolver.lookup_implicit_field(&var.name) else {
        return Err(CompilationError::UnknownVariable {
            name: var.name.clone(),
            span,
        });
    };
    let (resolved, info) = resolver.bind_field(field, access, span, flags)?;
    var.resolved = Some(resolved);
    Ok(info)
}

impl<'r> Resolver<'r> {
    /// Find a field named by a bare identifier: the current type's hierarchy
    /// first, then the enclosing types.
    pub(super) fn lookup_implicit_field(&self, name: &str) -> Option<(&'r FieldEntry, FieldAccess)> {
        let registry = self.ctx.registry;
        if let Some(field) = registry.lookup_field(self.owner, name) {
            return Some((field, FieldAccess::This));
        }
        let mut outer = registry.enclosing(self.owner);
        while let Some(scope) = outer {
            if let Some(field) = registry.lookup_field(scope, name) {
                return Some((field, FieldAccess::Enclosing));
            }
            outer = registry.enclosing(scope);
        }
        None
    }

    /// Bind a field reference and type it.
    pub(super) fn bind_field(
        &mut self,
        field: &'r FieldEntry,
        access: FieldAccess,
        span: Span,
        flags: ResolveFlags,
    ) -> Result<(ResolvedVar, ExprInfo)> {
        let resolved = ResolvedVar {
            var: VarRef::Field {
                owner: field.owner,
                field: field.hash,
            },
            storage: field.storage,
            offset: field.offset,
            implicit_this: !field.is_static()
                && matches!(access, FieldAccess::This | FieldAccess::Enclosing),
        };

        if field.storage == StorageClass::CompileTimeConstant {
            let value = field.constant.ok_or_else(|| {
                CompilationError::internal(format!("constant field '{}' has no value", field.name))
            })?;
            return Ok((resolved, ExprInfo::constant(field.data_type, value)));
        }

        if !field.is_static() {
            let no_this = match access {
                FieldAccess::This => self.is_static(),
                FieldAccess::Enclosing | FieldAccess::Static => true,
                FieldAccess::Object => false,
            };
            if no_this {
                return Err(CompilationError::StaticContext {
                    name: field.name.clone(),
                    span,
                });
            }
        }

        if access == FieldAccess::This
            && flags.contains(ResolveFlags::READ)
            && self.is_tracked_final(field)
            && !self.flow.is_definite(VarKey::Field(field.hash))
        {
            return Err(CompilationError::UnassignedRead {
                name: field.name.clone(),
                span,
            });
        }

        Ok((resolved, ExprInfo::value(field.data_type)))
    }

    /// A receiver written as a bare name that is neither a variable nor a
    /// field but names a type is a static receiver.
    pub(super) fn rewrite_type_receiver(&self, receiver: &mut Receiver) {
        let Receiver::Expr(expr) = receiver else {
            return;
        };
        let ExprKind::Var(var) = &expr.kind else {
            return;
        };
        if var.resolved.is_none()
            && self.scope.get(&var.name).is_none()
            && self.lookup_implicit_field(&var.name).is_none()
            && self.ctx.lookup_type(&var.name, self.owner).is_some()
        {
            *receiver = Receiver::TypeName(var.name.clone());
        }
    }
}

//! Simple and compound assignment, and the write bookkeeping shared with
//! `++`/`--`.

use tern_ast::{AssignExpr, BinaryOp, Conversion, DerefTarget, Expr, ExprInfo, ExprKind, Receiver, ResolvedVar};
use tern_core::{CompilationError, ConstValue, DataType, PrimitiveKind, Span, StorageClass, VarRef};
use tern_registry::FieldEntry;

use super::Result;
use crate::flow::VarKey;
use crate::resolve::{ResolveFlags, Resolver, wrap_conversion};

pub(super) fn resolve_assign(resolver: &mut Resolver<'_>, assign: &mut AssignExpr, span: Span) -> Result<ExprInfo> {
    let Some(op) = assign.op.binary_op() else {
        return resolve_simple(resolver, assign);
    };

    let target = resolver.resolve_expr(&mut assign.target, ResolveFlags::READ | ResolveFlags::WRITE, None)?;
    if !assign.target.is_lvalue_shape() {
        return Err(CompilationError::NotAnLvalue {
            span: assign.target.span,
        });
    }
    let value = resolver.resolve_expr(&mut assign.value, ResolveFlags::READ, None)?;
    let op_type = compound_type(resolver, assign, op, &target.data_type, &value.data_type, span)?;

    if op.is_division()
        && op_type.is_integral()
        && assign.value.constant().is_some_and(ConstValue::is_integral_zero)
    {
        return Err(CompilationError::DivisionByZero {
            span: assign.value.span,
        });
    }

    resolver.record_write(&assign.target)?;
    assign.op_type = Some(op_type);
    Ok(ExprInfo::value(target.data_type).with_effect())
}

fn resolve_simple(resolver: &mut Resolver<'_>, assign: &mut AssignExpr) -> Result<ExprInfo> {
    let target = resolver.resolve_expr(&mut assign.target, ResolveFlags::WRITE, None)?;
    if !assign.target.is_lvalue_shape() {
        return Err(CompilationError::NotAnLvalue {
            span: assign.target.span,
        });
    }
    resolver.resolve_expr(&mut assign.value, ResolveFlags::READ, Some(&target.data_type))?;
    resolver.coerce(&mut assign.value, &target.data_type, true)?;
    resolver.record_write(&assign.target)?;
    Ok(ExprInfo::value(target.data_type).with_effect())
}

/// Type the operation of `a op= b` is carried out in. The value is converted
/// to it; the result is converted back to the target's type on store.
fn compound_type(
    resolver: &mut Resolver<'_>,
    assign: &mut AssignExpr,
    op: BinaryOp,
    target: &DataType,
    value: &DataType,
    span: Span,
) -> Result<DataType> {
    let symbol = assign.op;
    let mismatch = |resolver: &Resolver<'_>| CompilationError::InvalidOperation {
        message: format!(
            "operator '{symbol}' cannot be applied to '{}' and '{}'",
            resolver.display(target),
            resolver.display(value)
        ),
        span,
    };

    if target.is_bool() && value.is_bool() && op.is_bitwise() {
        return Ok(DataType::BOOL);
    }
    let (Some(tk), Some(vk)) = (target.as_primitive(), value.as_primitive()) else {
        return Err(mismatch(resolver));
    };
    if !tk.is_numeric() || !vk.is_numeric() {
        return Err(mismatch(resolver));
    }

    if op.is_shift() {
        let count = resolver.promote(&mut assign.value)?.unwrap_or(vk);
        if !tk.is_integral() || !count.is_integral() {
            return Err(mismatch(resolver));
        }
        if count == PrimitiveKind::Long {
            wrap_conversion(
                &mut assign.value,
                Conversion::Primitive {
                    from: PrimitiveKind::Long,
                    to: PrimitiveKind::Int,
                },
                DataType::INT,
            );
        }
        return Ok(DataType::primitive(tk.promoted()));
    }

    let left = tk.promoted();
    let right = vk.promoted();
    let kind = if right.widens_to(left) { left } else { right };
    if op.is_bitwise() && !kind.is_integral() {
        return Err(mismatch(resolver));
    }
    let op_type = DataType::primitive(kind);
    resolver.coerce(&mut assign.value, &op_type, false)?;
    Ok(op_type)
}

impl<'r> Resolver<'r> {
    /// Record a store to `target`, enforcing final-variable rules.
    pub(crate) fn record_write(&mut self, target: &Expr) -> Result<()> {
        let target = target.unparenthesized();
        let span = target.span;
        match &target.kind {
            ExprKind::Var(var) => match &var.resolved {
                Some(ResolvedVar {
                    var: VarRef::Local { id, .. },
                    ..
                }) => {
                    let id = *id;
                    if let Some(local) = self.scope.get(&var.name)
                        && local.is_final
                    {
                        let written = !self.flow.get(VarKey::Local(id)).is_unwritten();
                        if written || self.loop_depth > local.loop_depth {
                            return Err(CompilationError::FinalAlreadyWritten {
                                name: var.name.clone(),
                                span,
                            });
                        }
                    }
                    self.flow.write(VarKey::Local(id));
                    Ok(())
                }
                Some(resolved @ ResolvedVar { var: VarRef::Field { .. }, .. }) => {
                    let via_this = resolved.implicit_this;
                    self.record_field_write(resolved, via_this, span)
                }
                None => Err(CompilationError::internal(format!("unbound variable '{}'", var.name))),
            },
            ExprKind::Deref(deref) => match &deref.resolved {
                Some(DerefTarget::Field(resolved)) => {
                    let via_this = matches!(
                        &deref.receiver,
                        Receiver::Expr(object) if matches!(object.unparenthesized().kind, ExprKind::This)
                    );
                    self.record_field_write(resolved, via_this, span)
                }
                _ => Err(CompilationError::NotAnLvalue { span }),
            },
            ExprKind::Index(_) => Ok(()),
            _ => Err(CompilationError::NotAnLvalue { span }),
        }
    }

    fn record_field_write(&mut self, resolved: &ResolvedVar, via_this: bool, span: Span) -> Result<()> {
        let VarRef::Field { field, .. } = resolved.var else {
            return Ok(());
        };
        let entry: &'r FieldEntry = self
            .ctx
            .registry
            .field(field)
            .ok_or_else(|| CompilationError::internal(format!("unknown field {field}")))?;

        if entry.storage != StorageClass::CompileTimeConstant && !entry.is_final() {
            return Ok(());
        }
        if via_this && self.is_tracked_final(entry) {
            let written = !self.flow.get(VarKey::Field(entry.hash)).is_unwritten();
            if written || self.loop_depth > 0 {
                return Err(CompilationError::FinalAlreadyWritten {
                    name: entry.name.clone(),
                    span,
                });
            }
            self.flow.write(VarKey::Field(entry.hash));
            return Ok(());
        }
        Err(CompilationError::CannotModifyFinal {
            name: entry.name.clone(),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::{AssignOp, ExprKind, build};
    use tern_core::{CompilationError, DataType, WarningKind};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn constants_narrow_on_assignment() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let target = build::field(build::new_object("Box", vec![build::int(1)]), "buf");
        let mut e = build::assign(build::index(target, build::int(0)), build::int(300));
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(r.diagnostics().has_warning(WarningKind::ValueTruncated));

        let target = build::field(build::new_object("Box", vec![build::int(1)]), "buf");
        let mut e = build::assign(build::index(target, build::int(0)), build::var("n"));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn compound_assignment_type() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::compound(AssignOp::AddAssign, build::var("n"), build::double(0.5));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
        let ExprKind::Assign(assign) = &e.kind else { unreachable!() };
        assert_eq!(assign.op_type, Some(DataType::DOUBLE));

        let mut e = build::compound(AssignOp::DivAssign, build::var("n"), build::int(0));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::DivisionByZero { .. }));
    }

    #[test]
    fn finals_outside_constructors() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let target = build::field(build::new_object("Box", vec![build::int(1)]), "height");
        let mut e = build::assign(target, build::int(2));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::CannotModifyFinal { .. }));

        let mut e = build::assign(build::static_field("Box", "SIZE"), build::int(2));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::CannotModifyFinal { .. }));
    }

    #[test]
    fn constructor_writes_blank_final_once() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = ctor_resolver(&ctx);

        let mut read = build::var("height");
        let err = r.resolve_expr(&mut read, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::UnassignedRead { .. }));

        let mut e = build::assign(build::var("height"), build::var("w"));
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        let mut read = build::field(build::this(), "height");
        r.resolve_expr(&mut read, ResolveFlags::READ, None).unwrap();

        let mut e = build::assign(build::field(build::this(), "height"), build::int(0));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::FinalAlreadyWritten { .. }));
    }
}

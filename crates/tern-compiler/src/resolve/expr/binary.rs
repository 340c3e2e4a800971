//! Binary operators: arithmetic, bitwise, shifts, comparisons and the
//! short-circuit `&&` / `||`.

use tern_ast::{BinaryExpr, BinaryOp, Conversion, Expr, ExprInfo};
use tern_core::{CompilationError, ConstValue, DataType, PrimitiveKind, Span};

use super::Result;
use crate::conversion::find_cast;
use crate::fold;
use crate::resolve::{ResolveFlags, Resolver, expr_type, wrap_conversion};

pub(super) fn resolve_binary(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<ExprInfo> {
    if bin.op.is_short_circuit() {
        return resolve_short_circuit(resolver, bin);
    }

    let left = resolver.resolve_expr(&mut bin.left, ResolveFlags::READ, None)?;
    let preferred = left.data_type.is_reference().then_some(left.data_type);
    let right = resolver.resolve_expr(&mut bin.right, ResolveFlags::READ, preferred.as_ref())?;
    let effect = left.effect || right.effect;

    // constants go to the right, where the generator can use immediates
    if left.is_constant()
        && !right.is_constant()
        && let Some(mirrored) = bin.op.mirrored()
    {
        std::mem::swap(&mut bin.left, &mut bin.right);
        bin.op = mirrored;
    }

    let info = if bin.op.is_comparison() {
        resolve_comparison(resolver, bin, span)?
    } else if bin.op.is_shift() {
        resolve_shift(resolver, bin, span)?
    } else {
        resolve_arithmetic(resolver, bin, span)?
    };
    Ok(ExprInfo { effect, ..info })
}

fn resolve_short_circuit(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr) -> Result<ExprInfo> {
    // the value that decides the result without evaluating the right side
    let short = bin.op == BinaryOp::LogicalOr;

    let left = resolver.resolve_condition(&mut bin.left)?;
    let after_left = resolver.flow.clone();
    let right = resolver.resolve_condition(&mut bin.right)?;

    resolver.flow = match left {
        Some(value) if value == short => after_left,
        Some(_) => resolver.flow.clone(),
        None => after_left.join(&resolver.flow),
    };

    let constant = match (left, right) {
        (Some(l), Some(r)) => fold::fold_binary(bin.op, PrimitiveKind::Bool, ConstValue::Bool(l), ConstValue::Bool(r)),
        (Some(l), None) if l == short => Some(ConstValue::Bool(short)),
        _ => None,
    };
    let effect = bin.left.has_effect() || bin.right.has_effect();
    Ok(ExprInfo {
        data_type: DataType::BOOL,
        constant,
        effect,
    })
}

fn resolve_comparison(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<ExprInfo> {
    let left = expr_type(&bin.left)?;
    let right = expr_type(&bin.right)?;

    if left.is_bool() && right.is_bool() {
        if !bin.op.is_equality() {
            return Err(invalid_operands(resolver, bin.op, &left, &right, span));
        }
        return Ok(fold_result(bin, PrimitiveKind::Bool, DataType::BOOL));
    }

    if left.is_reference() && right.is_reference() {
        if !bin.op.is_equality() {
            return Err(invalid_operands(resolver, bin.op, &left, &right, span));
        }
        resolve_reference_equality(resolver, bin, span)?;
        let constant = match (bin.left.constant(), bin.right.constant()) {
            (Some(ConstValue::Null), Some(ConstValue::Null)) => {
                Some(ConstValue::Bool(bin.op == BinaryOp::Equal))
            }
            _ => None,
        };
        return Ok(ExprInfo {
            constant,
            ..ExprInfo::value(DataType::BOOL)
        });
    }

    let kind = unify_numeric(resolver, bin, span)?;
    Ok(fold_result(bin, kind, DataType::BOOL))
}

/// Bring both sides of `==`/`!=` on references to a comparable pointer kind.
fn resolve_reference_equality(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<()> {
    let left = expr_type(&bin.left)?;
    let right = expr_type(&bin.right)?;

    match (left.is_null(), right.is_null()) {
        (true, true) => return Ok(()),
        (true, false) => return resolver.coerce(&mut bin.left, &right, false),
        (false, true) => return resolver.coerce(&mut bin.right, &left, false),
        (false, false) => {}
    }

    let ctx = resolver.ctx;
    if find_cast(&ctx, &left, &right).is_none() && find_cast(&ctx, &right, &left).is_none() {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "incomparable types '{}' and '{}'",
                resolver.display(&left),
                resolver.display(&right)
            ),
            span,
        });
    }

    // mixed pointer widths compare as plain object pointers
    let same_interface = left.is_interface_ref() && left.object_hash() == right.object_hash();
    if (left.is_interface_ref() || right.is_interface_ref()) && !same_interface {
        let root = resolver.root_type(span)?;
        for side in [&mut bin.left, &mut bin.right] {
            if expr_type(side)?.is_interface_ref() {
                wrap_conversion(side, Conversion::InterfaceToObject, root);
            }
        }
    }
    Ok(())
}

fn resolve_shift(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<ExprInfo> {
    let left = resolver.promote(&mut bin.left)?;
    let right = resolver.promote(&mut bin.right)?;
    let (Some(kind), Some(count)) = (left, right) else {
        return Err(invalid_operands_of(resolver, bin, span)?);
    };
    if !kind.is_integral() || !count.is_integral() {
        return Err(invalid_operands_of(resolver, bin, span)?);
    }
    if count == PrimitiveKind::Long {
        wrap_conversion(
            &mut bin.right,
            Conversion::Primitive {
                from: PrimitiveKind::Long,
                to: PrimitiveKind::Int,
            },
            DataType::INT,
        );
    }
    Ok(fold_result(bin, kind, DataType::primitive(kind)))
}

fn resolve_arithmetic(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<ExprInfo> {
    let left = expr_type(&bin.left)?;
    let right = expr_type(&bin.right)?;

    if bin.op.is_bitwise() && left.is_bool() && right.is_bool() {
        return Ok(fold_result(bin, PrimitiveKind::Bool, DataType::BOOL));
    }

    let kind = unify_numeric(resolver, bin, span)?;
    if bin.op.is_bitwise() && !kind.is_integral() {
        return Err(invalid_operands(resolver, bin.op, &left, &right, span));
    }
    if bin.op.is_division()
        && kind.is_integral()
        && bin.right.constant().is_some_and(ConstValue::is_integral_zero)
    {
        return Err(CompilationError::DivisionByZero { span: bin.right.span });
    }
    Ok(fold_result(bin, kind, DataType::primitive(kind)))
}

/// Bring both numeric operands to one kind.
///
/// After promotion, a constant operand is retyped to the other side's kind
/// when its value survives unchanged; otherwise differing kinds need a cast.
fn unify_numeric(resolver: &mut Resolver<'_>, bin: &mut BinaryExpr, span: Span) -> Result<PrimitiveKind> {
    let left = resolver.promote(&mut bin.left)?;
    let right = resolver.promote(&mut bin.right)?;
    let (Some(lk), Some(rk)) = (left, right) else {
        return Err(invalid_operands_of(resolver, bin, span)?);
    };
    if lk == rk {
        return Ok(lk);
    }

    let lc = bin.left.constant();
    let rc = bin.right.constant();
    let target = if lc.is_some() && lk.widens_to(rk) {
        Some((Side::Left, rk))
    } else if rc.is_some() && rk.widens_to(lk) {
        Some((Side::Right, lk))
    } else if rc.is_some_and(|value| fold::is_exact(value, lk)) {
        Some((Side::Right, lk))
    } else if lc.is_some_and(|value| fold::is_exact(value, rk)) {
        Some((Side::Left, rk))
    } else {
        None
    };

    let Some((side, kind)) = target else {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "operand types '{lk}' and '{rk}' differ; an explicit cast is required"
            ),
            span,
        });
    };
    let (expr, from): (&mut Expr, PrimitiveKind) = match side {
        Side::Left => (&mut bin.left, lk),
        Side::Right => (&mut bin.right, rk),
    };
    wrap_conversion(expr, Conversion::Primitive { from, to: kind }, DataType::primitive(kind));
    Ok(kind)
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

fn fold_result(bin: &BinaryExpr, kind: PrimitiveKind, data_type: DataType) -> ExprInfo {
    let constant = match (bin.left.constant(), bin.right.constant()) {
        (Some(l), Some(r)) => fold::fold_binary(bin.op, kind, l, r),
        _ => None,
    };
    ExprInfo {
        constant,
        ..ExprInfo::value(data_type)
    }
}

fn invalid_operands(
    resolver: &Resolver<'_>,
    op: BinaryOp,
    left: &DataType,
    right: &DataType,
    span: Span,
) -> CompilationError {
    CompilationError::InvalidOperation {
        message: format!(
            "operator '{op}' cannot be applied to '{}' and '{}'",
            resolver.display(left),
            resolver.display(right)
        ),
        span,
    }
}

fn invalid_operands_of(resolver: &Resolver<'_>, bin: &BinaryExpr, span: Span) -> Result<CompilationError> {
    Ok(invalid_operands(
        resolver,
        bin.op,
        &expr_type(&bin.left)?,
        &expr_type(&bin.right)?,
        span,
    ))
}

#[cfg(test)]
mod tests {
    use tern_ast::{BinaryOp, ExprKind, build};
    use tern_core::{CompilationError, ConstValue, DataType};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn folds_int_arithmetic() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(
            BinaryOp::Add,
            build::int(i32::MAX),
            build::bin(BinaryOp::Mul, build::int(2), build::int(3)),
        );
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
        assert_eq!(info.constant, Some(ConstValue::Int(i32::MAX.wrapping_add(6))));
    }

    #[test]
    fn constant_left_moves_right() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::Less, build::int(3), build::var("n"));
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        let ExprKind::Binary(bin) = &e.kind else { unreachable!() };
        assert_eq!(bin.op, BinaryOp::Greater);
        assert!(matches!(bin.left.kind, ExprKind::Var(_)));
        assert!(bin.right.is_constant());
    }

    #[test]
    fn small_constants_join_the_wider_side() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::Add, build::var("n"), build::long(5));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        // 5L fits an int, so the sum stays int
        assert_eq!(info.data_type, DataType::INT);

        let mut e = build::bin(BinaryOp::Add, build::int(1), build::long(1 << 40));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::LONG);
        assert_eq!(info.constant, Some(ConstValue::Long((1 << 40) + 1)));

        let mut e = build::bin(BinaryOp::Add, build::var("n"), build::long(1 << 40));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn mixed_variables_need_a_cast() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(
            BinaryOp::Add,
            build::var("n"),
            build::field(build::new_object("Plain", vec![]), "v"),
        );
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn constant_division_by_zero() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::Mod, build::var("n"), build::int(0));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::DivisionByZero { .. }));

        // floating point division by zero is well defined
        let mut e = build::bin(BinaryOp::Div, build::double(1.0), build::double(0.0));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::from_f64(f64::INFINITY)));
    }

    #[test]
    fn short_circuit_folding() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let lhs = build::bin(BinaryOp::Greater, build::var("n"), build::int(0));
        let mut e = build::or(build::boolean(true), lhs);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::Bool(true)));

        let lhs = build::bin(BinaryOp::Greater, build::var("n"), build::int(0));
        let mut e = build::and(build::boolean(true), lhs);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(!info.is_constant());
    }

    #[test]
    fn shifts_keep_the_left_kind() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::ShiftLeft, build::var("n"), build::long(33));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);

        let mut e = build::bin(BinaryOp::ShiftLeft, build::int(1), build::int(33));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::Int(2)));
    }

    #[test]
    fn reference_comparison() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::Equal, build::new_object("Box", vec![build::int(1)]), build::null());
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::BOOL);

        let mut e = build::bin(BinaryOp::Less, build::this(), build::this());
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));

        let mut e = build::bin(
            BinaryOp::Equal,
            build::new_object("Plain", vec![]),
            build::new_object("Box", vec![build::int(1)]),
        );
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn bool_bitwise() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(BinaryOp::BitwiseXor, build::boolean(true), build::boolean(true));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::Bool(false)));
    }
}

//! Prefix and postfix operators.

use tern_ast::{Expr, ExprInfo, PostfixExpr, UnaryExpr, UnaryOp};
use tern_core::{CompilationError, DataType, PrimitiveKind, Span};

use super::Result;
use crate::fold;
use crate::resolve::{ResolveFlags, Resolver};

pub(super) fn resolve_unary(resolver: &mut Resolver<'_>, un: &mut UnaryExpr, span: Span) -> Result<ExprInfo> {
    if un.op.is_update() {
        return resolve_update(resolver, &mut un.operand, &un.op.to_string(), span);
    }

    let operand = resolver.resolve_expr(&mut un.operand, ResolveFlags::READ, None)?;
    let data_type = match un.op {
        UnaryOp::LogicalNot => {
            if !operand.data_type.is_bool() {
                return Err(invalid_operand(resolver, un.op, &operand.data_type, span));
            }
            DataType::BOOL
        }
        _ => {
            let kind = resolver
                .promote(&mut un.operand)?
                .ok_or_else(|| invalid_operand(resolver, un.op, &operand.data_type, span))?;
            if un.op == UnaryOp::BitwiseNot && !kind.is_integral() {
                return Err(invalid_operand(resolver, un.op, &operand.data_type, span));
            }
            DataType::primitive(kind)
        }
    };

    Ok(ExprInfo {
        data_type,
        constant: un.operand.constant().and_then(|value| fold::fold_unary(un.op, value)),
        effect: operand.effect,
    })
}

pub(super) fn resolve_postfix(resolver: &mut Resolver<'_>, post: &mut PostfixExpr, span: Span) -> Result<ExprInfo> {
    resolve_update(resolver, &mut post.operand, &post.op.to_string(), span)
}

/// `++`/`--` in either position: read and written, numeric, never constant.
fn resolve_update(resolver: &mut Resolver<'_>, operand: &mut Expr, op: &str, span: Span) -> Result<ExprInfo> {
    let info = resolver.resolve_expr(operand, ResolveFlags::READ | ResolveFlags::WRITE, None)?;
    if !operand.is_lvalue_shape() {
        return Err(CompilationError::NotAnLvalue { span: operand.span });
    }
    let numeric = info
        .data_type
        .as_primitive()
        .is_some_and(PrimitiveKind::is_numeric);
    if !numeric {
        return Err(CompilationError::InvalidOperation {
            message: format!(
                "operator '{op}' cannot be applied to '{}'",
                resolver.display(&info.data_type)
            ),
            span,
        });
    }
    resolver.record_write(operand)?;
    Ok(ExprInfo::value(info.data_type).with_effect())
}

fn invalid_operand(resolver: &Resolver<'_>, op: UnaryOp, data_type: &DataType, span: Span) -> CompilationError {
    CompilationError::InvalidOperation {
        message: format!(
            "operator '{op}' cannot be applied to '{}'",
            resolver.display(data_type)
        ),
        span,
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::{PostfixOp, UnaryOp, build};
    use tern_core::{CompilationError, ConstValue, DataType};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn negation_folds() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::neg(build::char_lit('a'));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
        assert_eq!(info.constant, Some(ConstValue::Int(-97)));

        let mut e = build::unary(UnaryOp::BitwiseNot, build::long(0));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::Long(-1)));
    }

    #[test]
    fn operand_kinds() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::not(build::var("n"));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));

        let mut e = build::unary(UnaryOp::BitwiseNot, build::double(1.0));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }

    #[test]
    fn increments_need_a_variable() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::postfix(PostfixOp::PostInc, build::var("n"));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(info.effect);
        assert!(!info.is_constant());

        let mut e = build::unary(UnaryOp::PreDec, build::int(3));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::NotAnLvalue { .. }));
    }
}

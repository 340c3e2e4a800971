//! Explicit casts, resolver-inserted conversions and `instanceof`.

use tern_ast::{CastExpr, Conversion, ConvertExpr, ExprInfo, InstanceOfExpr};
use tern_core::{CompilationError, DataType, Span};

use super::Result;
use crate::conversion::{converted_type, find_cast};
use crate::resolve::{ResolveFlags, Resolver, fold_conversion, wrap_conversion};

pub(super) fn resolve_cast(resolver: &mut Resolver<'_>, cast: &mut CastExpr, span: Span) -> Result<ExprInfo> {
    let target = resolver.ctx.resolve_type(&cast.ty, resolver.owner)?;
    let operand = resolver.resolve_expr(&mut cast.operand, ResolveFlags::READ, Some(&target))?;
    let source = operand.data_type;

    let Some(plan) = find_cast(&resolver.ctx, &source, &target) else {
        return Err(CompilationError::InvalidCast {
            from: resolver.display(&source),
            to: resolver.display(&target),
            span,
        });
    };

    // a two-step plan goes through the root class first
    let (last, first) = match plan.as_slice() {
        [only] => (*only, None),
        [first, last] => (*last, Some(*first)),
        _ => return Err(CompilationError::internal(format!("cast plan of {} steps", plan.len()))),
    };
    if let Some(first) = first {
        let root = resolver.root_type(span)?;
        wrap_conversion(&mut cast.operand, first, root);
    }
    cast.conversion = Some(last);

    let constant = cast.operand.constant().and_then(|value| fold_conversion(value, &last));
    Ok(ExprInfo {
        data_type: converted_type(&last, &source, &target),
        constant,
        effect: operand.effect,
    })
}

/// A conversion node from an earlier pass keeps the type it was given.
pub(super) fn resolve_convert(
    resolver: &mut Resolver<'_>,
    convert: &mut ConvertExpr,
    previous: Option<ExprInfo>,
    span: Span,
) -> Result<ExprInfo> {
    let Some(previous) = previous else {
        return Err(CompilationError::internal(format!("conversion node without a type at {span}")));
    };
    let operand = resolver.resolve_expr(&mut convert.operand, ResolveFlags::READ, None)?;
    Ok(ExprInfo {
        data_type: previous.data_type,
        constant: operand
            .constant
            .and_then(|value| fold_conversion(value, &convert.conversion)),
        effect: operand.effect,
    })
}

pub(super) fn resolve_instance_of(
    resolver: &mut Resolver<'_>,
    test: &mut InstanceOfExpr,
    span: Span,
) -> Result<ExprInfo> {
    let target = resolver.ctx.resolve_type(&test.ty, resolver.owner)?;
    let operand = resolver.resolve_expr(&mut test.operand, ResolveFlags::READ, None)?;
    let source = operand.data_type;

    if !source.is_reference() || !target.is_reference() || target.is_null() {
        return Err(CompilationError::InvalidOperation {
            message: format!(
                "instanceof needs reference types, found '{}' and '{}'",
                resolver.display(&source),
                resolver.display(&target)
            ),
            span,
        });
    }
    if find_cast(&resolver.ctx, &source, &target).is_none() {
        return Err(CompilationError::InvalidCast {
            from: resolver.display(&source),
            to: resolver.display(&target),
            span,
        });
    }
    if source.is_interface_ref() {
        let root = resolver.root_type(span)?;
        wrap_conversion(&mut test.operand, Conversion::InterfaceToObject, root);
    }

    test.resolved = Some(target);
    Ok(ExprInfo {
        effect: operand.effect,
        ..ExprInfo::value(DataType::BOOL)
    })
}

#[cfg(test)]
mod tests {
    use tern_ast::{Conversion, ExprKind, build};
    use tern_core::{CompilationError, ConstValue, DataType, PrimitiveKind, TypeHash};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn numeric_casts_fold() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::cast(build::prim(PrimitiveKind::Byte), build::int(300));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::BYTE);
        assert_eq!(info.constant, Some(ConstValue::Int(44)));

        let mut e = build::cast(build::prim(PrimitiveKind::Int), build::double(-2.9));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.constant, Some(ConstValue::Int(-2)));
    }

    #[test]
    fn interface_to_class_goes_through_the_root() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let shape = build::cast(build::named("Shape"), build::new_object("Box", vec![build::int(1)]));
        let mut e = build::cast(build::named("Box"), shape);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::class(TypeHash::from_name("Box")));

        let ExprKind::Cast(cast) = &e.kind else { unreachable!() };
        assert_eq!(
            cast.conversion,
            Some(Conversion::Downcast {
                target: TypeHash::from_name("Box")
            })
        );
        let ExprKind::Convert(first) = &cast.operand.kind else { unreachable!() };
        assert_eq!(first.conversion, Conversion::InterfaceToObject);
    }

    #[test]
    fn impossible_casts() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::cast(build::named("Box"), build::int(1));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidCast { .. }));
    }

    #[test]
    fn instance_of() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::instance_of(build::this(), build::named("Object"));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::BOOL);

        let mut e = build::instance_of(build::var("n"), build::named("Object"));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }

    #[test]
    fn inserted_conversions_survive_a_second_pass() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::bin(tern_ast::BinaryOp::Add, build::var("n"), build::char_lit('a'));
        let first = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        let second = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(first, second);
    }
}

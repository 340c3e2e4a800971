//! Memory and address intrinsics: `rmem`, `wmem`, `addr`, `cast2Ref` and
//! `cast2Addr`.

use tern_ast::{Conversion, ExprInfo, Intrinsic, IntrinsicExpr};
use tern_core::{CompilationError, DataType, PrimitiveKind, Span};

use super::Result;
use crate::resolve::{ResolveFlags, Resolver, wrap_conversion};

pub(super) fn resolve_intrinsic(
    resolver: &mut Resolver<'_>,
    call: &mut IntrinsicExpr,
    span: Span,
) -> Result<ExprInfo> {
    let name = call.intrinsic.name();
    if call.args.len() != call.intrinsic.arity() {
        return Err(CompilationError::InvalidOperation {
            message: format!(
                "'{name}' takes {} argument(s), found {}",
                call.intrinsic.arity(),
                call.args.len()
            ),
            span,
        });
    }
    let address = resolver.ctx.arch.address_type();

    match &call.intrinsic {
        Intrinsic::ReadMem(kind) => {
            let kind = memory_kind(*kind, name, span)?;
            resolve_address(resolver, call, address)?;
            Ok(ExprInfo::value(DataType::primitive(kind)).with_effect())
        }
        Intrinsic::WriteMem(kind) => {
            let value_type = DataType::primitive(memory_kind(*kind, name, span)?);
            resolve_address(resolver, call, address)?;
            let value = &mut call.args[1];
            resolver.resolve_expr(value, ResolveFlags::READ, Some(&value_type))?;
            resolver.coerce(value, &value_type, true)?;
            Ok(ExprInfo::value(DataType::VOID).with_effect())
        }
        Intrinsic::AddressOf => {
            let operand = &mut call.args[0];
            let info = resolver.resolve_expr(operand, ResolveFlags::empty(), None)?;
            if !operand.is_lvalue_shape() {
                return Err(CompilationError::InvalidOperation {
                    message: format!("'{name}' needs a variable, field or array element"),
                    span: operand.span,
                });
            }
            Ok(ExprInfo {
                effect: info.effect,
                ..ExprInfo::value(address)
            })
        }
        Intrinsic::CastToRef(ty) => {
            let target = resolver.ctx.resolve_type(ty, resolver.owner)?;
            if !target.is_reference() || target.is_null() {
                return Err(CompilationError::InvalidOperation {
                    message: format!("'{name}' needs a reference type, found '{}'", resolver.display(&target)),
                    span,
                });
            }
            let info = resolve_address(resolver, call, address)?;
            Ok(ExprInfo {
                effect: info.effect,
                ..ExprInfo::value(target)
            })
        }
        Intrinsic::RefToAddress => {
            let operand = &mut call.args[0];
            let info = resolver.resolve_expr(operand, ResolveFlags::READ, None)?;
            if !info.data_type.is_reference() || info.data_type.is_null() {
                return Err(CompilationError::InvalidOperation {
                    message: format!(
                        "'{name}' needs a reference, found '{}'",
                        resolver.display(&info.data_type)
                    ),
                    span,
                });
            }
            if info.data_type.is_interface_ref() {
                let root = resolver.root_type(span)?;
                wrap_conversion(operand, Conversion::InterfaceToObject, root);
            }
            Ok(ExprInfo {
                effect: info.effect,
                ..ExprInfo::value(address)
            })
        }
    }
}

/// Resolve the first argument as an address.
fn resolve_address(resolver: &mut Resolver<'_>, call: &mut IntrinsicExpr, address: DataType) -> Result<ExprInfo> {
    let arg = &mut call.args[0];
    let info = resolver.resolve_expr(arg, ResolveFlags::READ, Some(&address))?;
    resolver.coerce(arg, &address, true)?;
    Ok(info)
}

fn memory_kind(kind: PrimitiveKind, name: &str, span: Span) -> Result<PrimitiveKind> {
    if kind == PrimitiveKind::Void {
        return Err(CompilationError::InvalidOperation {
            message: format!("'{name}' cannot access a void value"),
            span,
        });
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use tern_ast::{Intrinsic, build};
    use tern_core::{CompilationError, DataType, PrimitiveKind, TypeHash};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn read_and_write_memory() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::intrinsic(Intrinsic::ReadMem(PrimitiveKind::Short), vec![build::int(0xB800)]);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::SHORT);
        assert!(info.effect);

        let mut e = build::intrinsic(
            Intrinsic::WriteMem(PrimitiveKind::Byte),
            vec![build::int(0xB800), build::int(65)],
        );
        let info = r
            .resolve_expr(&mut e, ResolveFlags::READ | ResolveFlags::STATEMENT, None)
            .unwrap();
        assert!(info.data_type.is_void());

        // wmem has no value
        let mut e = build::intrinsic(
            Intrinsic::WriteMem(PrimitiveKind::Byte),
            vec![build::int(0xB800), build::int(65)],
        );
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn arity_is_checked() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::intrinsic(Intrinsic::ReadMem(PrimitiveKind::Int), vec![]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }

    #[test]
    fn address_conversions() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let address = ctx.arch.address_type();

        let mut e = build::intrinsic(Intrinsic::AddressOf, vec![build::var("n")]);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, address);

        let mut e = build::intrinsic(Intrinsic::CastToRef(build::named("Box")), vec![build::int(0x1000)]);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::class(TypeHash::from_name("Box")));

        let mut e = build::intrinsic(Intrinsic::RefToAddress, vec![build::this()]);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, address);

        let mut e = build::intrinsic(Intrinsic::AddressOf, vec![build::int(1)]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }
}

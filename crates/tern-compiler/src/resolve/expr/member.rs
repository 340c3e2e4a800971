//! Field dereference (`a.b`) and array indexing.

use tern_ast::{DerefExpr, DerefTarget, ExprInfo, IndexExpr, Receiver};
use tern_core::{ArraySpecial, CompilationError, ConstValue, DataType, PrimitiveKind, Span, TypeHash, WarningKind};

use super::Result;
use super::identifiers::FieldAccess;
use crate::resolve::{ResolveFlags, Resolver};

pub(super) fn resolve_deref(
    resolver: &mut Resolver<'_>,
    deref: &mut DerefExpr,
    span: Span,
    flags: ResolveFlags,
) -> Result<ExprInfo> {
    resolver.rewrite_type_receiver(&mut deref.receiver);
    let registry = resolver.ctx.registry;

    match &mut deref.receiver {
        Receiver::Implicit => {
            let Some((field, access)) = resolver.lookup_implicit_field(&deref.name) else {
                return Err(CompilationError::UnknownVariable {
                    name: deref.name.clone(),
                    span,
                });
            };
            let (resolved, info) = resolver.bind_field(field, access, span, flags)?;
            if field.is_static() {
                deref.receiver = Receiver::Static(field.owner);
            }
            deref.resolved = Some(DerefTarget::Field(resolved));
            Ok(info)
        }
        Receiver::Super => {
            if resolver.is_static() {
                return Err(CompilationError::StaticContext {
                    name: "super".to_string(),
                    span,
                });
            }
            let base = registry.superclass(resolver.owner).ok_or_else(|| CompilationError::InvalidOperation {
                message: format!("'{}' has no superclass", registry.type_name(resolver.owner)),
                span,
            })?;
            let field = registry
                .lookup_field(base, &deref.name)
                .ok_or_else(|| unknown_field(resolver, base, &deref.name, span))?;
            let (resolved, info) = resolver.bind_field(field, FieldAccess::This, span, flags)?;
            if field.is_static() {
                deref.receiver = Receiver::Static(field.owner);
            }
            deref.resolved = Some(DerefTarget::Field(resolved));
            Ok(info)
        }
        Receiver::TypeName(name) => {
            let entry = resolver
                .ctx
                .lookup_type(name, resolver.owner)
                .ok_or_else(|| CompilationError::UnknownType {
                    name: name.clone(),
                    span,
                })?;
            resolve_static_field(resolver, deref, entry.hash, span, flags)
        }
        Receiver::Static(owner) => {
            let owner = *owner;
            resolve_static_field(resolver, deref, owner, span, flags)
        }
        Receiver::Expr(object) => {
            let object_info = resolver.resolve_expr(object, ResolveFlags::READ, None)?;
            let object_type = object_info.data_type;

            if object_type.is_array() {
                if deref.name != "length" {
                    return Err(CompilationError::UnknownField {
                        type_name: resolver.display(&object_type),
                        field: deref.name.clone(),
                        span,
                    });
                }
                deref.resolved = Some(DerefTarget::ArrayLength);
                return Ok(match object_type.special {
                    ArraySpecial::Inline(bound) if !object_info.effect => {
                        ExprInfo::constant(DataType::INT, ConstValue::Int(bound as i32))
                    }
                    _ => ExprInfo {
                        effect: object_info.effect,
                        ..ExprInfo::value(DataType::INT)
                    },
                });
            }

            let Some(hash) = object_type.object_hash() else {
                return Err(CompilationError::InvalidOperation {
                    message: format!("cannot dereference a value of type '{}'", resolver.display(&object_type)),
                    span,
                });
            };
            let field = registry
                .lookup_field(hash, &deref.name)
                .ok_or_else(|| unknown_field(resolver, hash, &deref.name, span))?;

            if field.is_static() {
                resolver.warn(
                    WarningKind::StaticViaInstance,
                    format!(
                        "static field '{}.{}' accessed through an instance",
                        registry.type_name(field.owner),
                        field.name
                    ),
                    span,
                );
                let (resolved, info) = resolver.bind_field(field, FieldAccess::Static, span, flags)?;
                deref.resolved = Some(DerefTarget::Field(resolved));
                if !object_info.effect {
                    deref.receiver = Receiver::Static(field.owner);
                    return Ok(info);
                }
                // the instance is still evaluated, so the access is no longer a constant
                return Ok(ExprInfo {
                    constant: None,
                    effect: true,
                    ..info
                });
            }

            let access = if matches!(object.unparenthesized().kind, tern_ast::ExprKind::This) {
                FieldAccess::This
            } else {
                FieldAccess::Object
            };
            let (mut resolved, info) = resolver.bind_field(field, access, span, flags)?;
            // the receiver is evaluated explicitly even for `this.f`
            resolved.implicit_this = false;
            deref.resolved = Some(DerefTarget::Field(resolved));
            Ok(ExprInfo {
                effect: object_info.effect,
                ..info
            })
        }
    }
}

fn resolve_static_field(
    resolver: &mut Resolver<'_>,
    deref: &mut DerefExpr,
    owner: TypeHash,
    span: Span,
    flags: ResolveFlags,
) -> Result<ExprInfo> {
    let registry = resolver.ctx.registry;
    let field = registry
        .lookup_field(owner, &deref.name)
        .ok_or_else(|| unknown_field(resolver, owner, &deref.name, span))?;
    if field.owner != owner && !matches!(deref.receiver, Receiver::Static(_)) {
        resolver.warn(
            WarningKind::StaticViaInstance,
            format!(
                "static field '{}.{}' accessed through subclass '{}'",
                registry.type_name(field.owner),
                field.name,
                registry.type_name(owner)
            ),
            span,
        );
    }
    let (resolved, info) = resolver.bind_field(field, FieldAccess::Static, span, flags)?;
    deref.receiver = Receiver::Static(field.owner);
    deref.resolved = Some(DerefTarget::Field(resolved));
    Ok(info)
}

fn unknown_field(resolver: &Resolver<'_>, owner: TypeHash, name: &str, span: Span) -> CompilationError {
    CompilationError::UnknownField {
        type_name: resolver.ctx.registry.type_name(owner).to_string(),
        field: name.to_string(),
        span,
    }
}

pub(super) fn resolve_index(resolver: &mut Resolver<'_>, index: &mut IndexExpr, span: Span) -> Result<ExprInfo> {
    let array = resolver.resolve_expr(&mut index.array, ResolveFlags::READ, None)?;
    let Some(element) = array.data_type.element() else {
        return Err(CompilationError::InvalidOperation {
            message: format!("cannot index a value of type '{}'", resolver.display(&array.data_type)),
            span,
        });
    };

    let position = resolver.resolve_expr(&mut index.index, ResolveFlags::READ, None)?;
    if resolver.promote(&mut index.index)? != Some(PrimitiveKind::Int) {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "array index must be an int, found '{}'",
                resolver.display(&position.data_type)
            ),
            span: index.index.span,
        });
    }

    if let Some(ConstValue::Int(i)) = index.index.constant() {
        match array.data_type.special {
            ArraySpecial::Inline(bound) if i < 0 || i as u32 >= bound => {
                return Err(CompilationError::IndexOutOfBounds {
                    index: i as i64,
                    bound,
                    span: index.index.span,
                });
            }
            _ if i < 0 => {
                return Err(CompilationError::InvalidOperation {
                    message: format!("negative array index {i}"),
                    span: index.index.span,
                });
            }
            _ => {}
        }
    }

    Ok(ExprInfo {
        effect: array.effect || position.effect,
        ..ExprInfo::value(element)
    })
}

#[cfg(test)]
mod tests {
    use tern_ast::{ExprKind, build};
    use tern_core::{DataType, StorageClass, WarningKind};

    use super::*;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn field_of_new_object() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::field(build::new_object("Box", vec![build::int(1)]), "width");
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
        assert!(info.effect);
        let ExprKind::Deref(deref) = &e.kind else { unreachable!() };
        let Some(DerefTarget::Field(var)) = &deref.resolved else { unreachable!() };
        assert_eq!(var.storage, StorageClass::InstanceScalar);
        assert!(!var.implicit_this);
    }

    #[test]
    fn inline_array_length_is_constant() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let boxed = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::field(build::field(boxed, "buf"), "length");
        // the receiver is a call, so the length still has to be loaded
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(!info.is_constant());
    }

    #[test]
    fn static_field_through_instance_warns() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let pure = build::cast(build::named("Box"), build::null());
        let mut e = build::field(pure, "count");
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(r.diagnostics().has_warning(WarningKind::StaticViaInstance));
        let ExprKind::Deref(deref) = &e.kind else { unreachable!() };
        assert_eq!(deref.receiver, Receiver::Static(TypeHash::from_name("Box")));
    }

    #[test]
    fn static_field_keeps_an_effectful_instance() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::field(build::new_object("Box", vec![build::int(1)]), "count");
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(info.effect);
        let ExprKind::Deref(deref) = &e.kind else { unreachable!() };
        assert!(matches!(deref.receiver, Receiver::Expr(_)));

        // a constant read through a call is not folded
        let made = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::field(made, "SIZE");
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(!info.is_constant());
        assert!(info.effect);

        // and resolving again leaves it as it was
        let once = e.clone();
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(e, once);
    }

    #[test]
    fn static_field_through_subclass_warns() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::static_field("Big", "count");
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(r.diagnostics().has_warning(WarningKind::StaticViaInstance));
    }

    #[test]
    fn constant_index_against_fixed_bound() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let boxed = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::index(build::field(boxed, "buf"), build::int(4));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::IndexOutOfBounds { index: 4, bound: 4, .. }));
    }

    #[test]
    fn index_must_be_int() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let boxed = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::index(build::field(boxed, "data"), build::long(1));
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));

        // small ints are promoted
        let boxed = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::index(build::field(boxed, "data"), build::char_lit('a'));
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
    }
}

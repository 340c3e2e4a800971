//! Method calls and object/array creation.

use tern_ast::{CallExpr, CallTarget, Conversion, Dispatch, Expr, ExprInfo, ExprKind, NewExpr, Receiver};
use tern_core::{CompilationError, ConstValue, DataType, PrimitiveKind, Span, TypeHash, WarningKind};
use tern_registry::MethodEntry;

use super::Result;
use crate::context::CompileContext;
use crate::conversion::converted_type;
use crate::overload::{OverloadMatch, collect_candidates, resolve_overload};
use crate::resolve::{ResolveFlags, Resolver, expr_type, wrap_conversion};

/// How an instance method is reached from a receiver of its own type.
pub(crate) fn instance_dispatch(ctx: &CompileContext<'_>, method: &MethodEntry) -> Dispatch {
    if ctx.is_interface(method.owner)
        && let Some(slot) = method.slot
    {
        return Dispatch::Interface {
            iface: method.owner,
            slot,
        };
    }
    match method.slot {
        Some(slot) if method.is_virtual() && !method.modifiers.is_final() => Dispatch::Virtual { slot },
        _ => Dispatch::Direct,
    }
}

pub(super) fn resolve_call(resolver: &mut Resolver<'_>, call: &mut CallExpr, span: Span) -> Result<ExprInfo> {
    resolver.rewrite_type_receiver(&mut call.receiver);
    let registry = resolver.ctx.registry;

    let mut receiver_type = None;
    let mut receiver_effect = false;
    let (start, search_enclosing) = match &mut call.receiver {
        Receiver::Implicit => (resolver.owner, true),
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
            (base, false)
        }
        Receiver::TypeName(name) => {
            let entry = resolver
                .ctx
                .lookup_type(name, resolver.owner)
                .ok_or_else(|| CompilationError::UnknownType {
                    name: name.clone(),
                    span,
                })?;
            (entry.hash, false)
        }
        Receiver::Static(owner) => (*owner, false),
        Receiver::Expr(object) => {
            let info = resolver.resolve_expr(object, ResolveFlags::READ, None)?;
            receiver_type = Some(info.data_type);
            receiver_effect = info.effect;
            let start = if info.data_type.is_array() {
                resolver.root_type(span)?.class_hash()
            } else {
                info.data_type.object_hash()
            };
            let start = start.ok_or_else(|| CompilationError::InvalidOperation {
                message: format!(
                    "cannot call '{}' on a value of type '{}'",
                    call.name,
                    resolver.display(&info.data_type)
                ),
                span,
            })?;
            (start, false)
        }
    };

    let mut arg_types = Vec::with_capacity(call.args.len());
    for arg in &mut call.args {
        arg_types.push(resolver.resolve_expr(arg, ResolveFlags::READ, None)?.data_type);
    }

    let mut candidates = collect_candidates(&resolver.ctx, start, &call.name, search_enclosing);
    // interfaces still answer the root class's methods
    if candidates.methods.is_empty()
        && receiver_type.is_some_and(|t| t.is_interface_ref())
        && let Some(root) = resolver.ctx.root_class()
    {
        candidates = collect_candidates(&resolver.ctx, root, &call.name, false);
    }
    if candidates.methods.is_empty() {
        return Err(CompilationError::UnknownMethod {
            type_name: registry.type_name(start).to_string(),
            method: call.name.clone(),
            span,
        });
    }

    let matched = resolve_overload(&resolver.ctx, &candidates.methods, &arg_types, &call.name, span)?;
    convert_args(&mut call.args, &matched)?;
    let method = matched.method;

    let dispatch = if method.is_static() {
        bind_static_receiver(resolver, call, method, start, receiver_effect, span);
        Dispatch::Static
    } else {
        bind_instance_receiver(resolver, call, method, candidates.from_enclosing, span)?
    };

    call.resolved = Some(CallTarget {
        method: method.hash,
        owner: method.owner,
        dispatch,
        params: method.params.clone(),
        return_type: method.return_type,
    });
    Ok(ExprInfo::value(method.return_type).with_effect())
}

/// Static calls name the declaring type, unless an instance receiver with a
/// side effect still has to be evaluated.
fn bind_static_receiver(
    resolver: &mut Resolver<'_>,
    call: &mut CallExpr,
    method: &MethodEntry,
    start: TypeHash,
    receiver_effect: bool,
    span: Span,
) {
    let registry = resolver.ctx.registry;
    let through = match &call.receiver {
        Receiver::Implicit | Receiver::Static(_) => None,
        Receiver::TypeName(_) | Receiver::Super if start == method.owner => None,
        Receiver::TypeName(_) | Receiver::Super => Some(format!("subclass '{}'", registry.type_name(start))),
        Receiver::Expr(_) => Some("an instance".to_string()),
    };
    if let Some(through) = through {
        resolver.warn(
            WarningKind::StaticViaInstance,
            format!(
                "static method '{}.{}' called through {through}",
                registry.type_name(method.owner),
                method.name
            ),
            span,
        );
    }
    if !receiver_effect {
        call.receiver = Receiver::Static(method.owner);
    }
}

fn bind_instance_receiver(
    resolver: &mut Resolver<'_>,
    call: &mut CallExpr,
    method: &MethodEntry,
    from_enclosing: Option<TypeHash>,
    span: Span,
) -> Result<Dispatch> {
    let method_on_interface = resolver.ctx.is_interface(method.owner);
    let no_instance = || CompilationError::StaticContext {
        name: method.name.clone(),
        span,
    };

    match call.receiver {
        Receiver::Implicit => {
            if resolver.is_static() || from_enclosing.is_some() {
                return Err(no_instance());
            }
            if method_on_interface {
                // an abstract class calling a method it only inherits from an
                // interface goes through its own interface map
                let mut this = Expr::new(ExprKind::This, span);
                this.info = Some(ExprInfo::value(DataType::class(resolver.owner)));
                wrap_conversion(
                    &mut this,
                    Conversion::ToInterface { iface: method.owner },
                    DataType::interface(method.owner),
                );
                call.receiver = Receiver::Expr(Box::new(this));
            }
            Ok(instance_dispatch(&resolver.ctx, method))
        }
        Receiver::Super => {
            if method.is_abstract() {
                return Err(CompilationError::InvalidOperation {
                    message: format!("cannot call abstract method '{}' through super", method.name),
                    span,
                });
            }
            Ok(Dispatch::Direct)
        }
        Receiver::TypeName(_) | Receiver::Static(_) => Err(no_instance()),
        Receiver::Expr(ref mut object) => {
            let object_type = expr_type(object)?;
            if object_type.is_interface_ref() && !method_on_interface {
                let root = resolver.root_type(span)?;
                wrap_conversion(object, Conversion::InterfaceToObject, root);
            } else if method_on_interface && object_type.object_hash() != Some(method.owner) {
                let conversion = if object_type.is_interface_ref() {
                    Conversion::InterfaceToInterface { iface: method.owner }
                } else {
                    Conversion::ToInterface { iface: method.owner }
                };
                wrap_conversion(object, conversion, DataType::interface(method.owner));
            }
            Ok(instance_dispatch(&resolver.ctx, method))
        }
    }
}

fn convert_args(args: &mut [Expr], matched: &OverloadMatch<'_>) -> Result<()> {
    let params = &matched.method.params;
    for ((arg, conversion), param) in args.iter_mut().zip(&matched.arg_conversions).zip(params) {
        if *conversion != Conversion::Identity {
            let source = expr_type(arg)?;
            wrap_conversion(arg, *conversion, converted_type(conversion, &source, param));
        }
    }
    Ok(())
}

pub(super) fn resolve_new(resolver: &mut Resolver<'_>, new: &mut NewExpr, span: Span) -> Result<ExprInfo> {
    match new {
        NewExpr::Object { ty, args, resolved } => {
            let data_type = resolver.ctx.resolve_type(ty, resolver.owner)?;
            let Some(hash) = data_type.object_hash() else {
                return Err(CompilationError::InvalidOperation {
                    message: format!("cannot instantiate '{}'", resolver.display(&data_type)),
                    span,
                });
            };
            let entry = resolver.ctx.type_entry(hash, span)?;
            if entry.is_abstract() || entry.is_interface() {
                return Err(CompilationError::AbstractInstantiation {
                    name: entry.name.clone(),
                    span,
                });
            }

            let mut arg_types = Vec::with_capacity(args.len());
            for arg in args.iter_mut() {
                arg_types.push(resolver.resolve_expr(arg, ResolveFlags::READ, None)?.data_type);
            }

            let constructors = resolver.ctx.registry.constructors(hash);
            let target = if constructors.is_empty() {
                if !args.is_empty() {
                    let shown: Vec<String> = arg_types.iter().map(|t| resolver.display(t)).collect();
                    return Err(CompilationError::NoMatchingOverload {
                        name: entry.name.clone(),
                        args: shown.join(", "),
                        span,
                    });
                }
                CallTarget {
                    method: TypeHash::from_constructor(hash, &[]),
                    owner: hash,
                    dispatch: Dispatch::DefaultInit,
                    params: Vec::new(),
                    return_type: DataType::VOID,
                }
            } else {
                let matched = resolve_overload(&resolver.ctx, &constructors, &arg_types, &entry.name, span)?;
                convert_args(args, &matched)?;
                CallTarget {
                    method: matched.method.hash,
                    owner: hash,
                    dispatch: Dispatch::Direct,
                    params: matched.method.params.clone(),
                    return_type: DataType::VOID,
                }
            };
            *resolved = Some(target);
            Ok(ExprInfo::value(data_type).with_effect())
        }
        NewExpr::Array {
            element,
            sizes,
            extra_dims,
        } => {
            let element = resolver.ctx.resolve_type(element, resolver.owner)?;
            if element.is_void() {
                return Err(CompilationError::TypeMismatch {
                    message: "array of void".to_string(),
                    span,
                });
            }
            if sizes.is_empty() {
                return Err(CompilationError::InvalidOperation {
                    message: "array creation needs at least one dimension size".to_string(),
                    span,
                });
            }

            for size in sizes.iter_mut() {
                let info = resolver.resolve_expr(size, ResolveFlags::READ, None)?;
                if resolver.promote(size)? != Some(PrimitiveKind::Int) {
                    return Err(CompilationError::TypeMismatch {
                        message: format!("array size must be an int, found '{}'", resolver.display(&info.data_type)),
                        span: size.span,
                    });
                }
                if let Some(ConstValue::Int(n)) = size.constant()
                    && n < 0
                {
                    return Err(CompilationError::InvalidOperation {
                        message: format!("negative array size {n}"),
                        span: size.span,
                    });
                }
            }

            let dims = element.dims as usize + sizes.len() + *extra_dims as usize;
            let dims = u8::try_from(dims).map_err(|_| CompilationError::InvalidOperation {
                message: format!("array of {dims} dimensions"),
                span,
            })?;
            Ok(ExprInfo::value(element.with_dims(dims)).with_effect())
        }
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::{CallExpr, Dispatch, ExprKind, NewExpr, Receiver, build};
    use tern_core::{CompilationError, DataType, PrimitiveKind, TypeHash, WarningKind};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    fn call_of(e: &tern_ast::Expr) -> &CallExpr {
        let ExprKind::Call(call) = &e.kind else { unreachable!() };
        call
    }

    #[test]
    fn virtual_call_on_object() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::method_call(build::new_object("Box", vec![build::int(1)]), "area", vec![]);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT);
        assert!(info.effect);
        let target = call_of(&e).resolved.as_ref().unwrap();
        assert!(matches!(target.dispatch, Dispatch::Virtual { .. }));
    }

    #[test]
    fn interface_call() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let shape = build::cast(build::named("Shape"), build::new_object("Box", vec![build::int(1)]));
        let mut e = build::method_call(shape, "area", vec![]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        let target = call_of(&e).resolved.as_ref().unwrap();
        assert_eq!(
            target.dispatch,
            Dispatch::Interface {
                iface: TypeHash::from_name("Shape"),
                slot: 0
            }
        );
    }

    #[test]
    fn static_calls_name_the_declaring_type() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::static_call("Box", "make", vec![build::char_lit('a')]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(!r.diagnostics().has_warning(WarningKind::StaticViaInstance));
        let call = call_of(&e);
        assert!(call.resolved.as_ref().unwrap().is_static());
        // char argument widened to the int parameter
        assert!(matches!(call.args[0].kind, ExprKind::Convert(_)));

        let mut e = build::static_call("Big", "make", vec![build::int(1)]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(r.diagnostics().has_warning(WarningKind::StaticViaInstance));
        assert_eq!(call_of(&e).receiver, Receiver::Static(TypeHash::from_name("Box")));
    }

    #[test]
    fn static_call_keeps_an_effectful_instance() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let made = build::static_call("Box", "make", vec![build::int(1)]);
        let mut e = build::method_call(made, "make", vec![build::int(2)]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert!(r.diagnostics().has_warning(WarningKind::StaticViaInstance));
        let call = call_of(&e);
        assert!(call.resolved.as_ref().unwrap().is_static());
        assert!(matches!(call.receiver, Receiver::Expr(_)));

        let pure = build::cast(build::named("Box"), build::null());
        let mut e = build::method_call(pure, "make", vec![build::int(2)]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(call_of(&e).receiver, Receiver::Static(TypeHash::from_name("Box")));
    }

    #[test]
    fn instance_call_from_static_method() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = static_resolver(&ctx);
        let mut e = build::call("work", vec![build::int(1)]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::StaticContext { .. }));
    }

    #[test]
    fn unknown_and_mismatched_calls() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::call("missing", vec![]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::UnknownMethod { .. }));

        let mut e = build::call("work", vec![build::boolean(true)]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));
    }

    #[test]
    fn object_creation() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::new_object("Plain", vec![]);
        r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        let ExprKind::New(NewExpr::Object { resolved, .. }) = &e.kind else { unreachable!() };
        assert_eq!(resolved.as_ref().unwrap().dispatch, Dispatch::DefaultInit);

        let mut e = build::new_object("Plain", vec![build::int(1)]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));

        let mut e = build::new_object("Shape", vec![]);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::AbstractInstantiation { .. }));
    }

    #[test]
    fn array_creation() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::new_array(build::prim(PrimitiveKind::Int), vec![build::var("n")], 1);
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::INT.with_dims(2));

        let mut e = build::new_array(build::prim(PrimitiveKind::Int), vec![build::int(-1)], 0);
        let err = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }
}

//! Reference conversions.
//!
//! This module handles conversions between class, interface, array and null
//! references:
//! - Null to any reference, rebinding it to the target's pointer width
//! - Class to superclass and class to implemented interface
//! - Interface to superinterface and interface to the root class
//! - Array covariance over class elements
//! - Checked downcasts (explicit only)

use tern_ast::Conversion;
use tern_core::{BaseType, DataType, NullKind};

use crate::context::CompileContext;

/// Null flavour matching a target reference type.
pub fn null_kind_for(target: &DataType) -> NullKind {
    if target.is_interface_ref() {
        NullKind::Interface
    } else {
        NullKind::Object
    }
}

/// Find an implicit (widening) reference conversion.
pub fn find_reference_conversion(
    ctx: &CompileContext<'_>,
    source: &DataType,
    target: &DataType,
) -> Option<Conversion> {
    if !source.is_reference() || !target.is_reference() {
        return None;
    }

    if source.is_null() {
        if target.is_null() {
            return Some(Conversion::Identity);
        }
        let kind = null_kind_for(target);
        return Some(if source.base == BaseType::Null(kind) {
            Conversion::Identity
        } else {
            Conversion::NullRetype(kind)
        });
    }

    if source.same_shape(target) {
        return Some(Conversion::Identity);
    }

    if ctx.is_root(target) {
        return Some(if source.is_interface_ref() {
            Conversion::InterfaceToObject
        } else {
            Conversion::Upcast
        });
    }

    if source.dims != target.dims {
        return None;
    }

    match (source.base, target.base) {
        (BaseType::Class(from), BaseType::Class(to)) if ctx.registry.is_subtype(from, to) => {
            Some(Conversion::Upcast)
        }
        // element representations differ for interface arrays
        _ if source.is_array() => None,
        (BaseType::Class(from), BaseType::Interface(iface)) if ctx.registry.is_subtype(from, iface) => {
            Some(Conversion::ToInterface { iface })
        }
        (BaseType::Interface(from), BaseType::Interface(iface))
            if ctx.registry.is_subtype(from, iface) =>
        {
            Some(Conversion::InterfaceToInterface { iface })
        }
        _ => None,
    }
}

/// Find an explicit reference cast, possibly in two steps.
pub fn find_reference_cast(
    ctx: &CompileContext<'_>,
    source: &DataType,
    target: &DataType,
) -> Option<Vec<Conversion>> {
    if let Some(conversion) = find_reference_conversion(ctx, source, target) {
        return Some(vec![conversion]);
    }
    if !source.is_reference() || !target.is_reference() || target.is_null() {
        return None;
    }

    if target.is_array() {
        let from_root = ctx.is_root(source);
        let covariant = source.dims == target.dims
            && matches!(
                (source.base, target.base),
                (BaseType::Class(from), BaseType::Class(to)) if ctx.registry.is_subtype(to, from)
            );
        return (from_root || covariant).then(|| vec![Conversion::ArrayCast]);
    }
    if source.is_array() {
        return None;
    }

    match (source.base, target.base) {
        (BaseType::Class(from), BaseType::Class(to)) if ctx.registry.is_subtype(to, from) => {
            Some(vec![Conversion::Downcast { target: to }])
        }
        (BaseType::Class(from), BaseType::Interface(iface)) => {
            // a final class that does not implement the interface never will
            let sealed = ctx
                .registry
                .get(from)
                .is_some_and(|entry| entry.modifiers.is_final());
            (!sealed).then(|| vec![Conversion::ToInterface { iface }])
        }
        (BaseType::Interface(_), BaseType::Interface(iface)) => {
            Some(vec![Conversion::InterfaceToInterface { iface }])
        }
        (BaseType::Interface(_), BaseType::Class(to)) => Some(vec![
            Conversion::InterfaceToObject,
            Conversion::Downcast { target: to },
        ]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ArchConstants, CompileOptions};
    use tern_core::{Modifiers, TypeHash};
    use tern_registry::UnitRegistry;

    fn registry() -> UnitRegistry {
        let mut reg = UnitRegistry::new();
        reg.class("Object").build().unwrap();
        reg.class("Throwable").extends("Object").build().unwrap();
        reg.interface("Shape").build().unwrap();
        reg.interface("Solid").implements("Shape").build().unwrap();
        reg.class("Box").extends("Object").implements("Solid").build().unwrap();
        reg.class("Crate")
            .extends("Box")
            .modifiers(Modifiers::FINAL)
            .build()
            .unwrap();
        reg.set_throwable("Throwable").unwrap();
        reg
    }

    fn ty(name: &str) -> DataType {
        DataType::class(TypeHash::from_name(name))
    }

    fn iface(name: &str) -> DataType {
        DataType::interface(TypeHash::from_name(name))
    }

    #[test]
    fn widening() {
        let reg = registry();
        let ctx = CompileContext::new(&reg, CompileOptions::default(), ArchConstants::ia32());
        assert_eq!(
            find_reference_conversion(&ctx, &ty("Crate"), &ty("Box")),
            Some(Conversion::Upcast)
        );
        assert_eq!(
            find_reference_conversion(&ctx, &ty("Box"), &iface("Shape")),
            Some(Conversion::ToInterface {
                iface: TypeHash::from_name("Shape")
            })
        );
        assert_eq!(
            find_reference_conversion(&ctx, &iface("Solid"), &ty("Object")),
            Some(Conversion::InterfaceToObject)
        );
        assert_eq!(find_reference_conversion(&ctx, &ty("Box"), &ty("Crate")), None);
        assert_eq!(
            find_reference_conversion(&ctx, &DataType::NULL, &iface("Shape")),
            Some(Conversion::NullRetype(NullKind::Interface))
        );
    }

    #[test]
    fn arrays_are_covariant_over_classes_only() {
        let reg = registry();
        let ctx = CompileContext::new(&reg, CompileOptions::default(), ArchConstants::ia32());
        assert_eq!(
            find_reference_conversion(&ctx, &ty("Crate").array_of(), &ty("Box").array_of()),
            Some(Conversion::Upcast)
        );
        assert_eq!(
            find_reference_conversion(&ctx, &ty("Box").array_of(), &iface("Shape").array_of()),
            None
        );
        assert_eq!(
            find_reference_conversion(&ctx, &DataType::INT.array_of(), &ty("Object")),
            Some(Conversion::Upcast)
        );
    }

    #[test]
    fn casts() {
        let reg = registry();
        let ctx = CompileContext::new(&reg, CompileOptions::default(), ArchConstants::ia32());
        assert_eq!(
            find_reference_cast(&ctx, &ty("Box"), &ty("Crate")),
            Some(vec![Conversion::Downcast {
                target: TypeHash::from_name("Crate")
            }])
        );
        assert_eq!(
            find_reference_cast(&ctx, &iface("Shape"), &ty("Box")).map(|c| c.len()),
            Some(2)
        );
        assert_eq!(
            find_reference_cast(&ctx, &ty("Object"), &DataType::INT.array_of()),
            Some(vec![Conversion::ArrayCast])
        );
        assert_eq!(find_reference_cast(&ctx, &ty("Throwable"), &ty("Box")), None);
    }
}

//! Literal typing.

use tern_ast::{ExprInfo, Literal};
use tern_core::{CompilationError, ConstValue, DataType, Span};

use super::Result;
use crate::conversion::null_kind_for;
use crate::resolve::Resolver;

pub(super) fn resolve_literal(
    resolver: &mut Resolver<'_>,
    lit: &Literal,
    span: Span,
    preferred: Option<&DataType>,
) -> Result<ExprInfo> {
    Ok(match lit {
        Literal::Int(v) => ExprInfo::constant(DataType::INT, ConstValue::Int(*v)),
        Literal::Long(v) => ExprInfo::constant(DataType::LONG, ConstValue::Long(*v)),
        Literal::Float(bits) => ExprInfo::constant(DataType::FLOAT, ConstValue::Float(*bits)),
        Literal::Double(bits) => ExprInfo::constant(DataType::DOUBLE, ConstValue::Double(*bits)),
        Literal::Bool(b) => ExprInfo::constant(DataType::BOOL, ConstValue::Bool(*b)),
        Literal::Char(c) => ExprInfo::constant(DataType::CHAR, ConstValue::Int(*c as i32)),
        Literal::Null => {
            // the hint picks the pointer width
            let data_type = match preferred {
                Some(target) if target.is_reference() && !target.is_null() => {
                    DataType::null_of(null_kind_for(target))
                }
                _ => DataType::NULL,
            };
            ExprInfo::constant(data_type, ConstValue::Null)
        }
        Literal::String(_) => {
            let class = resolver
                .ctx
                .registry
                .string_class()
                .ok_or_else(|| CompilationError::Other {
                    message: "string literal used but no string class is configured".to_string(),
                    span,
                })?;
            ExprInfo::value(DataType::class(class))
        }
    })
}

#[cfg(test)]
mod tests {
    use tern_ast::build;
    use tern_core::{ConstValue, DataType, NullKind, TypeHash};

    use crate::resolve::ResolveFlags;
    use crate::resolve::expr::test_support::*;

    #[test]
    fn char_literals_are_int_constants() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::char_lit('A');
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::CHAR);
        assert_eq!(info.constant, Some(ConstValue::Int(65)));
    }

    #[test]
    fn null_follows_the_hint() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let shape = DataType::interface(TypeHash::from_name("Shape"));

        let mut e = build::null();
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, Some(&shape)).unwrap();
        assert_eq!(info.data_type, DataType::null_of(NullKind::Interface));

        let mut e = build::null();
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::NULL);
    }

    #[test]
    fn strings_use_the_string_class() {
        let reg = registry();
        let ctx = ctx(&reg);
        let mut r = instance_resolver(&ctx);
        let mut e = build::string("hi");
        let info = r.resolve_expr(&mut e, ResolveFlags::READ, None).unwrap();
        assert_eq!(info.data_type, DataType::class(TypeHash::from_name("String")));
        assert!(!info.is_constant());
    }
}

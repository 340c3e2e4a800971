//! The conditional operator `c ? a : b`.

use tern_ast::{ExprInfo, TernaryExpr};
use tern_core::{CompilationError, DataType, Span};

use super::Result;
use crate::conversion::find_conversion;
use crate::resolve::{ResolveFlags, Resolver};

pub(super) fn resolve_ternary(
    resolver: &mut Resolver<'_>,
    ternary: &mut TernaryExpr,
    span: Span,
    preferred: Option<&DataType>,
) -> Result<ExprInfo> {
    let cond = resolver.resolve_condition(&mut ternary.cond)?;
    let before = resolver.flow.clone();

    let then_info = resolver.resolve_expr(&mut ternary.then_expr, ResolveFlags::READ, preferred)?;
    let after_then = std::mem::replace(&mut resolver.flow, before);

    let hint = preferred.copied().unwrap_or(then_info.data_type);
    let else_info = resolver.resolve_expr(&mut ternary.else_expr, ResolveFlags::READ, Some(&hint))?;

    resolver.flow = match cond {
        Some(true) => after_then,
        Some(false) => resolver.flow.clone(),
        None => after_then.join(&resolver.flow),
    };

    let then_type = then_info.data_type;
    let else_type = else_info.data_type;
    let data_type = if then_type.same_shape(&else_type) {
        then_type
    } else if find_conversion(&resolver.ctx, &then_type, &else_type).is_some() {
        resolver.coerce(&mut ternary.then_expr, &else_type, false)?;
        else_type
    } else if find_conversion(&resolver.ctx, &else_type, &then_type).is_some() {
        resolver.coerce(&mut ternary.else_expr, &then_type, false)?;
        then_type
    } else {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "conditional branches have incompatible types '{}' and '{}'",
                resolver.display(&then_type),
                resolver.display(&else_type)
            ),
            span,
        });
    };

    let constant = match cond {
        Some(true) => ternary.then_expr.constant(),
        Some(false) => ternary.else_expr.constant(),
        None => None,
    };
    let effect = ternary.cond.has_effect() || then_info.effect || else_info.effect;
    Ok(ExprInfo {
        data_type,
        constant,
        effect,
    })
}

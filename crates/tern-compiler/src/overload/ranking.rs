//! Ranking of viable overload candidates.
//!
//! Candidates are ordered by how many conversions their arguments need. A tie
//! is settled in favour of a candidate that overrides, or is strictly more
//! specific than, every other tied candidate; anything else is ambiguous.

use tern_core::{CompilationError, Span};
use tern_registry::MethodEntry;

use super::OverloadMatch;
use crate::context::CompileContext;
use crate::conversion::find_conversion;

/// Find the best match among the viable candidates for a call to `name`.
pub fn find_best_match<'r>(
    ctx: &CompileContext<'r>,
    mut viable: Vec<OverloadMatch<'r>>,
    name: &str,
    span: Span,
) -> Result<OverloadMatch<'r>, CompilationError> {
    viable.sort_by_key(|m| m.conversion_count);
    let Some(best_count) = viable.first().map(|m| m.conversion_count) else {
        return Err(CompilationError::NoMatchingOverload {
            name: name.to_string(),
            args: String::new(),
            span,
        });
    };
    let tied = viable
        .iter()
        .take_while(|m| m.conversion_count == best_count)
        .count();
    if tied == 1 {
        return Ok(viable.remove(0));
    }

    let winner = (0..tied).find(|&i| {
        (0..tied)
            .filter(|&j| j != i)
            .all(|j| beats(ctx, viable[i].method, viable[j].method))
    });
    match winner {
        Some(index) => Ok(viable.swap_remove(index)),
        None => Err(ambiguous_overload_error(ctx, &viable[0], &viable[1], span)),
    }
}

/// Whether `a` should be preferred over `b` when both need equally many
/// conversions.
fn beats(ctx: &CompileContext<'_>, a: &MethodEntry, b: &MethodEntry) -> bool {
    if ctx.registry.overrides(a, b) {
        return true;
    }
    more_specific(ctx, a, b) && !more_specific(ctx, b, a)
}

/// Every parameter of `a` converts implicitly to the matching one of `b`.
fn more_specific(ctx: &CompileContext<'_>, a: &MethodEntry, b: &MethodEntry) -> bool {
    a.params.len() == b.params.len()
        && a
            .params
            .iter()
            .zip(&b.params)
            .all(|(pa, pb)| find_conversion(ctx, pa, pb).is_some())
}

/// Build error for ambiguous overload.
fn ambiguous_overload_error(
    ctx: &CompileContext<'_>,
    a: &OverloadMatch<'_>,
    b: &OverloadMatch<'_>,
    span: Span,
) -> CompilationError {
    let format_candidate = |m: &OverloadMatch<'_>| -> String {
        let params: Vec<_> = m.method.params.iter().map(|p| ctx.display(p)).collect();
        format!(
            "{}.{}({})",
            ctx.registry.type_name(m.method.owner),
            m.method.name,
            params.join(", ")
        )
    };

    CompilationError::AmbiguousOverload {
        name: a.method.name.clone(),
        candidates: format!("{} and {}", format_candidate(a), format_candidate(b)),
        span,
    }
}

//! Overload resolution for method and constructor calls.
//!
//! ## Algorithm
//!
//! 1. Collect candidates by name: the receiver's type first, then its
//!    superclasses and interfaces, skipping methods already overridden by a
//!    collected one. If the whole hierarchy has no method of that name, the
//!    lexically enclosing types are searched the same way.
//! 2. Filter candidates by argument count and implicit convertibility.
//! 3. Score each viable candidate by the number of conversions it needs.
//! 4. Rank candidates and select the best match, reporting ties that no
//!    override or specificity rule settles as ambiguous.

mod ranking;

pub use ranking::find_best_match;

use tern_ast::Conversion;
use tern_core::{CompilationError, DataType, Span, TypeHash};
use tern_registry::MethodEntry;

use crate::context::CompileContext;
use crate::conversion::find_conversion;

/// Result of successful overload resolution.
#[derive(Debug, Clone)]
pub struct OverloadMatch<'r> {
    /// The selected method.
    pub method: &'r MethodEntry,
    /// Conversion needed for each argument.
    pub arg_conversions: Vec<Conversion>,
    /// Number of non-identity conversions (lower is better).
    pub conversion_count: usize,
}

/// Candidates found for a name, and where they were found.
#[derive(Debug, Default)]
pub struct Candidates<'r> {
    pub methods: Vec<&'r MethodEntry>,
    /// Found in an enclosing type rather than the receiver's hierarchy.
    pub from_enclosing: Option<TypeHash>,
}

/// Collect the methods named `name` visible on `start`.
pub fn collect_candidates<'r>(
    ctx: &CompileContext<'r>,
    start: TypeHash,
    name: &str,
    search_enclosing: bool,
) -> Candidates<'r> {
    let methods = hierarchy_candidates(ctx, start, name);
    if !methods.is_empty() || !search_enclosing {
        return Candidates {
            methods,
            from_enclosing: None,
        };
    }

    let mut outer = ctx.registry.enclosing(start);
    while let Some(scope) = outer {
        let methods = hierarchy_candidates(ctx, scope, name);
        if !methods.is_empty() {
            return Candidates {
                methods,
                from_enclosing: Some(scope),
            };
        }
        outer = ctx.registry.enclosing(scope);
    }
    Candidates::default()
}

fn hierarchy_candidates<'r>(ctx: &CompileContext<'r>, start: TypeHash, name: &str) -> Vec<&'r MethodEntry> {
    let registry = ctx.registry;
    let ancestors = registry.ancestors(start);
    let interfaces: Vec<TypeHash> = registry
        .supertypes(start)
        .into_iter()
        .filter(|hash| ctx.is_interface(*hash))
        .collect();

    let mut found: Vec<&'r MethodEntry> = Vec::new();
    let walk = std::iter::once(start).chain(ancestors).chain(interfaces);
    for owner in walk {
        for method in registry.declared_methods(owner, name) {
            if !found.iter().any(|seen| seen.same_signature(method)) {
                found.push(method);
            }
        }
    }
    found
}

/// Pick the best of `candidates` for arguments of types `arg_types`.
pub fn resolve_overload<'r>(
    ctx: &CompileContext<'r>,
    candidates: &[&'r MethodEntry],
    arg_types: &[DataType],
    name: &str,
    span: Span,
) -> Result<OverloadMatch<'r>, CompilationError> {
    let viable: Vec<OverloadMatch<'r>> = candidates
        .iter()
        .copied()
        .filter(|method| method.params.len() == arg_types.len())
        .filter_map(|method| {
            let arg_conversions = arg_types
                .iter()
                .zip(&method.params)
                .map(|(arg, param)| find_conversion(ctx, arg, param))
                .collect::<Option<Vec<_>>>()?;
            let conversion_count = arg_conversions
                .iter()
                .filter(|c| **c != Conversion::Identity)
                .count();
            Some(OverloadMatch {
                method,
                arg_conversions,
                conversion_count,
            })
        })
        .collect();

    if viable.is_empty() {
        let args: Vec<String> = arg_types.iter().map(|t| ctx.display(t)).collect();
        return Err(CompilationError::NoMatchingOverload {
            name: name.to_string(),
            args: args.join(", "),
            span,
        });
    }

    find_best_match(ctx, viable, name, span)
}

//! Unit driver: resolve and generate every method body of a compilation
//! unit.
//!
//! Errors are collected per method so one bad body does not hide the
//! diagnostics of the others. An internal error stops the unit at once,
//! since the compiler state can no longer be trusted.

use tern_ast::MethodDecl;
use tern_core::{CompilationError, Diagnostics, TypeHash};
use tracing::{debug, error, warn};

use crate::context::CompileContext;
use crate::emit::generate_method;
use crate::emit::stream::InstrStream;
use crate::emit::strings::StringTable;
use crate::resolve::resolve_method;

/// Code of one method.
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    pub method: TypeHash,
    pub code: InstrStream,
    /// Frame size in words, excluding parameters.
    pub frame_words: u32,
}

/// Output of a successful unit.
#[derive(Debug, Default)]
pub struct CompiledUnit {
    pub methods: Vec<CompiledMethod>,
    /// String literals of every method, by index.
    pub strings: StringTable,
    /// Warnings only; a unit with errors is never produced.
    pub diagnostics: Diagnostics,
}

/// Compile every method in `decls`, annotating the trees in place.
///
/// Returns the compiled unit, or every error found together with the
/// warnings collected up to that point.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_unit(
    ctx: &CompileContext<'_>,
    decls: &mut [MethodDecl],
) -> Result<CompiledUnit, Diagnostics> {
    let mut unit = CompiledUnit::default();
    let mut diagnostics = Diagnostics::new();

    for decl in decls.iter_mut() {
        match compile_method(ctx, decl, &mut unit.strings, &mut diagnostics) {
            Ok(method) => unit.methods.push(method),
            Err(err) if err.is_internal() => {
                error!(method = %decl.method, %err, "internal error, unit aborted");
                diagnostics.error(err);
                return Err(diagnostics);
            }
            Err(err) => {
                debug!(method = %decl.method, %err, "method rejected");
                diagnostics.error(err);
            }
        }
    }

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    debug!(
        methods = unit.methods.len(),
        strings = unit.strings.len(),
        "unit compiled"
    );
    unit.diagnostics = diagnostics;
    Ok(unit)
}

fn compile_method(
    ctx: &CompileContext<'_>,
    decl: &mut MethodDecl,
    strings: &mut StringTable,
    diagnostics: &mut Diagnostics,
) -> Result<CompiledMethod, CompilationError> {
    let mut found = resolve_method(ctx, decl)?;
    for warning in found.warnings() {
        warn!(method = %decl.method, "{warning}");
    }
    if ctx.options.warnings_as_errors
        && let Some(first) = found.warnings().first()
    {
        return Err(CompilationError::Other {
            message: format!("warning treated as error: {}", first.message),
            span: first.span,
        });
    }
    diagnostics.append(&mut found);

    let mut code = InstrStream::new();
    generate_method(ctx, decl, &mut code, strings)?;
    let frame_words = decl
        .frame_words
        .ok_or_else(|| CompilationError::internal("method frame not sized"))?;
    Ok(CompiledMethod {
        method: decl.method,
        code,
        frame_words,
    })
}

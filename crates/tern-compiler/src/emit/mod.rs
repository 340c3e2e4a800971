//! Code generation from a resolved method body.
//!
//! The [`Emitter`] walks the annotated tree once and drives a [`Backend`].
//! Expressions are computed into registers the caller owns (`gen_value`),
//! conditions are turned into jumps without materializing a boolean
//! (`gen_cond_jump`), and assignment targets are turned into addresses
//! (`with_place`).
//!
//! Registers follow the acquire/release protocol of [`regs`]: every
//! temporary is held by a [`Scratch`] guard whose drop releases it and
//! restores anything spilled for it, so an early `?` return cannot leak one.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = InstrStream::new();
//! let mut strings = StringTable::new();
//! generate_method(&ctx, &decl, &mut stream, &mut strings)?;
//! ```

pub mod backend;
mod calls;
mod cond;
mod frames;
pub mod jumps;
mod lvalue;
pub mod regs;
mod stmt;
pub mod stream;
pub mod strings;
mod value;

use std::ops::{Deref, DerefMut};

use thiserror::Error;
use tern_ast::{Block, Expr, MethodDecl};
use tern_core::{CompilationError, ConstValue, DataType, RegClass, Span, TypeHash};
use tern_registry::MethodEntry;
use tracing::debug;

use crate::context::CompileContext;
use backend::{Backend, Callee, Label, Reg, Runtime};
use jumps::{BreakError, JumpManager};
use regs::{Registers, Spill};
use strings::StringTable;

type Result<T> = std::result::Result<T, CompilationError>;

/// Code generator failures. All of them are compiler bugs or resource
/// limits, never user errors: the resolver has rejected those already.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("out of registers with {live} live")]
    RegistersExhausted { live: usize },

    #[error(
        "register protocol violated: {allocs} allocs, {deallocs} deallocs, {live} still live, {violations} bad releases"
    )]
    UnbalancedRegisters {
        allocs: u32,
        deallocs: u32,
        live: usize,
        violations: u32,
    },

    #[error("{what} reached code generation without resolution at {span}")]
    Unresolved { what: &'static str, span: Span },

    #[error(transparent)]
    Jump(#[from] BreakError),
}

impl From<EmitError> for CompilationError {
    fn from(err: EmitError) -> Self {
        CompilationError::internal(err.to_string())
    }
}

fn unresolved(what: &'static str, span: Span) -> CompilationError {
    EmitError::Unresolved { what, span }.into()
}

/// Code run when a protected region is left.
#[derive(Debug, Clone, Copy)]
enum FinallyAction<'a> {
    Block(&'a Block),
    /// Release the monitor whose lock is stored in this frame slot.
    MonitorExit { lock: i32 },
}

/// An open region an early exit has to close.
#[derive(Debug, Clone, Copy)]
enum Cleanup<'a> {
    /// Unlink a throw frame.
    Frame { frame: i32 },
    Finally(FinallyAction<'a>),
}

/// Generates code for one method.
pub struct Emitter<'a, B: Backend> {
    ctx: CompileContext<'a>,
    backend: &'a mut B,
    strings: &'a mut StringTable,
    regs: Registers,
    jumps: JumpManager,
    /// Open cleanups, innermost last.
    cleanups: Vec<Cleanup<'a>>,
    method: &'a MethodEntry,
    return_label: Label,
    param_words: u32,
}

impl<'a, B: Backend> Emitter<'a, B> {
    pub fn new(
        ctx: &CompileContext<'a>,
        decl: &MethodDecl,
        backend: &'a mut B,
        strings: &'a mut StringTable,
    ) -> Result<Self> {
        let method = ctx.method_entry(decl.method)?;
        let param_words = method.params.iter().map(|ty| ctx.arch.words_for(ty)).sum();
        let return_label = backend.new_label();
        Ok(Self {
            ctx: *ctx,
            backend,
            strings,
            regs: Registers::new(ctx.arch.register_count, ctx.arch.pointer_bytes),
            jumps: JumpManager::new(),
            cleanups: Vec::new(),
            method,
            return_label,
            param_words,
        })
    }

    /// Emit prologue, body and epilogue of `decl`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generate(&mut self, decl: &'a MethodDecl) -> Result<()> {
        let frame_words = decl
            .frame_words
            .ok_or_else(|| unresolved("method frame", decl.span))?;
        self.backend
            .gen_enter(self.ctx.arch.frame_bytes(frame_words), self.param_words);
        self.gen_block(&decl.body)?;
        self.backend.bind_label(self.return_label);
        self.backend.gen_leave(self.param_words);
        self.regs.check_balanced()?;
        debug!(
            method = %self.method.name,
            allocs = self.regs.alloc_count(),
            "generated"
        );
        Ok(())
    }

    // =========================================================================
    // Register guards
    // =========================================================================

    /// Acquire a temporary register of `class`, keeping `keep` in registers.
    fn scratch(&mut self, class: RegClass, keep: &[Reg]) -> Result<Scratch<'_, 'a, B>> {
        let spill = self.regs.prepare_free(&mut *self.backend, class, keep)?;
        match self.regs.alloc(class) {
            Ok(reg) => Ok(Scratch {
                emitter: self,
                reg,
                spill,
            }),
            Err(err) => {
                self.regs.restore(&mut *self.backend, spill);
                Err(err.into())
            }
        }
    }

    /// A temporary that is pushed as a call argument before it is released.
    /// It must not have displaced anything, or the pops would come out of
    /// order with the pushed arguments.
    fn arg_scratch(&mut self, class: RegClass, keep: &[Reg]) -> Result<Scratch<'_, 'a, B>> {
        let scratch = self.scratch(class, keep)?;
        if !scratch.spill.is_empty() {
            let live = scratch.regs.live_count();
            return Err(EmitError::RegistersExhausted { live }.into());
        }
        Ok(scratch)
    }

    /// Push every live register except `keep` until the guard is dropped.
    fn preserve(&mut self, keep: &[Reg]) -> Preserved<'_, 'a, B> {
        let spill = self.regs.spill_all(&mut *self.backend, keep);
        Preserved { emitter: self, spill }
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    fn class_of(&self, expr: &Expr) -> Result<RegClass> {
        expr.data_type()
            .and_then(|ty| ty.reg_class())
            .ok_or_else(|| unresolved("expression type", expr.span))
    }

    fn type_of(&self, expr: &Expr) -> Result<DataType> {
        expr.data_type().ok_or_else(|| unresolved("expression type", expr.span))
    }

    fn words_of(&self, expr: &Expr) -> Result<u32> {
        Ok(self.ctx.arch.words_for(&self.type_of(expr)?))
    }

    fn load_const(&mut self, dst: Reg, class: RegClass, value: ConstValue) {
        self.backend.gen_load_const(dst, class, value);
    }

    /// Call a runtime routine that never returns.
    fn trap(&mut self, routine: Runtime, arg_words: u32) {
        self.backend.gen_call(Callee::Runtime(routine), arg_words);
    }

    /// Jump around a null-pointer trap unless `reg` is null.
    fn null_check(&mut self, reg: Reg, class: RegClass) {
        if !self.ctx.options.null_checks {
            return;
        }
        let ok = self.backend.new_label();
        self.backend.gen_test(class, reg);
        self.backend.gen_cond_jump(backend::Cond::Ne, ok);
        self.trap(Runtime::NullPointer, 0);
        self.backend.bind_label(ok);
    }

    /// Call a runtime routine on values already in registers.
    fn call_runtime(
        &mut self,
        routine: Runtime,
        args: &[(Reg, RegClass)],
        result: Option<(Reg, RegClass)>,
    ) {
        let mut keep: Vec<Reg> = args.iter().map(|(reg, _)| *reg).collect();
        keep.extend(result.map(|(reg, _)| reg));
        let mut saved = self.preserve(&keep);
        let dynamic = saved.ctx.options.dynamic_addressing;
        if dynamic {
            saved.backend.gen_save_context();
        }
        let mut words = 0;
        for (reg, class) in args {
            saved.backend.gen_push(*reg, *class);
            words += saved.regs.slots_for(*class) as u32;
        }
        saved.backend.gen_call(Callee::Runtime(routine), words);
        if dynamic {
            saved.backend.gen_restore_context();
        }
        if let Some((reg, class)) = result {
            saved.backend.gen_result(reg, class);
        }
    }

    fn owner(&self) -> TypeHash {
        self.method.owner
    }
}

// =============================================================================
// Guards
// =============================================================================

/// A temporary register, released when dropped.
pub(crate) struct Scratch<'e, 'a, B: Backend> {
    emitter: &'e mut Emitter<'a, B>,
    reg: Reg,
    spill: Spill,
}

impl<B: Backend> Scratch<'_, '_, B> {
    fn reg(&self) -> Reg {
        self.reg
    }
}

impl<'a, B: Backend> Deref for Scratch<'_, 'a, B> {
    type Target = Emitter<'a, B>;

    fn deref(&self) -> &Self::Target {
        self.emitter
    }
}

impl<B: Backend> DerefMut for Scratch<'_, '_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.emitter
    }
}

impl<B: Backend> Drop for Scratch<'_, '_, B> {
    fn drop(&mut self) {
        let spill = std::mem::take(&mut self.spill);
        let emitter = &mut *self.emitter;
        emitter
            .regs
            .dealloc_restore(&mut *emitter.backend, self.reg, spill);
    }
}

/// Registers pushed around a call, popped when dropped.
pub(crate) struct Preserved<'e, 'a, B: Backend> {
    emitter: &'e mut Emitter<'a, B>,
    spill: Spill,
}

impl<'a, B: Backend> Deref for Preserved<'_, 'a, B> {
    type Target = Emitter<'a, B>;

    fn deref(&self) -> &Self::Target {
        self.emitter
    }
}

impl<B: Backend> DerefMut for Preserved<'_, '_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.emitter
    }
}

impl<B: Backend> Drop for Preserved<'_, '_, B> {
    fn drop(&mut self) {
        let spill = std::mem::take(&mut self.spill);
        let emitter = &mut *self.emitter;
        emitter.regs.restore(&mut *emitter.backend, spill);
    }
}

/// Generate code for a resolved method body into `backend`.
pub fn generate_method<B: Backend>(
    ctx: &CompileContext<'_>,
    decl: &MethodDecl,
    backend: &mut B,
    strings: &mut StringTable,
) -> Result<()> {
    let mut emitter = Emitter::new(ctx, decl, backend, strings)?;
    emitter.generate(decl)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Resolve and generate a body of the shared fixture methods.

    use tern_ast::{MethodDecl, Stmt};
    use tern_core::{CompilationError, Diagnostics};

    use super::generate_method;
    use super::stream::InstrStream;
    use super::strings::StringTable;
    use crate::context::CompileContext;
    use crate::options::{ArchConstants, CompileOptions};
    use crate::resolve::expr::test_support::registry;
    use crate::resolve::stmt::test_support::{resolve_run, resolve_work};

    type Resolved = Result<(MethodDecl, Diagnostics), CompilationError>;

    fn emit(resolved: Resolved, options: CompileOptions, arch: ArchConstants) -> Result<InstrStream, CompilationError> {
        let (decl, _) = resolved?;
        let reg = registry();
        let ctx = CompileContext::new(&reg, options, arch);
        let mut stream = InstrStream::new();
        let mut strings = StringTable::new();
        generate_method(&ctx, &decl, &mut stream, &mut strings)?;
        Ok(stream)
    }

    /// Compile `stmts` as `Main.work(int n)`, which returns int.
    pub fn emit_work(stmts: Vec<Stmt>) -> Result<InstrStream, CompilationError> {
        emit(resolve_work(stmts), CompileOptions::default(), ArchConstants::ia32())
    }

    /// Compile `stmts` as `static void Main.run(int n)`.
    pub fn emit_run(stmts: Vec<Stmt>) -> Result<InstrStream, CompilationError> {
        emit(resolve_run(stmts), CompileOptions::default(), ArchConstants::ia32())
    }

    pub fn emit_run_with(stmts: Vec<Stmt>, options: CompileOptions) -> Result<InstrStream, CompilationError> {
        emit(resolve_run(stmts), options, ArchConstants::ia32())
    }

    /// `emit_run` on a register file of `count` registers.
    pub fn emit_run_with_registers(stmts: Vec<Stmt>, count: u16) -> Result<InstrStream, CompilationError> {
        emit(
            resolve_run(stmts),
            CompileOptions::default(),
            ArchConstants::ia32().with_register_count(count),
        )
    }
}

//! Statement resolution and flow analysis.
//!
//! Every statement returns a [`FlowResult`] and leaves the resolver's
//! [`WriteStates`](crate::flow::WriteStates) describing the path after it. A
//! statement following one that cannot complete is an error.

mod control;
mod exceptions;
mod exits;
mod loops;

use tern_ast::{Block, Stmt, StmtKind, VarDeclStmt};
use tern_core::{CompilationError, FlowResult, Span, WarningKind};

use super::{ResolveFlags, Resolver};
use crate::flow::VarKey;

type Result<T> = std::result::Result<T, CompilationError>;

impl<'r> Resolver<'r> {
    /// Resolve a block in its own scope.
    pub fn resolve_block(&mut self, block: &mut Block) -> Result<FlowResult> {
        self.scope.push_scope();
        let result = self.resolve_stmts(&mut block.stmts);
        self.scope.pop_scope();
        result
    }

    /// Resolve a statement sequence in the current scope.
    pub(crate) fn resolve_stmts(&mut self, stmts: &mut [Stmt]) -> Result<FlowResult> {
        let mut result = FlowResult::NO_CHANGE;
        for stmt in stmts {
            if !result.completes_normally() {
                return Err(CompilationError::UnreachableStatement { span: stmt.span });
            }
            let flow = self.resolve_stmt(stmt)?;
            result = (result & FlowResult::HAS_SHORTCUT) | flow;
        }
        Ok(result)
    }

    pub fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<FlowResult> {
        self.enter(stmt.span)?;
        let result = self.resolve_stmt_kind(stmt);
        self.leave();

        let mut flow = result?;
        if !self.flow.is_alive() {
            flow |= FlowResult::NEXT_UNREACHABLE;
        }
        stmt.flow = flow;
        Ok(flow)
    }

    fn resolve_stmt_kind(&mut self, stmt: &mut Stmt) -> Result<FlowResult> {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Block(block) => self.resolve_block(block),
            StmtKind::Expr(expr) => {
                let info = self.resolve_expr(expr, ResolveFlags::READ | ResolveFlags::STATEMENT, None)?;
                if !info.effect {
                    self.warn(WarningKind::NoEffect, "expression result is unused", span);
                }
                Ok(FlowResult::NO_CHANGE)
            }
            StmtKind::VarDecl(decl) => {
                self.resolve_var_decl(decl, span)?;
                Ok(FlowResult::NO_CHANGE)
            }
            StmtKind::If(stmt) => self.resolve_if(stmt),
            StmtKind::While(stmt) => self.resolve_while(stmt),
            StmtKind::DoWhile(stmt) => self.resolve_do_while(stmt),
            StmtKind::For(stmt) => self.resolve_for(stmt),
            StmtKind::ForEach(stmt) => self.resolve_for_each(stmt, span),
            StmtKind::Switch(stmt) => self.resolve_switch(stmt, span),
            StmtKind::Synchronized(stmt) => self.resolve_synchronized(stmt, span),
            StmtKind::Try(stmt) => self.resolve_try(stmt, span),
            StmtKind::Return(value) => self.resolve_return(value.as_mut(), span),
            StmtKind::Break => self.resolve_break(span),
            StmtKind::Continue => self.resolve_continue(span),
            StmtKind::Throw(value) => self.resolve_throw(value, span),
            StmtKind::Assert(stmt) => self.resolve_assert(stmt),
            StmtKind::Empty => Ok(FlowResult::NO_CHANGE),
        }
    }

    fn resolve_var_decl(&mut self, decl: &mut VarDeclStmt, span: Span) -> Result<()> {
        let data_type = self.ctx.resolve_type(&decl.ty, self.owner)?;
        if data_type.is_void() {
            return Err(CompilationError::TypeMismatch {
                message: format!("variable '{}' cannot be void", decl.name),
                span,
            });
        }

        // the initializer cannot see the variable it initializes
        if let Some(init) = &mut decl.init {
            self.resolve_expr(init, ResolveFlags::READ, Some(&data_type))?;
            self.coerce(init, &data_type, true)?;
        }

        let words = self.ctx.arch.words_for(&data_type);
        let slot = self
            .scope
            .declare(&decl.name, data_type, words, decl.is_final, self.loop_depth, span)?;
        if decl.init.is_some() {
            self.flow.write(VarKey::Local(slot.id));
        }
        decl.slot = Some(slot);
        decl.resolved = Some(data_type);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use tern_ast::{BinaryOp, build};
    use tern_core::{CompilationError, PrimitiveKind, WarningKind};

    use super::test_support::*;

    fn int() -> tern_ast::TypeRef {
        build::prim(PrimitiveKind::Int)
    }

    #[test]
    fn unassigned_local() {
        let err = resolve_run(vec![
            build::local(int(), "x", None),
            build::expr_stmt(build::assign(build::var("n"), build::var("x"))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnassignedRead { .. }));
    }

    #[test]
    fn statement_after_return() {
        let err = resolve_work(vec![build::ret(Some(build::int(1))), build::empty()]).unwrap_err();
        assert!(matches!(err, CompilationError::UnreachableStatement { .. }));
    }

    #[test]
    fn missing_return() {
        let err = resolve_work(vec![build::expr_stmt(build::assign(build::var("n"), build::int(1)))])
            .unwrap_err();
        assert!(matches!(err, CompilationError::MissingReturn { .. }));
    }

    #[test]
    fn useless_expression_warns() {
        let (_, diagnostics) = resolve_run(vec![build::expr_stmt(build::bin(
            BinaryOp::Add,
            build::var("n"),
            build::int(1),
        ))])
        .unwrap();
        assert!(diagnostics.has_warning(WarningKind::NoEffect));
    }

    #[test]
    fn redeclaration_in_same_block() {
        let err = resolve_run(vec![
            build::local(int(), "x", Some(build::int(1))),
            build::local(int(), "x", Some(build::int(2))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::VariableRedeclaration { .. }));
    }

    #[test]
    fn frame_size_is_recorded() {
        let (decl, _) = resolve_run(vec![
            build::local(build::prim(PrimitiveKind::Long), "a", Some(build::long(1))),
            build::block(vec![build::local(int(), "b", Some(build::int(2)))]),
            build::block(vec![build::local(int(), "c", Some(build::int(3)))]),
        ])
        .unwrap();
        // blocks reuse words; a long takes two on ia32
        assert_eq!(decl.frame_words, Some(3));
    }
}

//! `try`/`catch`/`finally` and `synchronized`.
//!
//! The try body and every catch start from the state before the statement:
//! an exception may leave the body at any point. A `finally` block runs on
//! every path, so what it definitely writes is written after the statement.

use tern_ast::{CatchClause, Conversion, SynchronizedStmt, TryStmt, TrySlots};
use tern_core::{CompilationError, FlowResult, Span, TypeHash};

use super::Result;
use crate::flow::{VarKey, WriteStates};
use crate::resolve::{ResolveFlags, Resolver, wrap_conversion};

impl<'r> Resolver<'r> {
    pub(super) fn resolve_try(&mut self, stmt: &mut TryStmt, span: Span) -> Result<FlowResult> {
        if stmt.catches.is_empty() && stmt.finally.is_none() {
            return Err(CompilationError::Other {
                message: "try needs a catch or a finally block".to_string(),
                span,
            });
        }

        // the throw frame and pending exception live until the statement ends
        self.scope.push_scope();
        let result = self.resolve_try_parts(stmt, span);
        self.scope.pop_scope();
        result
    }

    fn resolve_try_parts(&mut self, stmt: &mut TryStmt, span: Span) -> Result<FlowResult> {
        let root = self.root_type(span)?;
        let frame = self.scope.alloc_temp(self.ctx.arch.throw_frame_words);
        let exception = self.scope.alloc_temp(self.ctx.arch.words_for(&root));
        stmt.slots = Some(TrySlots { frame, exception });

        let before = self.flow.clone();
        let mut result = self.resolve_block(&mut stmt.body)? & FlowResult::HAS_SHORTCUT;
        let mut exits = vec![std::mem::replace(&mut self.flow, before.clone())];

        let mut caught: Vec<TypeHash> = Vec::new();
        for clause in &mut stmt.catches {
            let class = self.catch_class(clause, &caught)?;
            caught.push(class);

            self.flow = before.clone();
            result |= self.resolve_catch(clause)? & FlowResult::HAS_SHORTCUT;
            exits.push(std::mem::take(&mut self.flow));
        }
        let mut after = WriteStates::join_all(&exits);

        if let Some(finally) = &mut stmt.finally {
            self.flow = before;
            let flow = self.resolve_block(finally)?;
            if !flow.completes_normally() {
                return Err(CompilationError::FinallyCannotComplete { span: finally.span });
            }
            result |= flow & FlowResult::HAS_SHORTCUT;
            after.overlay_definite(&self.flow);
        }

        self.flow = after;
        Ok(result)
    }

    /// Resolve the caught class, rejecting clauses an earlier one shadows.
    fn catch_class(&self, clause: &mut CatchClause, caught: &[TypeHash]) -> Result<TypeHash> {
        let registry = self.ctx.registry;
        let data_type = self.ctx.resolve_type(&clause.ty, self.owner)?;
        let class = data_type
            .class_hash()
            .filter(|hash| !data_type.is_array() && registry.is_throwable(*hash))
            .ok_or_else(|| CompilationError::TypeMismatch {
                message: format!("cannot catch '{}': not a throwable class", self.display(&data_type)),
                span: clause.span,
            })?;

        if let Some(earlier) = caught.iter().find(|earlier| registry.is_subtype(class, **earlier)) {
            return Err(CompilationError::UnreachableCatch {
                caught: registry.type_name(class).to_string(),
                earlier: registry.type_name(*earlier).to_string(),
                span: clause.span,
            });
        }
        clause.class = Some(class);
        Ok(class)
    }

    fn resolve_catch(&mut self, clause: &mut CatchClause) -> Result<FlowResult> {
        let Some(class) = clause.class else {
            return Err(CompilationError::internal(format!("catch clause without a class at {}", clause.span)));
        };
        let data_type = tern_core::DataType::class(class);

        self.scope.push_scope();
        let declared = self.scope.declare(
            &clause.name,
            data_type,
            self.ctx.arch.words_for(&data_type),
            false,
            self.loop_depth,
            clause.span,
        );
        let result = declared.and_then(|slot| {
            self.flow.write(VarKey::Local(slot.id));
            clause.var_slot = Some(slot);
            self.resolve_block(&mut clause.body)
        });
        self.scope.pop_scope();
        result
    }

    pub(super) fn resolve_synchronized(&mut self, stmt: &mut SynchronizedStmt, span: Span) -> Result<FlowResult> {
        let lock = self.resolve_expr(&mut stmt.lock, ResolveFlags::READ, None)?.data_type;
        if !lock.is_reference() || lock.is_null() {
            return Err(CompilationError::TypeMismatch {
                message: format!("cannot synchronize on '{}'", self.display(&lock)),
                span: stmt.lock.span,
            });
        }
        let root = self.root_type(span)?;
        if lock.is_interface_ref() {
            wrap_conversion(&mut stmt.lock, Conversion::InterfaceToObject, root);
        }

        // the lock stays in a hidden slot so every exit can release it
        self.scope.push_scope();
        let words = self.ctx.arch.words_for(&root);
        stmt.lock_slot = Some(self.scope.alloc_temp(words));
        stmt.slots = Some(TrySlots {
            frame: self.scope.alloc_temp(self.ctx.arch.throw_frame_words),
            exception: self.scope.alloc_temp(words),
        });
        let result = self.resolve_block(&mut stmt.body);
        self.scope.pop_scope();
        result
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::{StmtKind, build};
    use tern_core::{CompilationError, PrimitiveKind, TypeHash};

    use crate::resolve::stmt::test_support::*;

    fn int() -> tern_ast::TypeRef {
        build::prim(PrimitiveKind::Int)
    }

    fn set(name: &str, value: i32) -> tern_ast::Stmt {
        build::expr_stmt(build::assign(build::var(name), build::int(value)))
    }

    #[test]
    fn catch_order() {
        let err = resolve_run(vec![build::try_stmt(
            vec![],
            vec![
                build::catch("Throwable", "t", vec![]),
                build::catch("Error", "e", vec![]),
            ],
            None,
        )])
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnreachableCatch { .. }));

        let (decl, _) = resolve_run(vec![build::try_stmt(
            vec![],
            vec![
                build::catch("Error", "e", vec![]),
                build::catch("Throwable", "t", vec![]),
            ],
            None,
        )])
        .unwrap();
        let StmtKind::Try(stmt) = &decl.body.stmts[0].kind else { unreachable!() };
        assert_eq!(stmt.catches[0].class, Some(TypeHash::from_name("Error")));
        assert!(stmt.slots.is_some());
    }

    #[test]
    fn catch_needs_a_throwable() {
        let err = resolve_run(vec![build::try_stmt(
            vec![],
            vec![build::catch("Plain", "p", vec![])],
            None,
        )])
        .unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn writes_in_try_and_catches() {
        // every path writes
        resolve_work(vec![
            build::local(int(), "x", None),
            build::try_stmt(
                vec![set("x", 1)],
                vec![build::catch("Error", "e", vec![set("x", 2)])],
                None,
            ),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap();

        // the catch path does not
        let err = resolve_work(vec![
            build::local(int(), "x", None),
            build::try_stmt(vec![set("x", 1)], vec![build::catch("Error", "e", vec![])], None),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnassignedRead { .. }));
    }

    #[test]
    fn finally_writes_count() {
        resolve_work(vec![
            build::local(int(), "x", None),
            build::try_stmt(vec![], vec![build::catch("Error", "e", vec![])], Some(vec![set("x", 1)])),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap();
    }

    #[test]
    fn try_and_catches_all_return() {
        let (decl, _) = resolve_work(vec![build::try_stmt(
            vec![build::ret(Some(build::int(1)))],
            vec![build::catch("Throwable", "t", vec![build::ret(Some(build::int(2)))])],
            None,
        )])
        .unwrap();
        assert!(!decl.body.stmts[0].flow.completes_normally());
    }

    #[test]
    fn finally_that_cannot_complete() {
        let err = resolve_work(vec![build::try_stmt(
            vec![],
            vec![],
            Some(vec![build::ret(Some(build::int(0)))]),
        )])
        .unwrap_err();
        assert!(matches!(err, CompilationError::FinallyCannotComplete { .. }));

        // a throw ends the finally just the same
        let err = resolve_work(vec![
            build::try_stmt(
                vec![],
                vec![],
                Some(vec![build::throw(build::new_object("Error", vec![]))]),
            ),
            build::ret(Some(build::int(0))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::FinallyCannotComplete { .. }));
    }

    #[test]
    fn synchronized_block() {
        let (decl, _) = resolve_work(vec![
            build::synchronized(build::this(), vec![build::ret(Some(build::int(1)))]),
        ])
        .unwrap();
        let StmtKind::Synchronized(stmt) = &decl.body.stmts[0].kind else { unreachable!() };
        assert!(stmt.lock_slot.is_some());
        assert!(stmt.slots.is_some());

        let err = resolve_run(vec![build::synchronized(build::var("n"), vec![])]).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }
}

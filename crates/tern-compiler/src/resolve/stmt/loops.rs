//! `while`, `do`, `for` and enhanced `for`.
//!
//! Paths leaving a loop are the condition turning false (the state before the
//! body, since the body may not run) and every `break`. A loop whose condition
//! is constant true leaves only through `break`, so without one the statement
//! after it is unreachable.

use tern_ast::{CallTarget, Conversion, DoWhileStmt, ForEachPlan, ForEachStmt, ForStmt, Stmt, WhileStmt};
use tern_core::{CompilationError, DataType, FlowResult, Span, TypeHash};
use tern_registry::MethodEntry;

use super::Result;
use crate::conversion::find_conversion;
use crate::flow::{JumpFlow, VarKey, WriteStates};
use crate::overload::{collect_candidates, resolve_overload};
use crate::resolve::expr::instance_dispatch;
use crate::resolve::{ResolveFlags, Resolver, wrap_conversion};

impl<'r> Resolver<'r> {
    pub(super) fn resolve_while(&mut self, stmt: &mut WhileStmt) -> Result<FlowResult> {
        let cond = self.resolve_condition(&mut stmt.cond)?;
        let on_false = self.flow.clone();

        let (body, jumps) = self.resolve_loop_body(&mut stmt.body)?;
        self.flow = loop_exit(cond, &on_false, &jumps);
        Ok(body & FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_do_while(&mut self, stmt: &mut DoWhileStmt) -> Result<FlowResult> {
        let (body, jumps) = self.resolve_loop_body(&mut stmt.body)?;

        // the condition runs after the body and after every `continue`
        let mut paths: Vec<&WriteStates> = jumps.continues.iter().collect();
        paths.push(&self.flow);
        self.flow = WriteStates::join_all(paths);
        let cond = self.resolve_condition(&mut stmt.cond)?;

        let on_false = self.flow.clone();
        self.flow = loop_exit(cond, &on_false, &jumps);
        Ok(body & FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_for(&mut self, stmt: &mut ForStmt) -> Result<FlowResult> {
        self.scope.push_scope();
        let result = self.resolve_for_parts(stmt);
        self.scope.pop_scope();
        result
    }

    fn resolve_for_parts(&mut self, stmt: &mut ForStmt) -> Result<FlowResult> {
        let init = self.resolve_stmts(&mut stmt.init)?;
        if !init.completes_normally() {
            return Err(CompilationError::UnreachableStatement { span: stmt.body.span });
        }

        let cond = match &mut stmt.cond {
            Some(cond) => self.resolve_condition(cond)?,
            None => Some(true),
        };
        let on_false = self.flow.clone();

        let (body, jumps) = self.resolve_loop_body(&mut stmt.body)?;

        // updates run once per iteration, like the body
        let mut paths: Vec<&WriteStates> = jumps.continues.iter().collect();
        paths.push(&self.flow);
        self.flow = WriteStates::join_all(paths);
        self.loop_depth += 1;
        let updates = self.resolve_updates(&mut stmt.update);
        self.loop_depth -= 1;
        updates?;

        self.flow = loop_exit(cond, &on_false, &jumps);
        Ok(body & FlowResult::HAS_SHORTCUT)
    }

    fn resolve_updates(&mut self, updates: &mut [tern_ast::Expr]) -> Result<()> {
        for update in updates {
            self.resolve_expr(update, ResolveFlags::READ | ResolveFlags::STATEMENT, None)?;
        }
        Ok(())
    }

    pub(super) fn resolve_for_each(&mut self, stmt: &mut ForEachStmt, span: Span) -> Result<FlowResult> {
        let iterable = self.resolve_expr(&mut stmt.iterable, ResolveFlags::READ, None)?.data_type;
        let var_type = self.ctx.resolve_type(&stmt.var_type, self.owner)?;

        self.scope.push_scope();
        let result = self.resolve_for_each_parts(stmt, iterable, var_type, span);
        self.scope.pop_scope();
        result
    }

    fn resolve_for_each_parts(
        &mut self,
        stmt: &mut ForEachStmt,
        iterable: DataType,
        var_type: DataType,
        span: Span,
    ) -> Result<FlowResult> {
        let plan = if let Some(element) = iterable.element() {
            let conversion = self.element_conversion(&element, &var_type, span)?;
            let array = self.scope.alloc_temp(self.ctx.arch.words_for(&iterable));
            let index = self.scope.alloc_temp(1);
            ForEachPlan::Array {
                array,
                index,
                element,
                conversion,
            }
        } else if let Some(hash) = iterable.object_hash()
            && !iterable.is_null()
        {
            self.iterator_plan(stmt, iterable, hash, &var_type, span)?
        } else {
            return Err(CompilationError::TypeMismatch {
                message: format!("cannot iterate over '{}'", self.display(&iterable)),
                span: stmt.iterable.span,
            });
        };

        // the variable is fresh on every iteration
        let words = self.ctx.arch.words_for(&var_type);
        let slot = self
            .scope
            .declare(&stmt.name, var_type, words, false, self.loop_depth + 1, span)?;
        let on_exit = self.flow.clone();
        self.flow.write(VarKey::Local(slot.id));
        stmt.var_slot = Some(slot);
        stmt.plan = Some(plan);

        let (body, jumps) = self.resolve_loop_body(&mut stmt.body)?;
        self.flow = loop_exit(None, &on_exit, &jumps);
        Ok(body & FlowResult::HAS_SHORTCUT)
    }

    /// Plan for an object with `hasNext()` and `next()`.
    fn iterator_plan(
        &mut self,
        stmt: &mut ForEachStmt,
        iterable: DataType,
        hash: TypeHash,
        var_type: &DataType,
        span: Span,
    ) -> Result<ForEachPlan> {
        let has_next = self.iterator_method(hash, "hasNext", span)?;
        let next = self.iterator_method(hash, "next", span)?;
        if !has_next.return_type.is_bool() {
            return Err(CompilationError::TypeMismatch {
                message: format!(
                    "'hasNext' of '{}' must return bool",
                    self.ctx.registry.type_name(hash)
                ),
                span,
            });
        }

        // both calls go through one stored reference, so they have to agree
        // on how it is reached
        let on_interface = |method: &MethodEntry| self.ctx.is_interface(method.owner);
        let receiver = match (on_interface(has_next), on_interface(next)) {
            (false, false) if iterable.is_interface_ref() => {
                let root = self.root_type(span)?;
                wrap_conversion(&mut stmt.iterable, Conversion::InterfaceToObject, root);
                root
            }
            (false, false) => iterable,
            (true, true) if has_next.owner == next.owner => {
                if iterable.object_hash() != Some(has_next.owner) {
                    let conversion = if iterable.is_interface_ref() {
                        Conversion::InterfaceToInterface { iface: has_next.owner }
                    } else {
                        Conversion::ToInterface { iface: has_next.owner }
                    };
                    wrap_conversion(&mut stmt.iterable, conversion, DataType::interface(has_next.owner));
                }
                DataType::interface(has_next.owner)
            }
            _ => {
                return Err(CompilationError::InvalidOperation {
                    message: format!(
                        "'hasNext' and 'next' of '{}' are declared by different types",
                        self.ctx.registry.type_name(hash)
                    ),
                    span,
                });
            }
        };

        let conversion = self.element_conversion(&next.return_type, var_type, span)?;
        let iterator = self.scope.alloc_temp(self.ctx.arch.words_for(&receiver));
        Ok(ForEachPlan::Iterator {
            iterator,
            has_next: self.iterator_target(has_next),
            next: self.iterator_target(next),
            conversion,
        })
    }

    fn iterator_method(&self, hash: TypeHash, name: &str, span: Span) -> Result<&'r MethodEntry> {
        let candidates = collect_candidates(&self.ctx, hash, name, false);
        if candidates.methods.is_empty() {
            return Err(CompilationError::UnknownMethod {
                type_name: self.ctx.registry.type_name(hash).to_string(),
                method: name.to_string(),
                span,
            });
        }
        let matched = resolve_overload(&self.ctx, &candidates.methods, &[], name, span)?;
        if matched.method.is_static() {
            return Err(CompilationError::InvalidOperation {
                message: format!("iterator method '{name}' cannot be static"),
                span,
            });
        }
        Ok(matched.method)
    }

    fn iterator_target(&self, method: &MethodEntry) -> CallTarget {
        CallTarget {
            method: method.hash,
            owner: method.owner,
            dispatch: instance_dispatch(&self.ctx, method),
            params: Vec::new(),
            return_type: method.return_type,
        }
    }

    fn element_conversion(&self, element: &DataType, var_type: &DataType, span: Span) -> Result<Conversion> {
        find_conversion(&self.ctx, element, var_type).ok_or_else(|| CompilationError::TypeMismatch {
            message: format!(
                "cannot convert element '{}' to '{}'",
                self.display(element),
                self.display(var_type)
            ),
            span,
        })
    }

    /// Resolve a loop body with `break` and `continue` enabled.
    fn resolve_loop_body(&mut self, body: &mut Stmt) -> Result<(FlowResult, JumpFlow)> {
        self.jumps.push(JumpFlow::new(true));
        self.loop_depth += 1;
        let result = self.resolve_stmt(body);
        self.loop_depth -= 1;
        let jumps = self.jumps.pop();
        let result = result?;
        let jumps = jumps.ok_or_else(|| CompilationError::internal(format!("loop jump frame lost at {}", body.span)))?;
        Ok((result, jumps))
    }
}

/// State after a loop: the condition turning false, joined with every
/// `break`. A constant-true condition never turns false.
fn loop_exit(cond: Option<bool>, on_false: &WriteStates, jumps: &JumpFlow) -> WriteStates {
    let mut exits: Vec<&WriteStates> = jumps.breaks.iter().collect();
    if cond != Some(true) {
        exits.push(on_false);
    }
    WriteStates::join_all(exits)
}

#[cfg(test)]
mod tests {
    use tern_ast::{BinaryOp, ForEachPlan, StmtKind, build};
    use tern_core::{CompilationError, DataType, FlowResult, PrimitiveKind};

    use crate::resolve::stmt::test_support::*;

    fn int() -> tern_ast::TypeRef {
        build::prim(PrimitiveKind::Int)
    }

    fn positive() -> tern_ast::Expr {
        build::bin(BinaryOp::Greater, build::var("n"), build::int(0))
    }

    fn set(name: &str, value: i32) -> tern_ast::Stmt {
        build::expr_stmt(build::assign(build::var(name), build::int(value)))
    }

    #[test]
    fn infinite_loop_without_break() {
        let (decl, _) = resolve_work(vec![build::while_stmt(build::boolean(true), build::empty())]).unwrap();
        assert!(decl.body.stmts[0].flow.contains(FlowResult::NEXT_UNREACHABLE));

        let err = resolve_work(vec![
            build::while_stmt(build::boolean(true), build::empty()),
            build::ret(Some(build::int(0))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnreachableStatement { .. }));
    }

    #[test]
    fn break_makes_the_exit_reachable() {
        let (decl, _) = resolve_work(vec![
            build::local(int(), "x", None),
            build::for_stmt(
                vec![],
                None,
                vec![],
                build::block(vec![set("x", 1), build::brk()]),
            ),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap();
        assert!(decl.body.stmts[1].flow.completes_normally());
    }

    #[test]
    fn loop_body_may_not_run() {
        let err = resolve_work(vec![
            build::local(int(), "x", None),
            build::while_stmt(positive(), build::block(vec![set("x", 1)])),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnassignedRead { .. }));
    }

    #[test]
    fn do_while_body_always_runs() {
        resolve_work(vec![
            build::local(int(), "x", None),
            build::do_while(build::block(vec![set("x", 1)]), positive()),
            build::ret(Some(build::var("x"))),
        ])
        .unwrap();
    }

    #[test]
    fn break_outside_a_loop() {
        let err = resolve_run(vec![build::brk()]).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidJump { keyword: "break", .. }));
        let err = resolve_run(vec![build::switch(build::var("n"), vec![build::default_case(vec![build::cont()])])])
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidJump { keyword: "continue", .. }));
    }

    #[test]
    fn final_written_in_a_loop() {
        let err = resolve_run(vec![
            build::final_local(int(), "x", None),
            build::while_stmt(positive(), build::block(vec![set("x", 1), build::brk()])),
        ])
        .unwrap_err();
        assert!(matches!(err, CompilationError::FinalAlreadyWritten { .. }));
    }

    #[test]
    fn for_scope_ends_with_the_loop() {
        let counter = || build::local(int(), "i", Some(build::int(0)));
        let cond = || build::bin(BinaryOp::Less, build::var("i"), build::var("n"));
        let step = || build::postfix(tern_ast::PostfixOp::PostInc, build::var("i"));
        resolve_run(vec![
            build::for_stmt(vec![counter()], Some(cond()), vec![step()], build::empty()),
            build::for_stmt(vec![counter()], Some(cond()), vec![step()], build::empty()),
        ])
        .unwrap();
    }

    #[test]
    fn for_each_over_an_array() {
        let (decl, _) = resolve_run(vec![
            build::local(
                build::prim(PrimitiveKind::Short).with_dims(1),
                "values",
                Some(build::new_array(build::prim(PrimitiveKind::Short), vec![build::int(4)], 0)),
            ),
            build::for_each(int(), "v", build::var("values"), build::empty()),
        ])
        .unwrap();
        let StmtKind::ForEach(each) = &decl.body.stmts[1].kind else { unreachable!() };
        let Some(ForEachPlan::Array { element, conversion, .. }) = &each.plan else {
            panic!("expected an array plan, found {:?}", each.plan)
        };
        assert_eq!(*element, DataType::SHORT);
        assert_eq!(
            *conversion,
            tern_ast::Conversion::Primitive {
                from: PrimitiveKind::Short,
                to: PrimitiveKind::Int
            }
        );
    }

    #[test]
    fn for_each_over_an_iterator() {
        let (decl, _) = resolve_run(vec![
            build::local(build::named("Cursor"), "c", Some(build::null())),
            build::for_each(build::named("Object"), "item", build::var("c"), build::empty()),
        ])
        .unwrap();
        let StmtKind::ForEach(each) = &decl.body.stmts[1].kind else { unreachable!() };
        let Some(ForEachPlan::Iterator { has_next, next, .. }) = &each.plan else {
            panic!("expected an iterator plan, found {:?}", each.plan)
        };
        assert!(has_next.return_type.is_bool());
        assert!(next.return_type.is_reference());
    }

    #[test]
    fn for_each_over_a_number() {
        let err = resolve_run(vec![build::for_each(int(), "v", build::var("n"), build::empty())]).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }
}

//! Statements.
//!
//! Statements start and end with no register live, so jumps between
//! statements never have to reconcile spilled registers.

use tern_ast::{
    AssertStmt, Block, Conversion, DoWhileStmt, Expr, ForEachPlan, ForEachStmt, ForStmt, IfStmt,
    LocalSlot, Stmt, StmtKind, SwitchStmt, VarDeclStmt, WhileStmt,
};
use tern_core::{ArraySpecial, ConstValue, DataType, RegClass, Span};

use super::backend::{Addr, ArithOp, Backend, Callee, Cond, Label, Reg, Runtime};
use super::calls::ReceiverSource;
use super::jumps::JumpTarget;
use super::{EmitError, Emitter, Result, unresolved};

impl<'a, B: Backend> Emitter<'a, B> {
    pub(super) fn gen_block(&mut self, block: &'a Block) -> Result<()> {
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    pub(super) fn gen_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block(block) => self.gen_block(block),
            StmtKind::Expr(expr) => self.gen_discard(expr),
            StmtKind::VarDecl(decl) => self.gen_var_decl(decl, stmt.span),
            StmtKind::If(if_stmt) => self.gen_if(if_stmt),
            StmtKind::While(while_stmt) => self.gen_while(while_stmt),
            StmtKind::DoWhile(do_while) => self.gen_do_while(do_while),
            StmtKind::For(for_stmt) => self.gen_for(for_stmt),
            StmtKind::ForEach(for_each) => self.gen_for_each(for_each, stmt.span),
            StmtKind::Switch(switch) => self.gen_switch(switch),
            StmtKind::Synchronized(sync) => self.gen_synchronized(sync, stmt.span),
            StmtKind::Try(try_stmt) => self.gen_try(try_stmt, stmt.span),
            StmtKind::Return(value) => self.gen_return(value.as_ref()),
            StmtKind::Break => {
                let target = self.jumps.break_target().map_err(EmitError::from)?;
                self.gen_exit_jump(target)
            }
            StmtKind::Continue => {
                let target = self.jumps.continue_target().map_err(EmitError::from)?;
                self.gen_exit_jump(target)
            }
            StmtKind::Throw(value) => {
                let mut exception = self.arg_scratch(RegClass::Ptr, &[])?;
                let r = exception.reg();
                exception.gen_object_ptr(value, r)?;
                exception.backend.gen_push(r, RegClass::Ptr);
                exception.backend.gen_call(Callee::Runtime(Runtime::Throw), 1);
                Ok(())
            }
            StmtKind::Assert(assert) => self.gen_assert(assert),
            StmtKind::Empty => Ok(()),
        }
    }

    fn gen_assert(&mut self, assert: &AssertStmt) -> Result<()> {
        if !self.ctx.options.assertions {
            return Ok(());
        }
        let ok = self.backend.new_label();
        self.gen_cond_jump(&assert.cond, true, ok)?;
        let words = match &assert.message {
            Some(message) => self.push_value(message, &[])?,
            None => {
                let mut text = self.arg_scratch(RegClass::Ptr, &[])?;
                let r = text.reg();
                text.load_const(r, RegClass::Ptr, ConstValue::Null);
                text.backend.gen_push(r, RegClass::Ptr);
                1
            }
        };
        self.trap(Runtime::AssertFailed, words);
        self.backend.bind_label(ok);
        Ok(())
    }

    fn gen_var_decl(&mut self, decl: &VarDeclStmt, span: Span) -> Result<()> {
        let Some(init) = &decl.init else {
            return Ok(());
        };
        let slot = decl.slot.ok_or_else(|| unresolved("local slot", span))?;
        self.store_local(init, slot.offset)
    }

    /// Compute `value` into the frame slot at `offset`.
    fn store_local(&mut self, value: &Expr, offset: i32) -> Result<()> {
        let class = self.class_of(value)?;
        let mut tmp = self.scratch(class, &[])?;
        let r = tmp.reg();
        tmp.gen_value(value, r)?;
        tmp.backend.gen_store(r, class, Addr::Frame(offset));
        Ok(())
    }

    fn gen_if(&mut self, stmt: &'a IfStmt) -> Result<()> {
        if let Some(taken) = stmt.cond.constant().and_then(ConstValue::as_bool) {
            return match (taken, &stmt.else_branch) {
                (true, _) => self.gen_stmt(&stmt.then_branch),
                (false, Some(other)) => self.gen_stmt(other),
                (false, None) => Ok(()),
            };
        }
        let other = self.backend.new_label();
        self.gen_cond_jump(&stmt.cond, false, other)?;
        self.gen_stmt(&stmt.then_branch)?;
        match &stmt.else_branch {
            None => self.backend.bind_label(other),
            Some(else_branch) => {
                let end = self.backend.new_label();
                if stmt.then_branch.flow.completes_normally() {
                    self.backend.gen_jump(end);
                }
                self.backend.bind_label(other);
                self.gen_stmt(else_branch)?;
                self.backend.bind_label(end);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Loops
    // =========================================================================

    fn gen_loop_body(&mut self, body: &'a Stmt, end: Label, next: Label) -> Result<()> {
        self.jumps.enter_loop(end, next, self.cleanups.len());
        let result = self.gen_stmt(body);
        self.jumps.exit();
        result
    }

    fn gen_while(&mut self, stmt: &'a WhileStmt) -> Result<()> {
        if stmt.cond.constant().and_then(ConstValue::as_bool) == Some(false) {
            return Ok(());
        }
        let top = self.backend.new_label();
        let end = self.backend.new_label();
        self.backend.bind_label(top);
        self.gen_cond_jump(&stmt.cond, false, end)?;
        self.gen_loop_body(&stmt.body, end, top)?;
        self.backend.gen_jump(top);
        self.backend.bind_label(end);
        Ok(())
    }

    fn gen_do_while(&mut self, stmt: &'a DoWhileStmt) -> Result<()> {
        let top = self.backend.new_label();
        let next = self.backend.new_label();
        let end = self.backend.new_label();
        self.backend.bind_label(top);
        self.gen_loop_body(&stmt.body, end, next)?;
        self.backend.bind_label(next);
        self.gen_cond_jump(&stmt.cond, true, top)?;
        self.backend.bind_label(end);
        Ok(())
    }

    fn gen_for(&mut self, stmt: &'a ForStmt) -> Result<()> {
        for init in &stmt.init {
            self.gen_stmt(init)?;
        }
        let cond = stmt.cond.as_ref();
        if cond.and_then(|c| c.constant()).and_then(ConstValue::as_bool) == Some(false) {
            return Ok(());
        }
        let top = self.backend.new_label();
        let next = self.backend.new_label();
        let end = self.backend.new_label();
        self.backend.bind_label(top);
        if let Some(cond) = cond {
            self.gen_cond_jump(cond, false, end)?;
        }
        self.gen_loop_body(&stmt.body, end, next)?;
        self.backend.bind_label(next);
        for update in &stmt.update {
            self.gen_discard(update)?;
        }
        self.backend.gen_jump(top);
        self.backend.bind_label(end);
        Ok(())
    }

    fn gen_for_each(&mut self, stmt: &'a ForEachStmt, span: Span) -> Result<()> {
        let var = stmt.var_slot.ok_or_else(|| unresolved("loop variable", span))?;
        let plan = stmt.plan.as_ref().ok_or_else(|| unresolved("loop plan", span))?;
        let var_type = self.ctx.resolve_type(&stmt.var_type, self.owner())?;
        let top = self.backend.new_label();
        let next = self.backend.new_label();
        let end = self.backend.new_label();
        match plan {
            ForEachPlan::Array {
                array,
                index,
                element,
                conversion,
            } => {
                let array_ty = self.type_of(&stmt.iterable)?;
                self.store_local(&stmt.iterable, array.offset)?;
                {
                    let mut zero = self.scratch(RegClass::Int, &[])?;
                    let z = zero.reg();
                    zero.load_const(z, RegClass::Int, ConstValue::Int(0));
                    zero.backend.gen_store(z, RegClass::Int, Addr::Frame(index.offset));
                }

                self.backend.bind_label(top);
                self.compare_index(*array, *index, array_ty.special)?;
                self.backend.gen_cond_jump(Cond::Ge, end);
                self.load_element(*array, *index, element, *conversion, &var_type, var, span)?;
                self.gen_loop_body(&stmt.body, end, next)?;

                self.backend.bind_label(next);
                let mut step = self.scratch(RegClass::Int, &[])?;
                let i = step.reg();
                step.backend.gen_load(i, RegClass::Int, Addr::Frame(index.offset));
                {
                    let mut one = step.scratch(RegClass::Int, &[i])?;
                    let o = one.reg();
                    one.load_const(o, RegClass::Int, ConstValue::Int(1));
                    one.backend.gen_bin_op(ArithOp::Add, RegClass::Int, i, o);
                }
                step.backend.gen_store(i, RegClass::Int, Addr::Frame(index.offset));
            }
            ForEachPlan::Iterator {
                iterator,
                has_next,
                next: next_call,
                conversion,
            } => {
                let iter_class = self.class_of(&stmt.iterable)?;
                self.store_local(&stmt.iterable, iterator.offset)?;
                let receiver = ReceiverSource::Frame {
                    offset: iterator.offset,
                    class: iter_class,
                };

                self.backend.bind_label(top);
                self.backend.bind_label(next);
                {
                    let mut more = self.scratch(RegClass::Byte, &[])?;
                    let m = more.reg();
                    more.emit_call(has_next, receiver, &[], Some((m, RegClass::Byte)))?;
                    more.backend.gen_test(RegClass::Byte, m);
                }
                self.backend.gen_cond_jump(Cond::Eq, end);
                {
                    let item_ty = next_call.return_type;
                    let item_class = item_ty
                        .reg_class()
                        .ok_or_else(|| unresolved("iterator element", span))?;
                    let mut item = self.scratch(item_class, &[])?;
                    let r = item.reg();
                    item.emit_call(next_call, receiver, &[], Some((r, item_class)))?;
                    item.store_converted(r, &item_ty, *conversion, &var_type, var, span)?;
                }
                self.gen_loop_body(&stmt.body, end, next)?;
            }
        }
        self.backend.gen_jump(top);
        self.backend.bind_label(end);
        Ok(())
    }

    /// Set the flags from the hidden index against the array length.
    fn compare_index(&mut self, array: LocalSlot, index: LocalSlot, special: ArraySpecial) -> Result<()> {
        let mut base = self.scratch(RegClass::Ptr, &[])?;
        let b = base.reg();
        base.backend.gen_load(b, RegClass::Ptr, Addr::Frame(array.offset));
        let mut at = base.scratch(RegClass::Int, &[b])?;
        let i = at.reg();
        at.backend.gen_load(i, RegClass::Int, Addr::Frame(index.offset));
        let mut len = at.scratch(RegClass::Int, &[b, i])?;
        let l = len.reg();
        match special {
            ArraySpecial::Inline(bound) => len.load_const(l, RegClass::Int, ConstValue::Int(bound as i32)),
            ArraySpecial::None | ArraySpecial::Unchecked => {
                len.null_check(b, RegClass::Ptr);
                let offset = len.ctx.arch.array_length_offset();
                len.backend
                    .gen_load(l, RegClass::Int, Addr::Indirect { base: b, offset });
            }
        }
        len.backend.gen_compare(RegClass::Int, i, l);
        Ok(())
    }

    /// Load `array[index]` into the loop variable.
    fn load_element(
        &mut self,
        array: LocalSlot,
        index: LocalSlot,
        element: &DataType,
        conversion: Conversion,
        var_type: &DataType,
        var: LocalSlot,
        span: Span,
    ) -> Result<()> {
        let class = element
            .reg_class()
            .ok_or_else(|| unresolved("array element", span))?;
        let element_bytes = element.storage_size(self.ctx.arch.pointer_bytes);
        let data = self.ctx.arch.array_data_offset(element_bytes);
        let mut base = self.scratch(RegClass::Ptr, &[])?;
        let b = base.reg();
        base.backend.gen_load(b, RegClass::Ptr, Addr::Frame(array.offset));
        let mut at = base.scratch(RegClass::Int, &[b])?;
        let i = at.reg();
        at.backend.gen_load(i, RegClass::Int, Addr::Frame(index.offset));
        let mut item = at.scratch(class, &[b, i])?;
        let r = item.reg();
        item.backend.gen_load(
            r,
            class,
            Addr::Indexed {
                base: b,
                index: i,
                scale: element_bytes as u8,
                offset: data,
            },
        );
        item.store_converted(r, element, conversion, var_type, var, span)
    }

    /// Convert the value in `src` and store it in the loop variable.
    fn store_converted(
        &mut self,
        src: Reg,
        from: &DataType,
        conversion: Conversion,
        to: &DataType,
        var: LocalSlot,
        span: Span,
    ) -> Result<()> {
        let from_class = from
            .reg_class()
            .ok_or_else(|| unresolved("loop element", span))?;
        let to_class = to.reg_class().ok_or_else(|| unresolved("loop variable", span))?;
        if conversion.is_free() {
            self.backend.gen_store(src, from_class, Addr::Frame(var.offset));
            return Ok(());
        }
        let mut value = self.scratch(to_class, &[src])?;
        let v = value.reg();
        value.convert_reg(src, from_class, conversion, to, v)?;
        value.backend.gen_store(v, to_class, Addr::Frame(var.offset));
        Ok(())
    }

    // =========================================================================
    // Switch
    // =========================================================================

    fn gen_switch(&mut self, stmt: &'a SwitchStmt) -> Result<()> {
        let class = self.class_of(&stmt.selector)?;
        let end = self.backend.new_label();
        let labels: Vec<Label> = stmt.cases.iter().map(|_| self.backend.new_label()).collect();
        {
            let mut selector = self.scratch(class, &[])?;
            let s = selector.reg();
            selector.gen_value(&stmt.selector, s)?;
            for (case, label) in stmt.cases.iter().zip(&labels) {
                for value in &case.labels {
                    let constant = value
                        .constant()
                        .ok_or_else(|| unresolved("case label", value.span))?;
                    {
                        let mut key = selector.scratch(class, &[s])?;
                        let k = key.reg();
                        key.load_const(k, class, constant);
                        key.backend.gen_compare(class, s, k);
                    }
                    selector.backend.gen_cond_jump(Cond::Eq, *label);
                }
            }
        }
        let default = stmt
            .cases
            .iter()
            .zip(&labels)
            .find_map(|(case, label)| case.is_default.then_some(*label));
        self.backend.gen_jump(default.unwrap_or(end));

        self.jumps.enter_switch(end, self.cleanups.len());
        let result = self.gen_case_bodies(stmt, &labels);
        self.jumps.exit();
        result?;
        self.backend.bind_label(end);
        Ok(())
    }

    /// Case bodies in source order, so a body without `break` falls into
    /// the next one.
    fn gen_case_bodies(&mut self, stmt: &'a SwitchStmt, labels: &[Label]) -> Result<()> {
        for (case, label) in stmt.cases.iter().zip(labels) {
            self.backend.bind_label(*label);
            for body in &case.body {
                self.gen_stmt(body)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Exits
    // =========================================================================

    fn gen_return(&mut self, value: Option<&Expr>) -> Result<()> {
        match value {
            None => self.run_cleanups(0)?,
            Some(value) if self.cleanups.is_empty() => {
                let class = self.class_of(value)?;
                let mut result = self.scratch(class, &[])?;
                let r = result.reg();
                result.gen_value(value, r)?;
                result.backend.gen_set_result(r, class);
            }
            Some(value) => {
                // the value waits on the stack while finally code runs
                let class = self.class_of(value)?;
                {
                    let mut result = self.arg_scratch(class, &[])?;
                    let r = result.reg();
                    result.gen_value(value, r)?;
                    result.backend.gen_push(r, class);
                }
                self.run_cleanups(0)?;
                let mut result = self.scratch(class, &[])?;
                let r = result.reg();
                result.backend.gen_pop(r, class);
                result.backend.gen_set_result(r, class);
            }
        }
        self.backend.gen_jump(self.return_label);
        Ok(())
    }

    fn gen_exit_jump(&mut self, target: JumpTarget) -> Result<()> {
        self.run_cleanups(target.cleanup_depth)?;
        self.backend.gen_jump(target.label);
        Ok(())
    }
}

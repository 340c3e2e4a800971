//! Throw frames, `try`, `synchronized` and cleanups on early exits.
//!
//! A protected region links a stack-resident throw frame into the chain
//! headed at [`Addr::ThrowFrameHead`]:
//!
//! | word    | contents                                   |
//! |---------|--------------------------------------------|
//! | `F`     | previous chain head                        |
//! | `F + 1` | address of the dispatch code               |
//! | `F + 2` | address of the pending-exception slot      |
//! | `F + 3` | stack and frame pointer, two words         |
//!
//! A throw stores the exception through `F + 2` and jumps to the dispatch
//! code, which restores the stack, unlinks the frame and tests the catch
//! clauses in order. An exception no clause takes stays pending: the
//! `finally` code runs and then rethrows it.

use tern_ast::{Block, CatchClause, SynchronizedStmt, TryStmt, TrySlots};
use tern_core::{ConstValue, RegClass, Span};

use super::backend::{Addr, Backend, Cond, Label, Runtime};
use super::{Cleanup, Emitter, FinallyAction, Result, unresolved};

impl<'a, B: Backend> Emitter<'a, B> {
    pub(super) fn gen_try(&mut self, stmt: &'a TryStmt, span: Span) -> Result<()> {
        let slots = stmt.slots.ok_or_else(|| unresolved("try frame", span))?;
        let finally = stmt.finally.as_ref().map(FinallyAction::Block);
        self.gen_protected(&stmt.body, &stmt.catches, finally, slots)
    }

    /// `synchronized (lock) body` runs as a `try` whose `finally` releases
    /// the monitor.
    pub(super) fn gen_synchronized(&mut self, stmt: &'a SynchronizedStmt, span: Span) -> Result<()> {
        let lock = stmt
            .lock_slot
            .ok_or_else(|| unresolved("lock slot", span))?
            .offset;
        let slots = stmt.slots.ok_or_else(|| unresolved("monitor frame", span))?;
        {
            let mut object = self.scratch(RegClass::Ptr, &[])?;
            let o = object.reg();
            object.gen_object_ptr(&stmt.lock, o)?;
            object.null_check(o, RegClass::Ptr);
            object.backend.gen_store(o, RegClass::Ptr, Addr::Frame(lock));
            object.call_runtime(Runtime::MonitorEnter, &[(o, RegClass::Ptr)], None);
        }
        self.gen_protected(&stmt.body, &[], Some(FinallyAction::MonitorExit { lock }), slots)
    }

    fn gen_protected(
        &mut self,
        body: &'a Block,
        catches: &'a [CatchClause],
        finally: Option<FinallyAction<'a>>,
        slots: TrySlots,
    ) -> Result<()> {
        let frame = slots.frame.offset;
        let pending = slots.exception.offset;
        let dispatch = self.backend.new_label();
        let after = self.backend.new_label();

        self.clear_slot(pending)?;
        self.link_frame(frame, pending, dispatch)?;
        if let Some(action) = finally {
            self.cleanups.push(Cleanup::Finally(action));
        }
        self.cleanups.push(Cleanup::Frame { frame });
        self.gen_block(body)?;
        self.cleanups.pop();
        self.unlink_frame(frame)?;
        self.backend.gen_jump(after);

        self.backend.bind_label(dispatch);
        self.backend.gen_restore_stack(frame);
        self.unlink_frame(frame)?;
        for clause in catches {
            self.gen_catch(clause, frame, pending, finally.is_some(), after)?;
        }

        if finally.is_some() {
            self.cleanups.pop();
        }
        self.backend.bind_label(after);
        if let Some(action) = finally {
            self.run_finally(action)?;
        }
        self.rethrow_pending(pending)
    }

    /// Test one clause against the pending exception. Falls through to the
    /// next clause when the exception is not an instance of its class.
    fn gen_catch(
        &mut self,
        clause: &'a CatchClause,
        frame: i32,
        pending: i32,
        has_finally: bool,
        after: Label,
    ) -> Result<()> {
        let class = clause
            .class
            .ok_or_else(|| unresolved("catch class", clause.span))?;
        let var = clause
            .var_slot
            .ok_or_else(|| unresolved("catch variable", clause.span))?;
        let next = self.backend.new_label();
        {
            let mut exception = self.scratch(RegClass::Ptr, &[])?;
            let e = exception.reg();
            exception
                .backend
                .gen_load(e, RegClass::Ptr, Addr::Frame(pending));
            let mut taken = exception.scratch(RegClass::Byte, &[e])?;
            let t = taken.reg();
            taken.call_runtime(
                Runtime::InstanceOf { target: class },
                &[(e, RegClass::Ptr)],
                Some((t, RegClass::Byte)),
            );
            taken.backend.gen_test(RegClass::Byte, t);
        }
        self.backend.gen_cond_jump(Cond::Eq, next);
        {
            let mut exception = self.scratch(RegClass::Ptr, &[])?;
            let e = exception.reg();
            exception
                .backend
                .gen_load(e, RegClass::Ptr, Addr::Frame(pending));
            exception
                .backend
                .gen_store(e, RegClass::Ptr, Addr::Frame(var.offset));
        }
        self.clear_slot(pending)?;

        if has_finally {
            // an exception thrown by the handler still runs the finally code
            let handler_dispatch = self.backend.new_label();
            self.link_frame(frame, pending, handler_dispatch)?;
            self.cleanups.push(Cleanup::Frame { frame });
            self.gen_block(&clause.body)?;
            self.cleanups.pop();
            self.unlink_frame(frame)?;
            self.backend.gen_jump(after);

            self.backend.bind_label(handler_dispatch);
            self.backend.gen_restore_stack(frame);
            self.unlink_frame(frame)?;
        } else {
            self.gen_block(&clause.body)?;
        }
        self.backend.gen_jump(after);
        self.backend.bind_label(next);
        Ok(())
    }

    fn link_frame(&mut self, frame: i32, pending: i32, dispatch: Label) -> Result<()> {
        {
            let mut tmp = self.scratch(RegClass::Ptr, &[])?;
            let t = tmp.reg();
            let backend = &mut *tmp.backend;
            backend.gen_load(t, RegClass::Ptr, Addr::ThrowFrameHead);
            backend.gen_store(t, RegClass::Ptr, Addr::Frame(frame));
            backend.gen_load_label(t, dispatch);
            backend.gen_store(t, RegClass::Ptr, Addr::Frame(frame + 1));
            backend.gen_load_address(t, Addr::Frame(pending));
            backend.gen_store(t, RegClass::Ptr, Addr::Frame(frame + 2));
            backend.gen_load_address(t, Addr::Frame(frame));
            backend.gen_store(t, RegClass::Ptr, Addr::ThrowFrameHead);
        }
        self.backend.gen_save_stack(frame);
        Ok(())
    }

    fn unlink_frame(&mut self, frame: i32) -> Result<()> {
        let mut tmp = self.scratch(RegClass::Ptr, &[])?;
        let t = tmp.reg();
        tmp.backend.gen_load(t, RegClass::Ptr, Addr::Frame(frame));
        tmp.backend.gen_store(t, RegClass::Ptr, Addr::ThrowFrameHead);
        Ok(())
    }

    fn clear_slot(&mut self, slot: i32) -> Result<()> {
        let mut tmp = self.scratch(RegClass::Ptr, &[])?;
        let t = tmp.reg();
        tmp.load_const(t, RegClass::Ptr, ConstValue::Null);
        tmp.backend.gen_store(t, RegClass::Ptr, Addr::Frame(slot));
        Ok(())
    }

    fn rethrow_pending(&mut self, pending: i32) -> Result<()> {
        let done = self.backend.new_label();
        {
            let mut exception = self.scratch(RegClass::Ptr, &[])?;
            let e = exception.reg();
            exception
                .backend
                .gen_load(e, RegClass::Ptr, Addr::Frame(pending));
            exception.backend.gen_test(RegClass::Ptr, e);
        }
        self.backend.gen_cond_jump(Cond::Eq, done);
        {
            let mut exception = self.arg_scratch(RegClass::Ptr, &[])?;
            let e = exception.reg();
            exception
                .backend
                .gen_load(e, RegClass::Ptr, Addr::Frame(pending));
            exception.backend.gen_push(e, RegClass::Ptr);
            exception.trap(Runtime::Throw, 1);
        }
        self.backend.bind_label(done);
        Ok(())
    }

    fn run_finally(&mut self, action: FinallyAction<'a>) -> Result<()> {
        match action {
            FinallyAction::Block(block) => self.gen_block(block),
            FinallyAction::MonitorExit { lock } => {
                let mut object = self.scratch(RegClass::Ptr, &[])?;
                let o = object.reg();
                object.backend.gen_load(o, RegClass::Ptr, Addr::Frame(lock));
                object.call_runtime(Runtime::MonitorExit, &[(o, RegClass::Ptr)], None);
                Ok(())
            }
        }
    }

    /// Close every region above `depth`, innermost first, before a jump out
    /// of them. Finally code runs with only the regions outside it open.
    pub(super) fn run_cleanups(&mut self, depth: usize) -> Result<()> {
        let open = self.cleanups.clone();
        let mut result = Ok(());
        for (at, cleanup) in open.iter().enumerate().skip(depth).rev() {
            self.cleanups.truncate(at);
            result = match *cleanup {
                Cleanup::Frame { frame } => self.unlink_frame(frame),
                Cleanup::Finally(action) => self.run_finally(action),
            };
            if result.is_err() {
                break;
            }
        }
        self.cleanups = open;
        result
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::build;
    use tern_core::RegClass;

    use crate::emit::backend::{Addr, Callee, Runtime};
    use crate::emit::stream::{Instr, InstrStream};
    use crate::emit::test_support::*;

    fn runtime_calls(code: &InstrStream, routine: Runtime) -> usize {
        code.calls().filter(|c| **c == Callee::Runtime(routine)).count()
    }

    fn head_writes(code: &InstrStream) -> usize {
        code.instrs()
            .iter()
            .filter(|i| matches!(i, Instr::Store { addr: Addr::ThrowFrameHead, .. }))
            .count()
    }

    fn assign_n(value: i32) -> tern_ast::Stmt {
        build::expr_stmt(build::assign(build::var("n"), build::int(value)))
    }

    #[test]
    fn try_links_and_unlinks_the_frame() {
        let code = emit_run(vec![build::try_stmt(
            vec![assign_n(1)],
            vec![build::catch("Error", "e", vec![assign_n(2)])],
            None,
        )])
        .unwrap();
        // link, unlink on the normal path, unlink in the dispatch code
        assert_eq!(head_writes(&code), 3);
        let save = code.position(|i| matches!(i, Instr::SaveStack { .. })).unwrap();
        let restore = code.position(|i| matches!(i, Instr::RestoreStack { .. })).unwrap();
        assert!(save < restore);
        assert!(code.instrs().iter().any(|i| matches!(i, Instr::LoadLabel { .. })));
        assert_eq!(runtime_calls(&code, Runtime::Throw), 1);
    }

    #[test]
    fn catch_clauses_are_tested_in_order() {
        let code = emit_run(vec![build::try_stmt(
            vec![assign_n(1)],
            vec![
                build::catch("Error", "e", vec![assign_n(2)]),
                build::catch("Throwable", "t", vec![assign_n(3)]),
            ],
            None,
        )])
        .unwrap();
        let tests: Vec<_> = code
            .calls()
            .filter_map(|c| match c {
                Callee::Runtime(Runtime::InstanceOf { target }) => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(
            tests,
            [
                tern_core::TypeHash::from_name("Error"),
                tern_core::TypeHash::from_name("Throwable")
            ]
        );
    }

    #[test]
    fn finally_runs_on_break() {
        // while (true) { try { break; } finally { n = 9; } }
        let code = emit_run(vec![build::while_stmt(
            build::boolean(true),
            build::try_stmt(vec![build::brk()], vec![], Some(vec![assign_n(9)])),
        )])
        .unwrap();
        let stores = code
            .instrs()
            .iter()
            .filter(|i| matches!(i, Instr::Store { addr: Addr::Frame(-1), class: RegClass::Int, .. }))
            .count();
        // once before the break, once after the protected body
        assert_eq!(stores, 2);
        let exit = code
            .instrs()
            .iter()
            .position(|i| matches!(i, Instr::Store { addr: Addr::Frame(-1), .. }))
            .unwrap();
        // the frame is unlinked before the finally code runs
        let unlink = code
            .instrs()
            .iter()
            .enumerate()
            .filter(|(_, i)| matches!(i, Instr::Store { addr: Addr::ThrowFrameHead, .. }))
            .nth(1)
            .map(|(at, _)| at)
            .unwrap();
        assert!(unlink < exit);
    }

    #[test]
    fn return_value_survives_the_finally_code() {
        let code = emit_work(vec![build::try_stmt(
            vec![build::ret(Some(build::var("n")))],
            vec![],
            Some(vec![build::expr_stmt(build::assign(build::var("n"), build::int(0)))]),
        )])
        .unwrap();
        let instrs = code.instrs();
        let push = instrs.iter().position(|i| matches!(i, Instr::Push { .. })).unwrap();
        let finally = instrs
            .iter()
            .position(|i| matches!(i, Instr::Store { addr: Addr::Frame(-1), .. }))
            .unwrap();
        let set = instrs.iter().position(|i| matches!(i, Instr::SetResult { .. })).unwrap();
        assert!(push < finally && finally < set);
        assert!(matches!(instrs[set - 1], Instr::Pop { .. }));
    }

    #[test]
    fn handler_with_finally_is_protected() {
        let code = emit_run(vec![build::try_stmt(
            vec![assign_n(1)],
            vec![build::catch("Error", "e", vec![assign_n(2)])],
            Some(vec![assign_n(3)]),
        )])
        .unwrap();
        let links = code.instrs().iter().filter(|i| matches!(i, Instr::LoadLabel { .. })).count();
        assert_eq!(links, 2);
        assert_eq!(code.instrs().iter().filter(|i| matches!(i, Instr::RestoreStack { .. })).count(), 2);
    }

    #[test]
    fn synchronized_releases_the_monitor_on_every_exit() {
        let code = emit_work(vec![build::synchronized(
            build::this(),
            vec![
                build::if_stmt(
                    build::bin(tern_ast::BinaryOp::Greater, build::var("n"), build::int(0)),
                    build::ret(Some(build::int(1))),
                    None,
                ),
            ],
        ), build::ret(Some(build::int(0)))])
        .unwrap();
        assert_eq!(runtime_calls(&code, Runtime::MonitorEnter), 1);
        // early return and the end of the block
        assert_eq!(runtime_calls(&code, Runtime::MonitorExit), 2);
        assert_eq!(runtime_calls(&code, Runtime::Throw), 1);
    }
}

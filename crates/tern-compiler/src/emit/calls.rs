//! Method calls, object creation and array allocation.
//!
//! Every register except the result is pushed before a call sequence starts
//! and popped after it. Arguments are then computed one at a time into a
//! register and pushed, receiver first, so an argument never displaces
//! another register onto the stack in the middle of the argument list.

use tern_ast::{CallExpr, CallTarget, Dispatch, Expr, Receiver};
use tern_core::{DataType, RegClass, Span};

use super::backend::{Addr, Backend, Callee, Reg, Runtime};
use super::{Emitter, Result, unresolved};

/// Where the receiver of a call comes from.
#[derive(Debug, Clone, Copy)]
pub(super) enum ReceiverSource<'x> {
    /// Static call, no receiver.
    None,
    This,
    Expr(&'x Expr),
    /// Reference stored in a frame slot.
    Frame { offset: i32, class: RegClass },
}

impl<'a, B: Backend> Emitter<'a, B> {
    pub(super) fn gen_call(&mut self, call: &CallExpr, span: Span, dst: Option<(Reg, RegClass)>) -> Result<()> {
        let target = call.resolved.as_ref().ok_or_else(|| unresolved("call", span))?;
        if let (Dispatch::Static, Receiver::Expr(object)) = (&target.dispatch, &call.receiver) {
            self.gen_discard(object)?;
        }
        let receiver = match (&target.dispatch, &call.receiver) {
            (Dispatch::Static, _) => ReceiverSource::None,
            (_, Receiver::Implicit | Receiver::Super) => ReceiverSource::This,
            (_, Receiver::Expr(expr)) => ReceiverSource::Expr(expr),
            (_, Receiver::TypeName(_) | Receiver::Static(_)) => {
                return Err(unresolved("call receiver", span));
            }
        };
        self.emit_call(target, receiver, &call.args, dst)
    }

    /// Push receiver and arguments, call `target` and fetch its result.
    pub(super) fn emit_call(
        &mut self,
        target: &CallTarget,
        receiver: ReceiverSource<'_>,
        args: &[Expr],
        dst: Option<(Reg, RegClass)>,
    ) -> Result<()> {
        let keep: Vec<Reg> = dst.map(|(reg, _)| reg).into_iter().collect();
        let mut saved = self.preserve(&keep);
        let dynamic = saved.ctx.options.dynamic_addressing;
        if dynamic {
            saved.backend.gen_save_context();
        }

        let mut words = saved.push_receiver(receiver, &keep)?;
        for arg in args {
            words += saved.push_value(arg, &keep)?;
        }
        let callee = match target.dispatch {
            Dispatch::Static | Dispatch::Direct | Dispatch::DefaultInit => Callee::Direct {
                method: target.method,
            },
            Dispatch::Virtual { slot } => Callee::Virtual { slot },
            Dispatch::Interface { slot, .. } => Callee::Interface { slot },
        };
        saved.backend.gen_call(callee, words);

        if dynamic {
            saved.backend.gen_restore_context();
        }
        if let Some((reg, class)) = dst {
            saved.backend.gen_result(reg, class);
        }
        Ok(())
    }

    fn push_receiver(&mut self, receiver: ReceiverSource<'_>, keep: &[Reg]) -> Result<u32> {
        match receiver {
            ReceiverSource::None => Ok(0),
            ReceiverSource::This => {
                let mut this = self.arg_scratch(RegClass::Ptr, keep)?;
                let r = this.reg();
                this.backend.gen_load(r, RegClass::Ptr, Addr::This);
                this.backend.gen_push(r, RegClass::Ptr);
                Ok(1)
            }
            ReceiverSource::Expr(expr) => {
                let class = self.class_of(expr)?;
                let words = self.words_of(expr)?;
                let mut object = self.arg_scratch(class, keep)?;
                let r = object.reg();
                object.gen_value(expr, r)?;
                object.null_check(r, class);
                object.backend.gen_push(r, class);
                Ok(words)
            }
            ReceiverSource::Frame { offset, class } => {
                let mut object = self.arg_scratch(class, keep)?;
                let r = object.reg();
                object.backend.gen_load(r, class, Addr::Frame(offset));
                object.null_check(r, class);
                object.backend.gen_push(r, class);
                Ok(object.regs.slots_for(class) as u32)
            }
        }
    }

    /// Compute `arg` and push it. Returns the words pushed.
    pub(super) fn push_value(&mut self, arg: &Expr, keep: &[Reg]) -> Result<u32> {
        let class = self.class_of(arg)?;
        let words = self.words_of(arg)?;
        let mut value = self.arg_scratch(class, keep)?;
        let r = value.reg();
        value.gen_value(arg, r)?;
        value.backend.gen_push(r, class);
        Ok(words)
    }

    /// `new T(args)`: allocate, run the constructor on the new object and
    /// leave it in `dst`.
    pub(super) fn gen_new_object(
        &mut self,
        ty: &DataType,
        args: &[Expr],
        target: &CallTarget,
        span: Span,
        dst: Reg,
    ) -> Result<()> {
        let class = ty.class_hash().ok_or_else(|| unresolved("instantiated class", span))?;
        let mut saved = self.preserve(&[dst]);
        let dynamic = saved.ctx.options.dynamic_addressing;
        if dynamic {
            saved.backend.gen_save_context();
        }
        saved
            .backend
            .gen_call(Callee::Runtime(Runtime::NewObject { class }), 0);
        saved.backend.gen_result(dst, RegClass::Ptr);
        // one copy survives the constructor, the other is its receiver
        saved.backend.gen_push(dst, RegClass::Ptr);
        saved.backend.gen_push(dst, RegClass::Ptr);
        let mut words = 1;
        for arg in args {
            words += saved.push_value(arg, &[dst])?;
        }
        saved.backend.gen_call(
            Callee::Direct {
                method: target.method,
            },
            words,
        );
        saved.backend.gen_pop(dst, RegClass::Ptr);
        if dynamic {
            saved.backend.gen_restore_context();
        }
        Ok(())
    }

    /// `new T[a][b]...[]`: the runtime allocates the sized dimensions.
    pub(super) fn gen_new_array(&mut self, ty: &DataType, sizes: &[Expr], span: Span, dst: Reg) -> Result<()> {
        let element = ty.element().ok_or_else(|| unresolved("array type", span))?;
        let element_bytes = element.storage_size(self.ctx.arch.pointer_bytes);
        let routine = Runtime::NewArray {
            element: DataType::scalar(ty.base).type_hash(),
            element_bytes,
            dims: ty.dims,
            sized: sizes.len() as u8,
        };
        let mut saved = self.preserve(&[dst]);
        let dynamic = saved.ctx.options.dynamic_addressing;
        if dynamic {
            saved.backend.gen_save_context();
        }
        let mut words = 0;
        for size in sizes {
            words += saved.push_value(size, &[dst])?;
        }
        saved.backend.gen_call(Callee::Runtime(routine), words);
        if dynamic {
            saved.backend.gen_restore_context();
        }
        saved.backend.gen_result(dst, RegClass::Ptr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::build;
    use tern_core::{PrimitiveKind, RegClass};

    use crate::emit::backend::{Callee, Runtime};
    use crate::emit::stream::Instr;
    use crate::emit::test_support::*;
    use crate::options::CompileOptions;

    #[test]
    fn arguments_follow_the_receiver() {
        let code = emit_run(vec![
            build::local(build::named("Box"), "b", Some(build::new_object("Box", vec![build::int(1)]))),
            build::expr_stmt(build::method_call(build::var("b"), "scale", vec![build::var("n")])),
        ])
        .unwrap();
        let call = code
            .instrs()
            .iter()
            .rev()
            .find_map(|i| match i {
                Instr::Call { callee, arg_words } => Some((*callee, *arg_words)),
                _ => None,
            })
            .unwrap();
        assert!(matches!(call.0, Callee::Virtual { .. } | Callee::Direct { .. }));
        assert_eq!(call.1, 2);
    }

    #[test]
    fn static_calls_push_no_receiver() {
        let code = emit_run(vec![build::local(
            build::named("Box"),
            "b",
            Some(build::static_call("Box", "make", vec![build::int(3)])),
        )])
        .unwrap();
        let pushes = code.instrs().iter().filter(|i| matches!(i, Instr::Push { .. })).count();
        assert_eq!(pushes, 1);
        assert!(code.calls().any(|c| matches!(c, Callee::Direct { .. })));
    }

    #[test]
    fn new_object_keeps_a_copy_across_the_constructor() {
        let code = emit_run(vec![build::local(
            build::named("Box"),
            "b",
            Some(build::new_object("Box", vec![build::int(1)])),
        )])
        .unwrap();
        let instrs = code.instrs();
        let alloc = instrs
            .iter()
            .position(|i| matches!(i, Instr::Call { callee: Callee::Runtime(Runtime::NewObject { .. }), .. }))
            .unwrap();
        let ctor = instrs
            .iter()
            .position(|i| matches!(i, Instr::Call { callee: Callee::Direct { .. }, arg_words: 2 }))
            .unwrap();
        assert!(alloc < ctor);
        assert!(matches!(instrs[ctor + 1], Instr::Pop { class: RegClass::Ptr, .. }));
    }

    #[test]
    fn new_array_passes_each_size() {
        let code = emit_run(vec![build::local(
            build::prim(PrimitiveKind::Int).with_dims(2),
            "grid",
            Some(build::new_array(
                build::prim(PrimitiveKind::Int),
                vec![build::int(3), build::var("n")],
                0,
            )),
        )])
        .unwrap();
        let call = code
            .instrs()
            .iter()
            .find_map(|i| match i {
                Instr::Call { callee: Callee::Runtime(Runtime::NewArray { dims, sized, element_bytes, .. }), arg_words } => {
                    Some((*dims, *sized, *element_bytes, *arg_words))
                }
                _ => None,
            })
            .unwrap();
        // the first level holds pointers to the rows
        assert_eq!(call, (2, 2, 4, 2));
    }

    #[test]
    fn dynamic_addressing_saves_the_context() {
        let options = CompileOptions::default().with_dynamic_addressing(true);
        let code = emit_run_with(
            vec![build::local(
                build::named("Box"),
                "b",
                Some(build::static_call("Box", "make", vec![build::int(3)])),
            )],
            options,
        )
        .unwrap();
        let save = code.position(|i| *i == Instr::SaveContext).unwrap();
        let restore = code.position(|i| *i == Instr::RestoreContext).unwrap();
        let call = code.position(|i| matches!(i, Instr::Call { .. })).unwrap();
        assert!(save < call && call < restore);
    }

    #[test]
    fn static_call_through_a_call_runs_both() {
        // Box.make(1).make(n)
        let made = build::static_call("Box", "make", vec![build::int(1)]);
        let code = emit_run(vec![build::expr_stmt(build::method_call(made, "make", vec![build::var("n")]))]).unwrap();
        let calls: Vec<_> = code
            .instrs()
            .iter()
            .filter_map(|i| match i {
                Instr::Call { callee, arg_words } => Some((*callee, *arg_words)),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        // the outer call still pushes no receiver
        assert!(calls.iter().all(|(callee, words)| matches!(callee, Callee::Direct { .. }) && *words == 1));
    }
}

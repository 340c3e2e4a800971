//! Variables, fields and array elements as memory operands.
//!
//! [`Emitter::with_place`] computes the address of an assignable expression
//! and hands it to a closure while the registers it is built from are still
//! held. A scratch that is alive while the address is used must keep
//! [`Addr::regs`]; one released before that may spill them, since the
//! release pops them back.

use tern_ast::{DerefTarget, Expr, ExprKind, IndexExpr, Receiver, ResolvedVar};
use tern_core::{ArraySpecial, ConstValue, RegClass, Span, StorageClass, TypeHash, VarRef};

use super::backend::{Addr, Backend, Cond, Reg, Runtime};
use super::{Emitter, Result, unresolved};

impl<'a, B: Backend> Emitter<'a, B> {
    /// Run `f` with the address of `expr`, keeping `keep` in registers.
    pub(super) fn with_place<T>(
        &mut self,
        expr: &Expr,
        keep: &[Reg],
        f: impl FnOnce(&mut Self, Addr) -> Result<T>,
    ) -> Result<T> {
        let expr = expr.unparenthesized();
        match &expr.kind {
            ExprKind::Var(var) => {
                let resolved = var
                    .resolved
                    .as_ref()
                    .ok_or_else(|| unresolved("variable", expr.span))?;
                self.with_var(resolved, None, expr.span, keep, f)
            }
            ExprKind::Deref(deref) => match &deref.resolved {
                Some(DerefTarget::Field(resolved)) => {
                    self.with_var(resolved, Some(&deref.receiver), expr.span, keep, f)
                }
                _ => Err(unresolved("field", expr.span)),
            },
            ExprKind::Index(index) => self.with_element(index, keep, f),
            _ => Err(unresolved("assignment target", expr.span)),
        }
    }

    fn with_var<T>(
        &mut self,
        var: &ResolvedVar,
        receiver: Option<&Receiver>,
        span: Span,
        keep: &[Reg],
        f: impl FnOnce(&mut Self, Addr) -> Result<T>,
    ) -> Result<T> {
        // a static field reached through an instance still runs the instance
        if let Some(Receiver::Expr(object)) = receiver
            && !var.storage.is_instance()
        {
            self.gen_discard(object)?;
        }
        match var.storage {
            StorageClass::Local | StorageClass::Parameter => f(self, Addr::Frame(var.offset)),
            StorageClass::ClassScalar => {
                let owner = field_owner(var, span)?;
                f(
                    self,
                    Addr::Static {
                        owner,
                        offset: var.offset,
                    },
                )
            }
            StorageClass::ClassRelocatableReference => {
                let owner = field_owner(var, span)?;
                f(
                    self,
                    Addr::Reloc {
                        owner,
                        slot: var.offset,
                    },
                )
            }
            StorageClass::InstanceScalar | StorageClass::InstanceIndirectScalar => {
                let mut object = self.scratch(RegClass::Ptr, keep)?;
                let o = object.reg();
                match receiver {
                    None | Some(Receiver::Implicit | Receiver::Super) => {
                        object.backend.gen_load(o, RegClass::Ptr, Addr::This);
                    }
                    Some(Receiver::Expr(expr)) => {
                        object.gen_object_ptr(expr, o)?;
                        object.null_check(o, RegClass::Ptr);
                    }
                    Some(Receiver::TypeName(_) | Receiver::Static(_)) => {
                        return Err(unresolved("field receiver", span));
                    }
                }
                if var.storage == StorageClass::InstanceIndirectScalar {
                    object.backend.gen_load(
                        o,
                        RegClass::Ptr,
                        Addr::Indirect {
                            base: o,
                            offset: var.offset,
                        },
                    );
                    f(&mut *object, Addr::Indirect { base: o, offset: 0 })
                } else {
                    f(
                        &mut *object,
                        Addr::Indirect {
                            base: o,
                            offset: var.offset,
                        },
                    )
                }
            }
            StorageClass::CompileTimeConstant => Err(unresolved("constant storage", span)),
        }
    }

    fn with_element<T>(
        &mut self,
        index: &IndexExpr,
        keep: &[Reg],
        f: impl FnOnce(&mut Self, Addr) -> Result<T>,
    ) -> Result<T> {
        let array_ty = self.type_of(&index.array)?;
        let element = array_ty
            .element()
            .ok_or_else(|| unresolved("array element", index.array.span))?;
        let element_bytes = element.storage_size(self.ctx.arch.pointer_bytes);
        let data = self.ctx.arch.array_data_offset(element_bytes);

        let mut base = self.scratch(RegClass::Ptr, keep)?;
        let b = base.reg();
        base.gen_value(&index.array, b)?;
        base.null_check(b, RegClass::Ptr);
        let mut held = keep.to_vec();
        held.push(b);

        // a constant index folds into the displacement when it fits
        let folded = match index.index.constant() {
            Some(ConstValue::Int(i)) => i
                .checked_mul(element_bytes as i32)
                .and_then(|bytes| bytes.checked_add(data))
                .map(|offset| (i, offset)),
            _ => None,
        };
        if let Some((i, offset)) = folded {
            {
                let mut at = base.scratch(RegClass::Int, &held)?;
                let k = at.reg();
                if at.needs_bound_check(array_ty.special) {
                    at.load_const(k, RegClass::Int, ConstValue::Int(i));
                    at.bound_check(b, k, array_ty.special)?;
                }
            }
            return f(&mut *base, Addr::Indirect { base: b, offset });
        }

        let mut at = base.scratch(RegClass::Int, &held)?;
        let k = at.reg();
        at.gen_value(&index.index, k)?;
        at.bound_check(b, k, array_ty.special)?;
        f(
            &mut *at,
            Addr::Indexed {
                base: b,
                index: k,
                scale: element_bytes as u8,
                offset: data,
            },
        )
    }

    fn needs_bound_check(&self, special: ArraySpecial) -> bool {
        self.ctx.options.array_bound_checks && special != ArraySpecial::Unchecked
    }

    /// Trap unless `0 <= index < length` of the array in `array`.
    pub(super) fn bound_check(&mut self, array: Reg, index: Reg, special: ArraySpecial) -> Result<()> {
        if !self.needs_bound_check(special) {
            return Ok(());
        }
        let ok = self.backend.new_label();
        {
            let mut len = self.scratch(RegClass::Int, &[array, index])?;
            let l = len.reg();
            match special {
                ArraySpecial::Inline(bound) => {
                    len.load_const(l, RegClass::Int, ConstValue::Int(bound as i32))
                }
                _ => {
                    let offset = len.ctx.arch.array_length_offset();
                    len.backend
                        .gen_load(l, RegClass::Int, Addr::Indirect { base: array, offset });
                }
            }
            len.backend.gen_compare(RegClass::Int, index, l);
        }
        // unsigned, so a negative index is out of range as well
        self.backend.gen_cond_jump(Cond::Below, ok);
        self.trap(Runtime::IndexOutOfBounds, 0);
        self.backend.bind_label(ok);
        Ok(())
    }
}

fn field_owner(var: &ResolvedVar, span: Span) -> Result<TypeHash> {
    match var.var {
        VarRef::Field { owner, .. } => Ok(owner),
        VarRef::Local { .. } => Err(unresolved("static field", span)),
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::build;
    use tern_core::{PrimitiveKind, RegClass};

    use crate::emit::backend::{Addr, Callee, Cond, Runtime};
    use crate::emit::stream::Instr;
    use crate::emit::test_support::*;
    use crate::options::CompileOptions;

    fn traps(code: &crate::emit::stream::InstrStream, routine: Runtime) -> usize {
        code.calls().filter(|c| **c == Callee::Runtime(routine)).count()
    }

    #[test]
    fn field_through_a_receiver() {
        let code = emit_work(vec![build::ret(Some(build::field(
            build::new_object("Box", vec![build::int(2)]),
            "width",
        )))])
        .unwrap();
        assert!(code.instrs().iter().any(|i| matches!(
            i,
            Instr::Load { class: RegClass::Int, addr: Addr::Indirect { .. }, .. }
        )));
        assert_eq!(traps(&code, Runtime::NullPointer), 1);
    }

    #[test]
    fn static_fields_use_the_class_block() {
        let code = emit_run(vec![build::expr_stmt(build::assign(
            build::static_field("Box", "count"),
            build::var("n"),
        ))])
        .unwrap();
        assert!(code.instrs().iter().any(|i| matches!(
            i,
            Instr::Store { addr: Addr::Static { .. }, class: RegClass::Int, .. }
        )));
    }

    #[test]
    fn element_access_checks_bounds() {
        let body = || {
            vec![
                build::local(
                    build::prim(PrimitiveKind::Int).with_dims(1),
                    "a",
                    Some(build::new_array(build::prim(PrimitiveKind::Int), vec![build::int(4)], 0)),
                ),
                build::expr_stmt(build::assign(build::index(build::var("a"), build::var("n")), build::int(1))),
            ]
        };
        let code = emit_run(body()).unwrap();
        assert_eq!(traps(&code, Runtime::IndexOutOfBounds), 1);
        assert!(code.instrs().iter().any(|i| matches!(i, Instr::CondJump { cond: Cond::Below, .. })));
        assert!(code.instrs().iter().any(|i| matches!(
            i,
            Instr::Store { addr: Addr::Indexed { scale: 4, offset: 8, .. }, .. }
        )));

        let unchecked = emit_run_with(
            body(),
            CompileOptions::default()
                .with_array_bound_checks(false)
                .with_null_checks(false),
        )
        .unwrap();
        assert_eq!(traps(&unchecked, Runtime::IndexOutOfBounds), 0);
        assert_eq!(traps(&unchecked, Runtime::NullPointer), 0);
    }

    #[test]
    fn constant_index_folds_into_the_offset() {
        let code = emit_run(vec![
            build::local(
                build::prim(PrimitiveKind::Int).with_dims(1),
                "a",
                Some(build::new_array(build::prim(PrimitiveKind::Int), vec![build::int(4)], 0)),
            ),
            build::expr_stmt(build::assign(build::index(build::var("a"), build::int(2)), build::int(1))),
        ])
        .unwrap();
        assert!(code.instrs().iter().any(|i| matches!(
            i,
            Instr::Store { addr: Addr::Indirect { offset: 16, .. }, class: RegClass::Int, .. }
        )));
    }

    #[test]
    fn huge_constant_index_goes_through_a_register() {
        // long[] a = new long[n]; a[300000000] = 1L;
        let code = emit_run(vec![
            build::local(
                build::prim(PrimitiveKind::Long).with_dims(1),
                "a",
                Some(build::new_array(build::prim(PrimitiveKind::Long), vec![build::var("n")], 0)),
            ),
            build::expr_stmt(build::assign(
                build::index(build::var("a"), build::int(300_000_000)),
                build::long(1),
            )),
        ])
        .unwrap();
        assert!(code.instrs().iter().any(|i| matches!(
            i,
            Instr::Store { addr: Addr::Indexed { scale: 8, .. }, .. }
        )));
        assert!(!code.instrs().iter().any(|i| matches!(
            i,
            Instr::Store { addr: Addr::Indirect { offset, .. }, .. } if *offset < 0
        )));
        assert_eq!(traps(&code, Runtime::IndexOutOfBounds), 1);
    }
}

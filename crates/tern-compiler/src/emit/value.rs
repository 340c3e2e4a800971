//! Expressions computed into registers.

use tern_ast::{
    AssignExpr, BinaryExpr, Conversion, DerefExpr, DerefTarget, Expr, ExprKind, Intrinsic,
    IntrinsicExpr, Literal, NewExpr, Receiver, ResolvedVar, TernaryExpr, UnaryExpr, UnaryOp,
};
use tern_core::{ArraySpecial, ConstValue, DataType, NullKind, RegClass, Span, StorageClass, VarRef};

use super::backend::{Addr, ArithOp, Backend, Reg, Runtime, UnaOp};
use super::{Emitter, Result, unresolved};

impl<'a, B: Backend> Emitter<'a, B> {
    /// Compute `expr` into `dst`, a live register of the expression's class.
    pub(super) fn gen_value(&mut self, expr: &Expr, dst: Reg) -> Result<()> {
        let ty = self.type_of(expr)?;
        let class = self.class_of(expr)?;
        if let Some(value) = expr.constant() {
            self.load_const(dst, class, value);
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Literal(Literal::String(text)) => {
                let index = self.strings.intern(text);
                self.backend.gen_load_string(dst, index);
            }
            ExprKind::Literal(_) => return Err(unresolved("literal", expr.span)),
            ExprKind::This => self.backend.gen_load(dst, RegClass::Ptr, Addr::This),
            ExprKind::Var(_) | ExprKind::Index(_) => self.load_place(expr, dst, class)?,
            ExprKind::Deref(deref) => match &deref.resolved {
                Some(DerefTarget::Field(var)) if var.storage == StorageClass::CompileTimeConstant => {
                    self.gen_constant_field(deref, var, expr.span, dst, class)?
                }
                Some(DerefTarget::Field(_)) => self.load_place(expr, dst, class)?,
                Some(DerefTarget::ArrayLength) => self.gen_array_length(deref, expr.span, dst)?,
                None => return Err(unresolved("field", expr.span)),
            },
            ExprKind::Binary(bin) => self.gen_binary(expr, bin, dst, class)?,
            ExprKind::Unary(unary) => self.gen_unary(expr, unary, dst, class)?,
            ExprKind::Postfix(postfix) => {
                self.gen_update(&postfix.operand, postfix.op.is_increment(), false, Some(dst))?
            }
            ExprKind::Assign(assign) => self.gen_assign(assign, Some(dst))?,
            ExprKind::Ternary(ternary) => self.gen_ternary(ternary, dst)?,
            ExprKind::Call(call) => self.gen_call(call, expr.span, Some((dst, class)))?,
            ExprKind::New(NewExpr::Object { args, resolved, .. }) => {
                let target = resolved
                    .as_ref()
                    .ok_or_else(|| unresolved("constructor", expr.span))?;
                self.gen_new_object(&ty, args, target, expr.span, dst)?
            }
            ExprKind::New(NewExpr::Array { sizes, .. }) => self.gen_new_array(&ty, sizes, expr.span, dst)?,
            ExprKind::Cast(cast) => {
                let conversion = cast
                    .conversion
                    .ok_or_else(|| unresolved("cast", expr.span))?;
                self.gen_conversion(&cast.operand, conversion, &ty, dst)?
            }
            ExprKind::Convert(convert) => {
                self.gen_conversion(&convert.operand, convert.conversion, &ty, dst)?
            }
            ExprKind::InstanceOf(test) => {
                let target = test
                    .resolved
                    .ok_or_else(|| unresolved("instanceof", expr.span))?;
                let mut obj = self.scratch(RegClass::Ptr, &[dst])?;
                let r = obj.reg();
                obj.gen_object_ptr(&test.operand, r)?;
                obj.call_runtime(
                    Runtime::InstanceOf {
                        target: target.type_hash(),
                    },
                    &[(r, RegClass::Ptr)],
                    Some((dst, RegClass::Byte)),
                );
            }
            ExprKind::Enclosure(inner) => self.gen_value(inner, dst)?,
            ExprKind::Intrinsic(intrinsic) => self.gen_intrinsic(intrinsic, expr.span, Some((dst, class)))?,
        }
        Ok(())
    }

    /// Evaluate `expr` for its effect only.
    pub(super) fn gen_discard(&mut self, expr: &Expr) -> Result<()> {
        let expr = expr.unparenthesized();
        match &expr.kind {
            ExprKind::Assign(assign) => self.gen_assign(assign, None),
            ExprKind::Postfix(postfix) => {
                self.gen_update(&postfix.operand, postfix.op.is_increment(), false, None)
            }
            ExprKind::Unary(unary) if unary.op.is_update() => {
                self.gen_update(&unary.operand, unary.op == UnaryOp::PreInc, true, None)
            }
            ExprKind::Call(call) => self.gen_call(call, expr.span, None),
            ExprKind::Intrinsic(intrinsic) => self.gen_intrinsic(intrinsic, expr.span, None),
            _ if !expr.has_effect() => Ok(()),
            _ => {
                let class = self.class_of(expr)?;
                let mut tmp = self.scratch(class, &[])?;
                let r = tmp.reg();
                tmp.gen_value(expr, r)
            }
        }
    }

    /// Compute a boolean expression into `dst` as 0 or 1.
    fn materialize(&mut self, expr: &Expr, dst: Reg) -> Result<()> {
        let no = self.backend.new_label();
        let end = self.backend.new_label();
        self.gen_cond_jump(expr, false, no)?;
        self.load_const(dst, RegClass::Byte, ConstValue::Bool(true));
        self.backend.gen_jump(end);
        self.backend.bind_label(no);
        self.load_const(dst, RegClass::Byte, ConstValue::Bool(false));
        self.backend.bind_label(end);
        Ok(())
    }

    fn load_place(&mut self, expr: &Expr, dst: Reg, class: RegClass) -> Result<()> {
        self.with_place(expr, &[dst], |e, addr| {
            e.backend.gen_load(dst, class, addr);
            Ok(())
        })
    }

    /// Evaluate a reference as a plain object pointer, dropping the interface
    /// map of an interface reference.
    pub(super) fn gen_object_ptr(&mut self, expr: &Expr, dst: Reg) -> Result<()> {
        match self.class_of(expr)? {
            RegClass::DoublePtr => {
                let mut wide = self.scratch(RegClass::DoublePtr, &[dst])?;
                let r = wide.reg();
                wide.gen_value(expr, r)?;
                wide.backend
                    .gen_convert(dst, RegClass::Ptr, r, RegClass::DoublePtr);
                Ok(())
            }
            _ => self.gen_value(expr, dst),
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn gen_binary(&mut self, expr: &Expr, bin: &BinaryExpr, dst: Reg, class: RegClass) -> Result<()> {
        if bin.op.is_short_circuit() || bin.op.is_comparison() {
            return self.materialize(expr, dst);
        }
        let op = ArithOp::from_binary(bin.op).ok_or_else(|| unresolved("operator", expr.span))?;
        self.gen_value(&bin.left, dst)?;
        let right_class = self.class_of(&bin.right)?;
        let mut right = self.scratch(right_class, &[dst])?;
        let r = right.reg();
        right.gen_value(&bin.right, r)?;
        right.backend.gen_bin_op(op, class, dst, r);
        Ok(())
    }

    fn gen_unary(&mut self, expr: &Expr, unary: &UnaryExpr, dst: Reg, class: RegClass) -> Result<()> {
        match unary.op {
            UnaryOp::Plus => self.gen_value(&unary.operand, dst),
            UnaryOp::Neg | UnaryOp::BitwiseNot => {
                self.gen_value(&unary.operand, dst)?;
                let op = if unary.op == UnaryOp::Neg {
                    UnaOp::Neg
                } else {
                    UnaOp::Not
                };
                self.backend.gen_una_op(op, class, dst);
                Ok(())
            }
            UnaryOp::LogicalNot => self.materialize(expr, dst),
            UnaryOp::PreInc | UnaryOp::PreDec => {
                self.gen_update(&unary.operand, unary.op == UnaryOp::PreInc, true, Some(dst))
            }
        }
    }

    fn gen_ternary(&mut self, ternary: &TernaryExpr, dst: Reg) -> Result<()> {
        if let Some(taken) = ternary.cond.constant().and_then(ConstValue::as_bool) {
            let branch = if taken {
                &ternary.then_expr
            } else {
                &ternary.else_expr
            };
            return self.gen_value(branch, dst);
        }
        let other = self.backend.new_label();
        let end = self.backend.new_label();
        self.gen_cond_jump(&ternary.cond, false, other)?;
        self.gen_value(&ternary.then_expr, dst)?;
        self.backend.gen_jump(end);
        self.backend.bind_label(other);
        self.gen_value(&ternary.else_expr, dst)?;
        self.backend.bind_label(end);
        Ok(())
    }

    /// Simple or compound assignment. The stored value lands in `dst` too
    /// when the assignment is used as a value.
    pub(super) fn gen_assign(&mut self, assign: &AssignExpr, dst: Option<Reg>) -> Result<()> {
        let target_class = self.class_of(&assign.target)?;
        let keep: Vec<Reg> = dst.into_iter().collect();

        let Some(op) = assign.op.binary_op() else {
            return self.with_place(&assign.target, &keep, |e, addr| {
                let mut keep = addr.regs();
                keep.extend(dst);
                let mut value = e.scratch(target_class, &keep)?;
                let v = value.reg();
                value.gen_value(&assign.value, v)?;
                value.backend.gen_store(v, target_class, addr);
                if let Some(dst) = dst {
                    value.backend.gen_move(dst, v, target_class);
                }
                Ok(())
            });
        };

        let arith = ArithOp::from_binary(op).ok_or_else(|| unresolved("operator", assign.value.span))?;
        let op_class = match assign.op_type {
            Some(ty) => ty
                .reg_class()
                .ok_or_else(|| unresolved("compound operand", assign.value.span))?,
            None => target_class,
        };
        let value_class = self.class_of(&assign.value)?;
        self.with_place(&assign.target, &keep, |e, addr| {
            let mut keep = addr.regs();
            keep.extend(dst);
            let mut current = e.scratch(target_class, &keep)?;
            let c = current.reg();
            current.backend.gen_load(c, target_class, addr);
            // the address and `dst` are not touched again until the operand
            // is released and pops them back, so only the accumulator stays
            if op_class == target_class {
                let mut value = current.scratch(value_class, &[c])?;
                let v = value.reg();
                value.gen_value(&assign.value, v)?;
                value.backend.gen_bin_op(arith, op_class, c, v);
            } else {
                let mut wide = current.scratch(op_class, &[c])?;
                let w = wide.reg();
                wide.backend.gen_convert(w, op_class, c, target_class);
                {
                    let mut value = wide.scratch(value_class, &[w])?;
                    let v = value.reg();
                    value.gen_value(&assign.value, v)?;
                    value.backend.gen_bin_op(arith, op_class, w, v);
                }
                wide.backend.gen_convert(c, target_class, w, op_class);
            }
            current.backend.gen_store(c, target_class, addr);
            if let Some(dst) = dst {
                current.backend.gen_move(dst, c, target_class);
            }
            Ok(())
        })
    }

    /// `++`/`--` in either position.
    pub(super) fn gen_update(
        &mut self,
        target: &Expr,
        increment: bool,
        prefix: bool,
        dst: Option<Reg>,
    ) -> Result<()> {
        let class = self.class_of(target)?;
        let one = match class {
            RegClass::Long => ConstValue::Long(1),
            RegClass::Float => ConstValue::from_f32(1.0),
            RegClass::Double => ConstValue::from_f64(1.0),
            _ => ConstValue::Int(1),
        };
        let op = if increment { ArithOp::Add } else { ArithOp::Sub };
        let keep: Vec<Reg> = dst.into_iter().collect();
        self.with_place(target, &keep, |e, addr| {
            let mut keep = addr.regs();
            keep.extend(dst);
            let mut current = e.scratch(class, &keep)?;
            let c = current.reg();
            current.backend.gen_load(c, class, addr);
            if let Some(dst) = dst
                && !prefix
            {
                current.backend.gen_move(dst, c, class);
            }
            {
                let mut step = current.scratch(class, &[c])?;
                let s = step.reg();
                step.load_const(s, class, one);
                step.backend.gen_bin_op(op, class, c, s);
            }
            current.backend.gen_store(c, class, addr);
            if let Some(dst) = dst
                && prefix
            {
                current.backend.gen_move(dst, c, class);
            }
            Ok(())
        })
    }

    /// A constant field read through an instance that has to be evaluated.
    fn gen_constant_field(
        &mut self,
        deref: &DerefExpr,
        var: &ResolvedVar,
        span: Span,
        dst: Reg,
        class: RegClass,
    ) -> Result<()> {
        let VarRef::Field { field, .. } = var.var else {
            return Err(unresolved("constant field", span));
        };
        let value = self
            .ctx
            .registry
            .field(field)
            .and_then(|entry| entry.constant)
            .ok_or_else(|| unresolved("constant field", span))?;
        if let Receiver::Expr(object) = &deref.receiver {
            self.gen_discard(object)?;
        }
        self.load_const(dst, class, value);
        Ok(())
    }

    fn gen_array_length(&mut self, deref: &DerefExpr, span: Span, dst: Reg) -> Result<()> {
        let Receiver::Expr(array) = &deref.receiver else {
            return Err(unresolved("array length receiver", span));
        };
        let special = self.type_of(array)?.special;
        let mut base = self.scratch(RegClass::Ptr, &[dst])?;
        let b = base.reg();
        base.gen_value(array, b)?;
        match special {
            ArraySpecial::Inline(len) => base.load_const(dst, RegClass::Int, ConstValue::Int(len as i32)),
            ArraySpecial::None | ArraySpecial::Unchecked => {
                base.null_check(b, RegClass::Ptr);
                let offset = base.ctx.arch.array_length_offset();
                base.backend
                    .gen_load(dst, RegClass::Int, Addr::Indirect { base: b, offset });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Evaluate `operand` and convert it to `ty` in `dst`.
    fn gen_conversion(&mut self, operand: &Expr, conversion: Conversion, ty: &DataType, dst: Reg) -> Result<()> {
        let class = ty
            .reg_class()
            .ok_or_else(|| unresolved("conversion target", operand.span))?;
        match conversion {
            Conversion::Identity | Conversion::Upcast => self.gen_value(operand, dst),
            Conversion::NullRetype(_) => {
                self.gen_discard(operand)?;
                self.load_const(dst, class, ConstValue::Null);
                Ok(())
            }
            Conversion::Downcast { .. } | Conversion::ArrayCast => {
                self.gen_object_ptr(operand, dst)?;
                self.convert_reg(dst, RegClass::Ptr, conversion, ty, dst)
            }
            _ => {
                let from = self.class_of(operand)?;
                let mut src = self.scratch(from, &[dst])?;
                let s = src.reg();
                src.gen_value(operand, s)?;
                src.convert_reg(s, from, conversion, ty, dst)
            }
        }
    }

    /// Apply `conversion` to the value in `src`, leaving a `ty` in `dst`.
    /// Both registers are live; they may be the same register when the
    /// representation does not change width.
    pub(super) fn convert_reg(
        &mut self,
        src: Reg,
        from: RegClass,
        conversion: Conversion,
        ty: &DataType,
        dst: Reg,
    ) -> Result<()> {
        let Some(to) = ty.reg_class() else {
            return Ok(());
        };
        match conversion {
            Conversion::Identity | Conversion::Upcast => {
                if src != dst {
                    self.backend.gen_move(dst, src, to);
                }
            }
            Conversion::Primitive { .. } | Conversion::InterfaceToObject => {
                self.backend.gen_convert(dst, to, src, from)
            }
            Conversion::NullRetype(kind) => {
                let class = if kind == NullKind::Interface {
                    RegClass::DoublePtr
                } else {
                    RegClass::Ptr
                };
                self.load_const(dst, class, ConstValue::Null);
            }
            Conversion::ToInterface { iface } => {
                self.call_runtime(
                    Runtime::FindInterface { iface },
                    &[(src, RegClass::Ptr)],
                    Some((dst, RegClass::DoublePtr)),
                );
            }
            Conversion::InterfaceToInterface { iface } => {
                let mut object = self.scratch(RegClass::Ptr, &[src, dst])?;
                let o = object.reg();
                object
                    .backend
                    .gen_convert(o, RegClass::Ptr, src, RegClass::DoublePtr);
                object.call_runtime(
                    Runtime::FindInterface { iface },
                    &[(o, RegClass::Ptr)],
                    Some((dst, RegClass::DoublePtr)),
                );
            }
            Conversion::Downcast { target } => {
                if src != dst {
                    self.backend.gen_move(dst, src, RegClass::Ptr);
                }
                if self.ctx.options.runtime_cast_checks {
                    self.call_runtime(
                        Runtime::CheckCast { target },
                        &[(dst, RegClass::Ptr)],
                        Some((dst, RegClass::Ptr)),
                    );
                }
            }
            Conversion::ArrayCast => {
                if src != dst {
                    self.backend.gen_move(dst, src, RegClass::Ptr);
                }
                if self.ctx.options.runtime_cast_checks {
                    self.call_runtime(
                        Runtime::CheckCast {
                            target: ty.type_hash(),
                        },
                        &[(dst, RegClass::Ptr)],
                        Some((dst, RegClass::Ptr)),
                    );
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Intrinsics
    // =========================================================================

    fn gen_intrinsic(&mut self, call: &IntrinsicExpr, span: Span, dst: Option<(Reg, RegClass)>) -> Result<()> {
        let address = call.args.first().ok_or_else(|| unresolved("intrinsic operand", span))?;
        let keep: Vec<Reg> = dst.map(|(reg, _)| reg).into_iter().collect();
        match &call.intrinsic {
            Intrinsic::WriteMem(_) => {
                let value = call.args.get(1).ok_or_else(|| unresolved("intrinsic operand", span))?;
                let addr_class = self.ctx.arch.address_class();
                let value_class = self.class_of(value)?;
                let mut base = self.scratch(addr_class, &keep)?;
                let a = base.reg();
                base.gen_value(address, a)?;
                let mut stored = base.scratch(value_class, &[a])?;
                let v = stored.reg();
                stored.gen_value(value, v)?;
                stored.backend
                    .gen_store(v, value_class, Addr::Indirect { base: a, offset: 0 });
                Ok(())
            }
            Intrinsic::ReadMem(_) => {
                let Some((dst, class)) = dst else {
                    return self.gen_discard(address);
                };
                let addr_class = self.ctx.arch.address_class();
                let mut base = self.scratch(addr_class, &keep)?;
                let a = base.reg();
                base.gen_value(address, a)?;
                base.backend
                    .gen_load(dst, class, Addr::Indirect { base: a, offset: 0 });
                Ok(())
            }
            Intrinsic::AddressOf => {
                let Some((dst, _)) = dst else {
                    return Ok(());
                };
                self.with_place(address, &keep, |e, addr| {
                    e.backend.gen_load_address(dst, addr);
                    Ok(())
                })
            }
            Intrinsic::CastToRef(_) | Intrinsic::RefToAddress => {
                let Some((dst, class)) = dst else {
                    return self.gen_discard(address);
                };
                let from = self.class_of(address)?;
                let mut src = self.scratch(from, &keep)?;
                let s = src.reg();
                src.gen_value(address, s)?;
                src.backend.gen_convert(dst, class, s, from);
                Ok(())
            }
        }
    }
}

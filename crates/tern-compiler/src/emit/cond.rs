//! Conditions compiled straight to jumps.
//!
//! `&&`, `||` and `!` never produce a boolean value here: each operand jumps
//! to the target or falls through, so the right operand of a short-circuit
//! operator is only reached when it decides the result.

use tern_ast::{BinaryExpr, BinaryOp, Expr, ExprKind, UnaryOp};
use tern_core::{ConstValue, RegClass};

use super::backend::{Backend, Cond, Label};
use super::{Emitter, Result, unresolved};

impl<'a, B: Backend> Emitter<'a, B> {
    /// Jump to `target` when `expr` evaluates to `jump_if`, fall through
    /// otherwise.
    pub(super) fn gen_cond_jump(&mut self, expr: &Expr, jump_if: bool, target: Label) -> Result<()> {
        if let Some(value) = expr.constant() {
            if value.as_bool() == Some(jump_if) {
                self.backend.gen_jump(target);
            }
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Enclosure(inner) => self.gen_cond_jump(inner, jump_if, target),
            ExprKind::Unary(unary) if unary.op == UnaryOp::LogicalNot => {
                self.gen_cond_jump(&unary.operand, !jump_if, target)
            }
            ExprKind::Binary(bin) if bin.op == BinaryOp::LogicalAnd => {
                if jump_if {
                    let skip = self.backend.new_label();
                    self.gen_cond_jump(&bin.left, false, skip)?;
                    self.gen_cond_jump(&bin.right, true, target)?;
                    self.backend.bind_label(skip);
                } else {
                    self.gen_cond_jump(&bin.left, false, target)?;
                    self.gen_cond_jump(&bin.right, false, target)?;
                }
                Ok(())
            }
            ExprKind::Binary(bin) if bin.op == BinaryOp::LogicalOr => {
                if jump_if {
                    self.gen_cond_jump(&bin.left, true, target)?;
                    self.gen_cond_jump(&bin.right, true, target)?;
                } else {
                    let skip = self.backend.new_label();
                    self.gen_cond_jump(&bin.left, true, skip)?;
                    self.gen_cond_jump(&bin.right, false, target)?;
                    self.backend.bind_label(skip);
                }
                Ok(())
            }
            ExprKind::Binary(bin) if bin.op.is_comparison() => {
                self.gen_compare_jump(expr, bin, jump_if, target)
            }
            _ => {
                {
                    let mut flag = self.scratch(RegClass::Byte, &[])?;
                    let f = flag.reg();
                    flag.gen_value(expr, f)?;
                    flag.backend.gen_test(RegClass::Byte, f);
                }
                let cond = if jump_if { Cond::Ne } else { Cond::Eq };
                self.backend.gen_cond_jump(cond, target);
                Ok(())
            }
        }
    }

    fn gen_compare_jump(&mut self, expr: &Expr, bin: &BinaryExpr, jump_if: bool, target: Label) -> Result<()> {
        let class = self.class_of(&bin.left)?;
        let cond = Cond::from_binary(bin.op).ok_or_else(|| unresolved("comparison", expr.span))?;
        let cond = if jump_if {
            cond
        } else {
            cond.negate(class.is_float())
        };
        let against_zero = !class.is_float()
            && bin
                .right
                .constant()
                .is_some_and(|v| v.is_integral_zero() || v == ConstValue::Null);
        {
            let mut left = self.scratch(class, &[])?;
            let l = left.reg();
            left.gen_value(&bin.left, l)?;
            if against_zero {
                left.backend.gen_test(class, l);
            } else {
                let mut right = left.scratch(class, &[l])?;
                let r = right.reg();
                right.gen_value(&bin.right, r)?;
                right.backend.gen_compare(class, l, r);
            }
        }
        // releasing the operands only pops, which keeps the flags
        self.backend.gen_cond_jump(cond, target);
        Ok(())
    }
}

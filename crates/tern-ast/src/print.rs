//! Source-like printing of expressions for diagnostics.
//!
//! Parentheses are only emitted where the operator table requires them, plus
//! wherever the source had an explicit [`ExprKind::Enclosure`].

use std::fmt::{self, Write};

use crate::expr::{Expr, ExprKind, Intrinsic, Literal, NewExpr, Receiver};
use crate::ops::{AssignOp, BinaryOp, PostfixOp, TERNARY_BINDING_POWER, UnaryOp};

const PRIMARY: u8 = u8::MAX;

/// Binding power of the outermost operator of `expr`.
fn binding_power(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary(b) => b.op.binding_power().0,
        ExprKind::InstanceOf(_) => BinaryOp::Less.binding_power().0,
        ExprKind::Assign(_) => AssignOp::binding_power().0,
        ExprKind::Ternary(_) => TERNARY_BINDING_POWER.0,
        ExprKind::Unary(_) | ExprKind::Cast(_) => UnaryOp::binding_power(),
        ExprKind::Postfix(_) => PostfixOp::binding_power(),
        ExprKind::Convert(c) => binding_power(&c.operand),
        _ => PRIMARY,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_bp: u8) -> fmt::Result {
    if binding_power(expr) < min_bp {
        f.write_char('(')?;
        write_expr(f, expr)?;
        f.write_char(')')
    } else {
        write_expr(f, expr)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    f.write_char('(')?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_expr(f, arg)?;
    }
    f.write_char(')')
}

fn write_receiver(f: &mut fmt::Formatter<'_>, receiver: &Receiver) -> fmt::Result {
    match receiver {
        Receiver::Implicit | Receiver::Static(_) => Ok(()),
        Receiver::Super => f.write_str("super."),
        Receiver::TypeName(name) => write!(f, "{name}."),
        Receiver::Expr(expr) => {
            write_operand(f, expr, PRIMARY)?;
            f.write_char('.')
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, literal: &Literal) -> fmt::Result {
    match literal {
        Literal::Int(v) => write!(f, "{v}"),
        Literal::Long(v) => write!(f, "{v}L"),
        Literal::Float(bits) => write!(f, "{:?}f", f32::from_bits(*bits)),
        Literal::Double(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
        Literal::Bool(b) => write!(f, "{b}"),
        Literal::Char(c) => match char::from_u32(*c as u32) {
            Some(ch) => write!(f, "'{}'", ch.escape_default()),
            None => write!(f, "'\\u{c:04x}'"),
        },
        Literal::Null => f.write_str("null"),
        Literal::String(s) => write!(f, "\"{}\"", s.escape_default()),
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match &expr.kind {
        ExprKind::Literal(literal) => write_literal(f, literal),
        ExprKind::Var(var) => f.write_str(&var.name),
        ExprKind::This => f.write_str("this"),
        ExprKind::Binary(b) => {
            let (l_bp, r_bp) = b.op.binding_power();
            write_operand(f, &b.left, l_bp)?;
            write!(f, " {} ", b.op)?;
            write_operand(f, &b.right, r_bp)
        }
        ExprKind::Unary(u) => {
            write!(f, "{}", u.op)?;
            // keep `- -x` from printing as `--x`
            if let ExprKind::Unary(inner) = &u.operand.kind {
                if matches!(
                    (u.op, inner.op),
                    (UnaryOp::Neg, UnaryOp::Neg | UnaryOp::PreDec)
                        | (UnaryOp::Plus, UnaryOp::Plus | UnaryOp::PreInc)
                ) {
                    f.write_char(' ')?;
                }
            }
            write_operand(f, &u.operand, UnaryOp::binding_power())
        }
        ExprKind::Postfix(p) => {
            write_operand(f, &p.operand, PostfixOp::binding_power())?;
            write!(f, "{}", p.op)
        }
        ExprKind::Assign(a) => {
            let (_, r_bp) = AssignOp::binding_power();
            write_operand(f, &a.target, TERNARY_BINDING_POWER.0 + 1)?;
            write!(f, " {} ", a.op)?;
            write_operand(f, &a.value, r_bp)
        }
        ExprKind::Ternary(t) => {
            let (_, r_bp) = TERNARY_BINDING_POWER;
            write_operand(f, &t.cond, TERNARY_BINDING_POWER.0 + 1)?;
            f.write_str(" ? ")?;
            write_operand(f, &t.then_expr, r_bp)?;
            f.write_str(" : ")?;
            write_operand(f, &t.else_expr, r_bp)
        }
        ExprKind::Call(call) => {
            write_receiver(f, &call.receiver)?;
            f.write_str(&call.name)?;
            write_args(f, &call.args)
        }
        ExprKind::New(NewExpr::Object { ty, args, .. }) => {
            write!(f, "new {ty}")?;
            write_args(f, args)
        }
        ExprKind::New(NewExpr::Array {
            element,
            sizes,
            extra_dims,
        }) => {
            write!(f, "new {element}")?;
            for size in sizes {
                f.write_char('[')?;
                write_expr(f, size)?;
                f.write_char(']')?;
            }
            for _ in 0..*extra_dims {
                f.write_str("[]")?;
            }
            Ok(())
        }
        ExprKind::Deref(deref) => {
            write_receiver(f, &deref.receiver)?;
            f.write_str(&deref.name)
        }
        ExprKind::Index(index) => {
            write_operand(f, &index.array, PRIMARY)?;
            f.write_char('[')?;
            write_expr(f, &index.index)?;
            f.write_char(']')
        }
        ExprKind::Cast(cast) => {
            write!(f, "({}) ", cast.ty)?;
            write_operand(f, &cast.operand, UnaryOp::binding_power())
        }
        ExprKind::Convert(conv) => write_expr(f, &conv.operand),
        ExprKind::InstanceOf(inst) => {
            let (l_bp, _) = BinaryOp::Less.binding_power();
            write_operand(f, &inst.operand, l_bp)?;
            write!(f, " instanceof {}", inst.ty)
        }
        ExprKind::Enclosure(inner) => {
            f.write_char('(')?;
            write_expr(f, inner)?;
            f.write_char(')')
        }
        ExprKind::Intrinsic(intr) => {
            f.write_str(intr.intrinsic.name())?;
            match &intr.intrinsic {
                Intrinsic::ReadMem(kind) | Intrinsic::WriteMem(kind) => write!(f, "<{kind}>")?,
                Intrinsic::CastToRef(ty) => write!(f, "<{ty}>")?,
                Intrinsic::AddressOf | Intrinsic::RefToAddress => {}
            }
            write_args(f, &intr.args)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self)
    }
}

#[cfg(test)]
mod tests {
    use crate::build::*;
    use crate::ops::BinaryOp;

    #[test]
    fn minimal_parentheses() {
        let e = bin(BinaryOp::Mul, bin(BinaryOp::Add, var("a"), var("b")), var("c"));
        assert_eq!(e.to_string(), "(a + b) * c");

        let e = bin(BinaryOp::Add, var("a"), bin(BinaryOp::Mul, var("b"), var("c")));
        assert_eq!(e.to_string(), "a + b * c");
    }

    #[test]
    fn left_associativity() {
        let e = bin(BinaryOp::Sub, bin(BinaryOp::Sub, var("a"), var("b")), var("c"));
        assert_eq!(e.to_string(), "a - b - c");

        let e = bin(BinaryOp::Sub, var("a"), bin(BinaryOp::Sub, var("b"), var("c")));
        assert_eq!(e.to_string(), "a - (b - c)");
    }

    #[test]
    fn ternary_and_assignment() {
        let e = assign(var("x"), ternary(var("c"), int(1), int(2)));
        assert_eq!(e.to_string(), "x = c ? 1 : 2");
    }

    #[test]
    fn calls_and_literals() {
        let e = method_call(var("list"), "add", vec![long(3), string("hi")]);
        assert_eq!(e.to_string(), "list.add(3L, \"hi\")");
    }
}

//! The abstract register machine code is generated against.
//!
//! A [`Backend`] turns each primitive into target instructions. The code
//! generator never sees the instruction encoding: it hands over registers,
//! addresses, labels and runtime routines, and the backend decides how they
//! map onto the real machine.

use std::fmt;

use tern_ast::BinaryOp;
use tern_core::{ConstValue, RegClass, TypeHash};

/// A virtual register handle.
///
/// Wide values on 32-bit targets and interface references occupy two
/// consecutive slots; `slots` records how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    pub index: u16,
    pub slots: u8,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.slots > 1 {
            write!(f, "r{}:{}", self.index, self.index + self.slots as u16 - 1)
        } else {
            write!(f, "r{}", self.index)
        }
    }
}

/// A jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addr {
    /// Frame word of the current method; parameters are negative.
    Frame(i32),
    /// The incoming `this` pointer.
    This,
    /// `base + offset`.
    Indirect { base: Reg, offset: i32 },
    /// `base + index * scale + offset`.
    Indexed {
        base: Reg,
        index: Reg,
        scale: u8,
        offset: i32,
    },
    /// Static field at a fixed offset in the class's static block.
    Static { owner: TypeHash, offset: i32 },
    /// Static reference reached through a relocation-table slot.
    Reloc { owner: TypeHash, slot: i32 },
    /// Head of the throw-frame chain.
    ThrowFrameHead,
}

impl Addr {
    /// Registers the operand reads.
    pub fn regs(&self) -> Vec<Reg> {
        match *self {
            Addr::Indirect { base, .. } => vec![base],
            Addr::Indexed { base, index, .. } => vec![base, index],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addr::Frame(offset) => write!(f, "[fp{offset:+}]"),
            Addr::This => f.write_str("[this]"),
            Addr::Indirect { base, offset } => write!(f, "[{base}{offset:+}]"),
            Addr::Indexed {
                base,
                index,
                scale,
                offset,
            } => write!(f, "[{base}+{index}*{scale}{offset:+}]"),
            Addr::Static { owner, offset } => write!(f, "[static {owner}{offset:+}]"),
            Addr::Reloc { owner, slot } => write!(f, "[reloc {owner}#{slot}]"),
            Addr::ThrowFrameHead => f.write_str("[throw-frame]"),
        }
    }
}

/// Two-operand arithmetic: `dst = dst op src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

impl ArithOp {
    pub fn from_binary(op: BinaryOp) -> Option<ArithOp> {
        Some(match op {
            BinaryOp::Add => ArithOp::Add,
            BinaryOp::Sub => ArithOp::Sub,
            BinaryOp::Mul => ArithOp::Mul,
            BinaryOp::Div => ArithOp::Div,
            BinaryOp::Mod => ArithOp::Rem,
            BinaryOp::BitwiseAnd => ArithOp::And,
            BinaryOp::BitwiseOr => ArithOp::Or,
            BinaryOp::BitwiseXor => ArithOp::Xor,
            BinaryOp::ShiftLeft => ArithOp::Shl,
            BinaryOp::ShiftRight => ArithOp::Shr,
            BinaryOp::ShiftRightUnsigned => ArithOp::Ushr,
            _ => return None,
        })
    }
}

/// One-operand arithmetic in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaOp {
    Neg,
    Not,
}

/// Condition of a conditional jump, read from the flags of the last compare.
///
/// Float compares are unordered when either side is NaN. The plain relations
/// are false then; the `Unord*` forms are true. Negating one form gives the
/// other, so an inverted jump still goes the right way on NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Unsigned `<`, used for bound checks.
    Below,
    /// Unsigned `>=`.
    AboveEq,
    UnordLt,
    UnordLe,
    UnordGt,
    UnordGe,
}

impl Cond {
    /// Condition of a comparison operator.
    pub fn from_binary(op: BinaryOp) -> Option<Cond> {
        Some(match op {
            BinaryOp::Equal => Cond::Eq,
            BinaryOp::NotEqual => Cond::Ne,
            BinaryOp::Less => Cond::Lt,
            BinaryOp::LessEqual => Cond::Le,
            BinaryOp::Greater => Cond::Gt,
            BinaryOp::GreaterEqual => Cond::Ge,
            _ => return None,
        })
    }

    /// The condition that holds exactly when `self` does not.
    pub fn negate(self, float: bool) -> Cond {
        match (self, float) {
            (Cond::Eq, _) => Cond::Ne,
            (Cond::Ne, _) => Cond::Eq,
            (Cond::Below, _) => Cond::AboveEq,
            (Cond::AboveEq, _) => Cond::Below,
            (Cond::Lt, false) => Cond::Ge,
            (Cond::Le, false) => Cond::Gt,
            (Cond::Gt, false) => Cond::Le,
            (Cond::Ge, false) => Cond::Lt,
            (Cond::Lt, true) => Cond::UnordGe,
            (Cond::Le, true) => Cond::UnordGt,
            (Cond::Gt, true) => Cond::UnordLe,
            (Cond::Ge, true) => Cond::UnordLt,
            (Cond::UnordLt, _) => Cond::Ge,
            (Cond::UnordLe, _) => Cond::Gt,
            (Cond::UnordGt, _) => Cond::Le,
            (Cond::UnordGe, _) => Cond::Lt,
        }
    }
}

/// Routines of the runtime support library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// `() -> object`, zeroed with its vtable installed.
    NewObject { class: TypeHash },
    /// `(length...) -> array`, one length per sized dimension.
    NewArray {
        element: TypeHash,
        element_bytes: u32,
        dims: u8,
        sized: u8,
    },
    /// `(object) -> interface reference`; null stays null.
    FindInterface { iface: TypeHash },
    /// `(object) -> object`, throws when a non-null object is not a `target`.
    CheckCast { target: TypeHash },
    /// `(object) -> bool`
    InstanceOf { target: TypeHash },
    /// `(exception)`, never returns.
    Throw,
    /// `(lock)`
    MonitorEnter,
    /// `(lock)`
    MonitorExit,
    /// Never returns.
    NullPointer,
    /// Never returns.
    IndexOutOfBounds,
    /// `(message or null)`, never returns.
    AssertFailed,
}

/// Target of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    /// Method at a fixed address.
    Direct { method: TypeHash },
    /// Through the vtable of the receiver, the first pushed argument.
    Virtual { slot: u32 },
    /// Through the interface map half of the interface reference pushed as
    /// the first argument.
    Interface { slot: u32 },
    Runtime(Runtime),
}

/// The register machine.
///
/// Arguments are pushed left to right, receiver first; `gen_call` removes
/// them again once the callee returns. Every register is caller-saved.
/// `gen_pop` and `gen_move` leave the flags alone.
pub trait Backend {
    fn new_label(&mut self) -> Label;
    fn bind_label(&mut self, label: Label);

    /// Method prologue: reserve `frame_bytes` for locals.
    fn gen_enter(&mut self, frame_bytes: u32, param_words: u32);
    /// Method epilogue and return.
    fn gen_leave(&mut self, param_words: u32);

    fn gen_load_const(&mut self, dst: Reg, class: RegClass, value: ConstValue);
    /// Address of entry `index` of the constant-string table.
    fn gen_load_string(&mut self, dst: Reg, index: u32);
    /// Code address of `label`.
    fn gen_load_label(&mut self, dst: Reg, label: Label);
    fn gen_load(&mut self, dst: Reg, class: RegClass, addr: Addr);
    fn gen_store(&mut self, src: Reg, class: RegClass, addr: Addr);
    fn gen_load_address(&mut self, dst: Reg, addr: Addr);
    fn gen_move(&mut self, dst: Reg, src: Reg, class: RegClass);

    fn gen_bin_op(&mut self, op: ArithOp, class: RegClass, dst: Reg, src: Reg);
    fn gen_una_op(&mut self, op: UnaOp, class: RegClass, reg: Reg);
    /// `dst = (to) src`, where `src` holds a `from`.
    fn gen_convert(&mut self, dst: Reg, to: RegClass, src: Reg, from: RegClass);

    /// Set the flags from `left - right`.
    fn gen_compare(&mut self, class: RegClass, left: Reg, right: Reg);
    /// Set the flags from `reg` against zero or null.
    fn gen_test(&mut self, class: RegClass, reg: Reg);
    fn gen_cond_jump(&mut self, cond: Cond, target: Label);
    fn gen_jump(&mut self, target: Label);

    fn gen_push(&mut self, src: Reg, class: RegClass);
    fn gen_pop(&mut self, dst: Reg, class: RegClass);
    fn gen_call(&mut self, callee: Callee, arg_words: u32);
    /// Fetch the return value of the last call.
    fn gen_result(&mut self, dst: Reg, class: RegClass);
    /// Place the method's return value.
    fn gen_set_result(&mut self, src: Reg, class: RegClass);

    /// Record stack and frame pointer in words 3 and 4 of a throw frame.
    fn gen_save_stack(&mut self, frame: i32);
    /// Reload them when the dispatch code of that frame is entered.
    fn gen_restore_stack(&mut self, frame: i32);

    /// Save the class-context register of dynamically addressed code.
    fn gen_save_context(&mut self);
    fn gen_restore_context(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_an_involution() {
        let all = [
            Cond::Eq,
            Cond::Ne,
            Cond::Lt,
            Cond::Le,
            Cond::Gt,
            Cond::Ge,
            Cond::Below,
            Cond::AboveEq,
        ];
        for cond in all {
            assert_eq!(cond.negate(false).negate(false), cond);
        }
        for cond in [Cond::Lt, Cond::Le, Cond::Gt, Cond::Ge] {
            assert_eq!(cond.negate(true).negate(true), cond);
        }
    }

    #[test]
    fn float_negation_is_unordered() {
        assert_eq!(Cond::Lt.negate(true), Cond::UnordGe);
        assert_eq!(Cond::Lt.negate(false), Cond::Ge);
        // NaN != x is true, so `!=` is already the unordered form
        assert_eq!(Cond::Eq.negate(true), Cond::Ne);
    }

    #[test]
    fn operator_mapping() {
        assert_eq!(ArithOp::from_binary(BinaryOp::Mod), Some(ArithOp::Rem));
        assert_eq!(ArithOp::from_binary(BinaryOp::Less), None);
        assert_eq!(Cond::from_binary(BinaryOp::GreaterEqual), Some(Cond::Ge));
        assert_eq!(Cond::from_binary(BinaryOp::LogicalAnd), None);
    }
}

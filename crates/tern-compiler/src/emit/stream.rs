//! A backend that records every primitive.
//!
//! [`InstrStream`] is the linear instruction stream handed to the linker, and
//! what tests inspect to check generated code.

use std::fmt;

use tern_core::{ConstValue, RegClass};

use super::backend::{Addr, ArithOp, Backend, Callee, Cond, Label, Reg, UnaOp};

/// One recorded primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Bind(Label),
    Enter { frame_bytes: u32, param_words: u32 },
    Leave { param_words: u32 },
    LoadConst { dst: Reg, class: RegClass, value: ConstValue },
    LoadString { dst: Reg, index: u32 },
    LoadLabel { dst: Reg, label: Label },
    Load { dst: Reg, class: RegClass, addr: Addr },
    Store { src: Reg, class: RegClass, addr: Addr },
    LoadAddress { dst: Reg, addr: Addr },
    Move { dst: Reg, src: Reg, class: RegClass },
    BinOp { op: ArithOp, class: RegClass, dst: Reg, src: Reg },
    UnaOp { op: UnaOp, class: RegClass, reg: Reg },
    Convert { dst: Reg, to: RegClass, src: Reg, from: RegClass },
    Compare { class: RegClass, left: Reg, right: Reg },
    Test { class: RegClass, reg: Reg },
    CondJump { cond: Cond, target: Label },
    Jump(Label),
    Push { src: Reg, class: RegClass },
    Pop { dst: Reg, class: RegClass },
    Call { callee: Callee, arg_words: u32 },
    Result { dst: Reg, class: RegClass },
    SetResult { src: Reg, class: RegClass },
    SaveStack { frame: i32 },
    RestoreStack { frame: i32 },
    SaveContext,
    RestoreContext,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Bind(label) => write!(f, "{label}:"),
            Instr::Enter {
                frame_bytes,
                param_words,
            } => write!(f, "  enter {frame_bytes}, {param_words}"),
            Instr::Leave { param_words } => write!(f, "  leave {param_words}"),
            Instr::LoadConst { dst, class, value } => write!(f, "  const.{class:?} {dst}, {value}"),
            Instr::LoadString { dst, index } => write!(f, "  string {dst}, #{index}"),
            Instr::LoadLabel { dst, label } => write!(f, "  label {dst}, {label}"),
            Instr::Load { dst, class, addr } => write!(f, "  load.{class:?} {dst}, {addr}"),
            Instr::Store { src, class, addr } => write!(f, "  store.{class:?} {addr}, {src}"),
            Instr::LoadAddress { dst, addr } => write!(f, "  lea {dst}, {addr}"),
            Instr::Move { dst, src, class } => write!(f, "  mov.{class:?} {dst}, {src}"),
            Instr::BinOp { op, class, dst, src } => write!(f, "  {op:?}.{class:?} {dst}, {src}"),
            Instr::UnaOp { op, class, reg } => write!(f, "  {op:?}.{class:?} {reg}"),
            Instr::Convert { dst, to, src, from } => write!(f, "  cvt.{from:?}.{to:?} {dst}, {src}"),
            Instr::Compare { class, left, right } => write!(f, "  cmp.{class:?} {left}, {right}"),
            Instr::Test { class, reg } => write!(f, "  test.{class:?} {reg}"),
            Instr::CondJump { cond, target } => write!(f, "  j{cond:?} {target}"),
            Instr::Jump(target) => write!(f, "  jmp {target}"),
            Instr::Push { src, class } => write!(f, "  push.{class:?} {src}"),
            Instr::Pop { dst, class } => write!(f, "  pop.{class:?} {dst}"),
            Instr::Call { callee, arg_words } => write!(f, "  call {callee:?}, {arg_words}"),
            Instr::Result { dst, class } => write!(f, "  result.{class:?} {dst}"),
            Instr::SetResult { src, class } => write!(f, "  ret.{class:?} {src}"),
            Instr::SaveStack { frame } => write!(f, "  savesp [fp{frame:+}]"),
            Instr::RestoreStack { frame } => write!(f, "  restoresp [fp{frame:+}]"),
            Instr::SaveContext => f.write_str("  savectx"),
            Instr::RestoreContext => f.write_str("  restorectx"),
        }
    }
}

/// Recording backend.
#[derive(Debug, Default, Clone)]
pub struct InstrStream {
    instrs: Vec<Instr>,
    next_label: u32,
}

impl InstrStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Position of the first instruction matching `pred`.
    pub fn position(&self, pred: impl Fn(&Instr) -> bool) -> Option<usize> {
        self.instrs.iter().position(pred)
    }

    /// Position of the instruction binding `label`.
    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.position(|instr| *instr == Instr::Bind(label))
    }

    /// Calls in emission order.
    pub fn calls(&self) -> impl Iterator<Item = &Callee> {
        self.instrs.iter().filter_map(|instr| match instr {
            Instr::Call { callee, .. } => Some(callee),
            _ => None,
        })
    }

    fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }
}

impl fmt::Display for InstrStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instrs {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

impl Backend for InstrStream {
    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn bind_label(&mut self, label: Label) {
        self.push(Instr::Bind(label));
    }

    fn gen_enter(&mut self, frame_bytes: u32, param_words: u32) {
        self.push(Instr::Enter {
            frame_bytes,
            param_words,
        });
    }

    fn gen_leave(&mut self, param_words: u32) {
        self.push(Instr::Leave { param_words });
    }

    fn gen_load_const(&mut self, dst: Reg, class: RegClass, value: ConstValue) {
        self.push(Instr::LoadConst { dst, class, value });
    }

    fn gen_load_string(&mut self, dst: Reg, index: u32) {
        self.push(Instr::LoadString { dst, index });
    }

    fn gen_load_label(&mut self, dst: Reg, label: Label) {
        self.push(Instr::LoadLabel { dst, label });
    }

    fn gen_load(&mut self, dst: Reg, class: RegClass, addr: Addr) {
        self.push(Instr::Load { dst, class, addr });
    }

    fn gen_store(&mut self, src: Reg, class: RegClass, addr: Addr) {
        self.push(Instr::Store { src, class, addr });
    }

    fn gen_load_address(&mut self, dst: Reg, addr: Addr) {
        self.push(Instr::LoadAddress { dst, addr });
    }

    fn gen_move(&mut self, dst: Reg, src: Reg, class: RegClass) {
        self.push(Instr::Move { dst, src, class });
    }

    fn gen_bin_op(&mut self, op: ArithOp, class: RegClass, dst: Reg, src: Reg) {
        self.push(Instr::BinOp { op, class, dst, src });
    }

    fn gen_una_op(&mut self, op: UnaOp, class: RegClass, reg: Reg) {
        self.push(Instr::UnaOp { op, class, reg });
    }

    fn gen_convert(&mut self, dst: Reg, to: RegClass, src: Reg, from: RegClass) {
        self.push(Instr::Convert { dst, to, src, from });
    }

    fn gen_compare(&mut self, class: RegClass, left: Reg, right: Reg) {
        self.push(Instr::Compare { class, left, right });
    }

    fn gen_test(&mut self, class: RegClass, reg: Reg) {
        self.push(Instr::Test { class, reg });
    }

    fn gen_cond_jump(&mut self, cond: Cond, target: Label) {
        self.push(Instr::CondJump { cond, target });
    }

    fn gen_jump(&mut self, target: Label) {
        self.push(Instr::Jump(target));
    }

    fn gen_push(&mut self, src: Reg, class: RegClass) {
        self.push(Instr::Push { src, class });
    }

    fn gen_pop(&mut self, dst: Reg, class: RegClass) {
        self.push(Instr::Pop { dst, class });
    }

    fn gen_call(&mut self, callee: Callee, arg_words: u32) {
        self.push(Instr::Call { callee, arg_words });
    }

    fn gen_result(&mut self, dst: Reg, class: RegClass) {
        self.push(Instr::Result { dst, class });
    }

    fn gen_set_result(&mut self, src: Reg, class: RegClass) {
        self.push(Instr::SetResult { src, class });
    }

    fn gen_save_stack(&mut self, frame: i32) {
        self.push(Instr::SaveStack { frame });
    }

    fn gen_restore_stack(&mut self, frame: i32) {
        self.push(Instr::RestoreStack { frame });
    }

    fn gen_save_context(&mut self) {
        self.push(Instr::SaveContext);
    }

    fn gen_restore_context(&mut self) {
        self.push(Instr::RestoreContext);
    }
}

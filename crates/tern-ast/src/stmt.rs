//! Statement nodes.
//!
//! Each statement carries the [`FlowResult`] its resolve produced, so the code
//! generator can skip emitting jumps after statements that never complete.

use tern_core::{DataType, FlowResult, Span, TypeHash};

use crate::annot::{ForEachPlan, LocalSlot, TrySlots};
use crate::expr::Expr;
use crate::types::TypeRef;

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub flow: FlowResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Block statement
    Block(Block),
    /// Expression statement (expr;)
    Expr(Expr),
    /// Variable declaration
    VarDecl(VarDeclStmt),
    /// If statement
    If(IfStmt),
    /// While loop
    While(WhileStmt),
    /// Do-while loop
    DoWhile(DoWhileStmt),
    /// Classic for loop
    For(ForStmt),
    /// Enhanced for loop over an array or iterator
    ForEach(ForEachStmt),
    /// Switch statement
    Switch(SwitchStmt),
    /// Synchronized block
    Synchronized(SynchronizedStmt),
    /// Try-catch-finally
    Try(TryStmt),
    /// Return statement
    Return(Option<Expr>),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Throw statement
    Throw(Expr),
    /// Assert statement
    Assert(AssertStmt),
    /// Empty statement (`;`)
    Empty,
}

/// A block of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub is_final: bool,
    pub slot: Option<LocalSlot>,
    pub resolved: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub cond: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Vec<Stmt>,
    pub cond: Option<Expr>,
    pub update: Vec<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStmt {
    pub var_type: TypeRef,
    pub name: String,
    pub iterable: Expr,
    pub body: Box<Stmt>,
    pub var_slot: Option<LocalSlot>,
    pub plan: Option<ForEachPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub selector: Expr,
    pub cases: Vec<SwitchCase>,
}

/// One group of `case` labels sharing a body.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Empty for a lone `default:`.
    pub labels: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizedStmt {
    pub lock: Expr,
    pub body: Block,
    pub lock_slot: Option<LocalSlot>,
    /// Throw frame releasing the monitor when an exception leaves the body.
    pub slots: Option<TrySlots>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
    pub slots: Option<TrySlots>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub ty: TypeRef,
    pub name: String,
    pub body: Block,
    pub span: Span,
    pub class: Option<TypeHash>,
    pub var_slot: Option<LocalSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertStmt {
    pub cond: Expr,
    pub message: Option<Expr>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span,
            flow: FlowResult::NO_CHANGE,
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

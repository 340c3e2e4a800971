//! Node constructors.
//!
//! The parser builds nodes through these, and tests use them to write method
//! bodies without source text. All nodes start with a default span; use
//! [`Expr::at`] and [`Stmt::at`] to attach a real one.

use tern_core::{PrimitiveKind, Span};

use crate::expr::*;
use crate::ops::{AssignOp, BinaryOp, PostfixOp, UnaryOp};
use crate::stmt::*;
use crate::types::TypeRef;

impl Expr {
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Stmt {
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub fn int(value: i32) -> Expr {
    expr(ExprKind::Literal(Literal::Int(value)))
}

pub fn long(value: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Long(value)))
}

pub fn float(value: f32) -> Expr {
    expr(ExprKind::Literal(Literal::Float(value.to_bits())))
}

pub fn double(value: f64) -> Expr {
    expr(ExprKind::Literal(Literal::Double(value.to_bits())))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Literal(Literal::Bool(value)))
}

pub fn char_lit(value: char) -> Expr {
    expr(ExprKind::Literal(Literal::Char(value as u32 as u16)))
}

pub fn null() -> Expr {
    expr(ExprKind::Literal(Literal::Null))
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::Literal(Literal::String(value.to_string())))
}

pub fn var(name: &str) -> Expr {
    expr(ExprKind::Var(VarExpr {
        name: name.to_string(),
        resolved: None,
    }))
}

pub fn this() -> Expr {
    expr(ExprKind::This)
}

pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    expr(ExprKind::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }))
}

pub fn and(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::LogicalAnd, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::LogicalOr, left, right)
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary(UnaryExpr {
        op,
        operand: Box::new(operand),
    }))
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::LogicalNot, operand)
}

pub fn neg(operand: Expr) -> Expr {
    unary(UnaryOp::Neg, operand)
}

pub fn postfix(op: PostfixOp, operand: Expr) -> Expr {
    expr(ExprKind::Postfix(PostfixExpr {
        op,
        operand: Box::new(operand),
    }))
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    compound(AssignOp::Assign, target, value)
}

pub fn compound(op: AssignOp, target: Expr, value: Expr) -> Expr {
    expr(ExprKind::Assign(AssignExpr {
        op,
        target: Box::new(target),
        value: Box::new(value),
        op_type: None,
    }))
}

pub fn ternary(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    expr(ExprKind::Ternary(TernaryExpr {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    }))
}

/// Call by bare name.
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    call_on(Receiver::Implicit, name, args)
}

pub fn method_call(receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call_on(Receiver::Expr(Box::new(receiver)), name, args)
}

pub fn static_call(type_name: &str, name: &str, args: Vec<Expr>) -> Expr {
    call_on(Receiver::TypeName(type_name.to_string()), name, args)
}

pub fn super_call(name: &str, args: Vec<Expr>) -> Expr {
    call_on(Receiver::Super, name, args)
}

fn call_on(receiver: Receiver, name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call(CallExpr {
        receiver,
        name: name.to_string(),
        args,
        resolved: None,
    }))
}

pub fn new_object(type_name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::New(NewExpr::Object {
        ty: TypeRef::named(type_name),
        args,
        resolved: None,
    }))
}

pub fn new_array(element: TypeRef, sizes: Vec<Expr>, extra_dims: u8) -> Expr {
    expr(ExprKind::New(NewExpr::Array {
        element,
        sizes,
        extra_dims,
    }))
}

pub fn field(receiver: Expr, name: &str) -> Expr {
    deref_on(Receiver::Expr(Box::new(receiver)), name)
}

pub fn static_field(type_name: &str, name: &str) -> Expr {
    deref_on(Receiver::TypeName(type_name.to_string()), name)
}

fn deref_on(receiver: Receiver, name: &str) -> Expr {
    expr(ExprKind::Deref(DerefExpr {
        receiver,
        name: name.to_string(),
        resolved: None,
    }))
}

pub fn index(array: Expr, idx: Expr) -> Expr {
    expr(ExprKind::Index(IndexExpr {
        array: Box::new(array),
        index: Box::new(idx),
    }))
}

pub fn cast(ty: TypeRef, operand: Expr) -> Expr {
    expr(ExprKind::Cast(CastExpr {
        ty,
        operand: Box::new(operand),
        conversion: None,
    }))
}

pub fn instance_of(operand: Expr, ty: TypeRef) -> Expr {
    expr(ExprKind::InstanceOf(InstanceOfExpr {
        operand: Box::new(operand),
        ty,
        resolved: None,
    }))
}

pub fn paren(inner: Expr) -> Expr {
    expr(ExprKind::Enclosure(Box::new(inner)))
}

pub fn intrinsic(intrinsic: Intrinsic, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Intrinsic(IntrinsicExpr { intrinsic, args }))
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

pub fn prim(kind: PrimitiveKind) -> TypeRef {
    TypeRef::primitive(kind)
}

pub fn named(name: &str) -> TypeRef {
    TypeRef::named(name)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub fn block_of(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts, Span::default())
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(block_of(stmts)))
}

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

pub fn local(ty: TypeRef, name: &str, init: Option<Expr>) -> Stmt {
    stmt(StmtKind::VarDecl(VarDeclStmt {
        ty,
        name: name.to_string(),
        init,
        is_final: false,
        slot: None,
        resolved: None,
    }))
}

pub fn final_local(ty: TypeRef, name: &str, init: Option<Expr>) -> Stmt {
    let mut decl = local(ty, name, init);
    if let StmtKind::VarDecl(v) = &mut decl.kind {
        v.is_final = true;
    }
    decl
}

pub fn if_stmt(cond: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        cond,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    }))
}

pub fn while_stmt(cond: Expr, body: Stmt) -> Stmt {
    stmt(StmtKind::While(WhileStmt {
        cond,
        body: Box::new(body),
    }))
}

pub fn do_while(body: Stmt, cond: Expr) -> Stmt {
    stmt(StmtKind::DoWhile(DoWhileStmt {
        body: Box::new(body),
        cond,
    }))
}

pub fn for_stmt(init: Vec<Stmt>, cond: Option<Expr>, update: Vec<Expr>, body: Stmt) -> Stmt {
    stmt(StmtKind::For(ForStmt {
        init,
        cond,
        update,
        body: Box::new(body),
    }))
}

pub fn for_each(var_type: TypeRef, name: &str, iterable: Expr, body: Stmt) -> Stmt {
    stmt(StmtKind::ForEach(ForEachStmt {
        var_type,
        name: name.to_string(),
        iterable,
        body: Box::new(body),
        var_slot: None,
        plan: None,
    }))
}

pub fn switch(selector: Expr, cases: Vec<SwitchCase>) -> Stmt {
    stmt(StmtKind::Switch(SwitchStmt { selector, cases }))
}

pub fn case(labels: Vec<Expr>, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase {
        labels,
        is_default: false,
        body,
        span: Span::default(),
    }
}

pub fn default_case(body: Vec<Stmt>) -> SwitchCase {
    SwitchCase {
        labels: Vec::new(),
        is_default: true,
        body,
        span: Span::default(),
    }
}

pub fn synchronized(lock: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Synchronized(SynchronizedStmt {
        lock,
        body: block_of(body),
        lock_slot: None,
        slots: None,
    }))
}

pub fn try_stmt(body: Vec<Stmt>, catches: Vec<CatchClause>, finally: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Try(TryStmt {
        body: block_of(body),
        catches,
        finally: finally.map(block_of),
        slots: None,
    }))
}

pub fn catch(type_name: &str, name: &str, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        ty: TypeRef::named(type_name),
        name: name.to_string(),
        body: block_of(body),
        span: Span::default(),
        class: None,
        var_slot: None,
    }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Return(value))
}

pub fn brk() -> Stmt {
    stmt(StmtKind::Break)
}

pub fn cont() -> Stmt {
    stmt(StmtKind::Continue)
}

pub fn throw(value: Expr) -> Stmt {
    stmt(StmtKind::Throw(value))
}

pub fn assert_stmt(cond: Expr, message: Option<Expr>) -> Stmt {
    stmt(StmtKind::Assert(AssertStmt { cond, message }))
}

pub fn empty() -> Stmt {
    stmt(StmtKind::Empty)
}

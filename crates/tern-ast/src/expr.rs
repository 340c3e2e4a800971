//! Expression nodes.
//!
//! Every node carries its [`Span`] and an [`ExprInfo`] slot that is empty
//! until the resolver visits it. The resolver may also rewrite a node in
//! place, e.g. to wrap an operand in an implicit [`ConvertExpr`] or to swap
//! the operands of a comparison.

use tern_core::{ConstValue, DataType, PrimitiveKind, Span, TypeHash};

use crate::annot::{CallTarget, Conversion, DerefTarget, ExprInfo, ResolvedVar};
use crate::ops::{AssignOp, BinaryOp, PostfixOp, UnaryOp};
use crate::types::TypeRef;

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub info: Option<ExprInfo>,
}

/// The kind of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Literal),
    /// Variable reference by simple name
    Var(VarExpr),
    /// `this`
    This,
    /// Binary operation
    Binary(BinaryExpr),
    /// Unary prefix operation
    Unary(UnaryExpr),
    /// Postfix increment or decrement
    Postfix(PostfixExpr),
    /// Assignment, simple or compound
    Assign(AssignExpr),
    /// Ternary conditional (`? :`)
    Ternary(TernaryExpr),
    /// Method call
    Call(CallExpr),
    /// `new` of an object or an array
    New(NewExpr),
    /// Field access or array length (`a.b`)
    Deref(DerefExpr),
    /// Array element access
    Index(IndexExpr),
    /// Explicit cast written in source
    Cast(CastExpr),
    /// Implicit conversion inserted by the resolver
    Convert(ConvertExpr),
    /// `instanceof`
    InstanceOf(InstanceOfExpr),
    /// Parenthesized expression
    Enclosure(Box<Expr>),
    /// System-access primitive
    Intrinsic(IntrinsicExpr),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    /// IEEE-754 bits of a `float` literal.
    Float(u32),
    /// IEEE-754 bits of a `double` literal.
    Double(u64),
    Bool(bool),
    Char(u16),
    Null,
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarExpr {
    pub name: String,
    pub resolved: Option<ResolvedVar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr {
    pub op: AssignOp,
    pub target: Box<Expr>,
    pub value: Box<Expr>,
    /// Type a compound operator computes in before narrowing back.
    pub op_type: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpr {
    pub cond: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
}

/// The receiver written before a member name.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// Bare name: implicit `this` or the enclosing type.
    Implicit,
    /// `super.m()`
    Super,
    /// `expr.m()`
    Expr(Box<Expr>),
    /// `Type.m()` as written in source.
    TypeName(String),
    /// Declaring type of a static member, after resolution.
    Static(TypeHash),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub receiver: Receiver,
    pub name: String,
    pub args: Vec<Expr>,
    pub resolved: Option<CallTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewExpr {
    /// `new T(args)`
    Object {
        ty: TypeRef,
        args: Vec<Expr>,
        resolved: Option<CallTarget>,
    },
    /// `new T[n][m][]`
    Array {
        element: TypeRef,
        sizes: Vec<Expr>,
        /// Trailing dimensions without a size.
        extra_dims: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerefExpr {
    pub receiver: Receiver,
    pub name: String,
    pub resolved: Option<DerefTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub ty: TypeRef,
    pub operand: Box<Expr>,
    pub conversion: Option<Conversion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertExpr {
    pub operand: Box<Expr>,
    pub conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOfExpr {
    pub operand: Box<Expr>,
    pub ty: TypeRef,
    pub resolved: Option<DataType>,
}

/// System-access primitives for bare-metal code.
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsic {
    /// Load a primitive from an absolute address.
    ReadMem(PrimitiveKind),
    /// Store a primitive to an absolute address.
    WriteMem(PrimitiveKind),
    /// Address of a variable or field.
    AddressOf,
    /// Reinterpret an address as a reference.
    CastToRef(TypeRef),
    /// Reinterpret a reference as an address.
    RefToAddress,
}

impl Intrinsic {
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::ReadMem(_) => "rmem",
            Intrinsic::WriteMem(_) => "wmem",
            Intrinsic::AddressOf => "addr",
            Intrinsic::CastToRef(_) => "cast2Ref",
            Intrinsic::RefToAddress => "cast2Addr",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Intrinsic::WriteMem(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicExpr {
    pub intrinsic: Intrinsic,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            info: None,
        }
    }

    /// Resolved type, if the resolver has visited this node.
    pub fn data_type(&self) -> Option<DataType> {
        self.info.map(|info| info.data_type)
    }

    /// Folded value, if any.
    pub fn constant(&self) -> Option<ConstValue> {
        self.info.and_then(|info| info.constant)
    }

    pub fn is_constant(&self) -> bool {
        self.constant().is_some()
    }

    pub fn has_effect(&self) -> bool {
        self.info.is_some_and(|info| info.effect)
    }

    /// Strips enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Enclosure(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    /// Whether the node may appear on the left of an assignment.
    pub fn is_lvalue_shape(&self) -> bool {
        match &self.unparenthesized().kind {
            ExprKind::Var(_) | ExprKind::Index(_) => true,
            ExprKind::Deref(deref) => !matches!(deref.resolved, Some(DerefTarget::ArrayLength)),
            _ => false,
        }
    }
}

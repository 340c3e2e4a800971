//! Operator definitions.
//!
//! Provides enums for binary, unary, postfix and assignment operators along
//! with relative precedence used by the expression printer.

use std::fmt;

/// Binary operators.
///
/// Organized by precedence from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Logical OR
    /// `||`
    LogicalOr,

    // Logical AND
    /// `&&`
    LogicalAnd,

    // Bitwise OR
    /// `|`
    BitwiseOr,

    // Bitwise XOR
    /// `^`
    BitwiseXor,

    // Bitwise AND
    /// `&`
    BitwiseAnd,

    // Equality
    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    // Relational
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Bitwise shift
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    ShiftRightUnsigned,

    // Additive
    /// `+`
    Add,
    /// `-`
    Sub,

    // Multiplicative
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryOp {
    /// Get the binding power (precedence) for this operator.
    ///
    /// Higher values bind more tightly. Returns (left_bp, right_bp).
    /// All binary operators are left-associative, so right_bp = left_bp + 1.
    /// Only the relative order of these values is meaningful.
    pub fn binding_power(&self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            LogicalOr => (5, 6),
            LogicalAnd => (7, 8),
            BitwiseOr => (9, 10),
            BitwiseXor => (11, 12),
            BitwiseAnd => (13, 14),
            Equal | NotEqual => (15, 16),
            Less | LessEqual | Greater | GreaterEqual => (17, 18),
            ShiftLeft | ShiftRight | ShiftRightUnsigned => (19, 20),
            Add | Sub => (21, 22),
            Mul | Div | Mod => (23, 24),
        }
    }

    /// Check if this operator is comparison-related.
    pub fn is_comparison(&self) -> bool {
        self.is_equality() || self.is_relational()
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_relational(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Less | LessEqual | Greater | GreaterEqual)
    }

    /// `&&` and `||`.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_shift(&self) -> bool {
        use BinaryOp::*;
        matches!(self, ShiftLeft | ShiftRight | ShiftRightUnsigned)
    }

    pub fn is_bitwise(&self) -> bool {
        use BinaryOp::*;
        matches!(self, BitwiseAnd | BitwiseOr | BitwiseXor)
    }

    pub fn is_arithmetic(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Add | Sub | Mul | Div | Mod)
    }

    /// Integral division, rejected with a constant zero divisor.
    pub fn is_division(&self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Mod)
    }

    /// The operator with operands exchanged: `a < b` is `b > a`.
    ///
    /// Returns `None` for operators that are not comparisons.
    pub fn mirrored(&self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            Equal => Equal,
            NotEqual => NotEqual,
            Less => Greater,
            LessEqual => GreaterEqual,
            Greater => Less,
            GreaterEqual => LessEqual,
            _ => return None,
        })
    }

    /// The logical negation of a comparison: `!(a < b)` is `a >= b` for
    /// integral operands.
    pub fn negated(&self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            Equal => NotEqual,
            NotEqual => Equal,
            Less => GreaterEqual,
            LessEqual => Greater,
            Greater => LessEqual,
            GreaterEqual => Less,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            LogicalOr => "||",
            LogicalAnd => "&&",
            BitwiseOr => "|",
            BitwiseXor => "^",
            BitwiseAnd => "&",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            ShiftRightUnsigned => ">>>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-` negation
    Neg,
    /// `+` plus (unary)
    Plus,
    /// `!` logical NOT
    LogicalNot,
    /// `~` bitwise NOT
    BitwiseNot,
    /// `++` pre-increment
    PreInc,
    /// `--` pre-decrement
    PreDec,
}

impl UnaryOp {
    /// Get the binding power for prefix operators.
    pub fn binding_power() -> u8 {
        27 // Higher than all binary operators and casts
    }

    /// Increment or decrement, which need an l-value operand.
    pub fn is_update(&self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PreDec)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use UnaryOp::*;
        let s = match self {
            Neg => "-",
            Plus => "+",
            LogicalNot => "!",
            BitwiseNot => "~",
            PreInc => "++",
            PreDec => "--",
        };
        write!(f, "{}", s)
    }
}

/// Postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    /// `++` post-increment
    PostInc,
    /// `--` post-decrement
    PostDec,
}

impl PostfixOp {
    /// Get the binding power for postfix operators.
    pub fn binding_power() -> u8 {
        29 // Highest precedence
    }

    /// Whether this operator adds one.
    pub fn is_increment(&self) -> bool {
        matches!(self, PostfixOp::PostInc)
    }
}

impl fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PostfixOp::*;
        let s = match self {
            PostInc => "++",
            PostDec => "--",
        };
        write!(f, "{}", s)
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=` simple assignment
    Assign,
    /// `+=` add-assign
    AddAssign,
    /// `-=` subtract-assign
    SubAssign,
    /// `*=` multiply-assign
    MulAssign,
    /// `/=` divide-assign
    DivAssign,
    /// `%=` modulo-assign
    ModAssign,
    /// `&=` bitwise-and-assign
    AndAssign,
    /// `|=` bitwise-or-assign
    OrAssign,
    /// `^=` bitwise-xor-assign
    XorAssign,
    /// `<<=` shift-left-assign
    ShlAssign,
    /// `>>=` shift-right-assign
    ShrAssign,
    /// `>>>=` unsigned-shift-right-assign
    UshrAssign,
}

impl AssignOp {
    /// Get the binding power for assignment operators.
    ///
    /// Assignment is right-associative, so right_bp < left_bp.
    pub fn binding_power() -> (u8, u8) {
        (2, 1) // Lowest precedence, right-associative
    }

    /// Check if this is a simple assignment (not compound).
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Assign)
    }

    /// The arithmetic operator applied by a compound assignment.
    pub fn binary_op(&self) -> Option<BinaryOp> {
        use AssignOp::*;
        Some(match self {
            Assign => return None,
            AddAssign => BinaryOp::Add,
            SubAssign => BinaryOp::Sub,
            MulAssign => BinaryOp::Mul,
            DivAssign => BinaryOp::Div,
            ModAssign => BinaryOp::Mod,
            AndAssign => BinaryOp::BitwiseAnd,
            OrAssign => BinaryOp::BitwiseOr,
            XorAssign => BinaryOp::BitwiseXor,
            ShlAssign => BinaryOp::ShiftLeft,
            ShrAssign => BinaryOp::ShiftRight,
            UshrAssign => BinaryOp::ShiftRightUnsigned,
        })
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AssignOp::*;
        let s = match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            UshrAssign => ">>>=",
        };
        write!(f, "{}", s)
    }
}

/// Binding power of the ternary operator, between assignment and `||`.
pub const TERNARY_BINDING_POWER: (u8, u8) = (4, 3);

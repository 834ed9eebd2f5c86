use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Exponent (`^`), right-associative
    Exponent,

    // Arithmetic
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo, or printf-style substitution on strings (`%`)
    Modulo,
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,

    // Shifts
    /// Left shift (`<<`)
    ShiftLeft,
    /// Arithmetic right shift (`>>`)
    ShiftRight,

    // Comparison
    /// Less than (`<`)
    Less,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    Greater,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,

    // Bitwise
    /// Bitwise AND (`&`)
    BitAnd,
    /// Bitwise OR (`|`)
    BitOr,
    /// Bitwise exclusive OR (`xor`)
    BitXor,

    // Logical
    /// Logical AND (`and`), short-circuiting
    And,
    /// Logical OR (`or`), short-circuiting
    Or,
}

impl BinOp {
    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Exponent => 8,
            BinOp::Multiply | BinOp::Divide | BinOp::Modulo => 7,
            BinOp::Add | BinOp::Subtract => 6,
            BinOp::ShiftLeft | BinOp::ShiftRight => 5,
            BinOp::Less | BinOp::LessEqual | BinOp::Greater | BinOp::GreaterEqual => 4,
            BinOp::Equal | BinOp::NotEqual => 3,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => 2,
            BinOp::And | BinOp::Or => 1,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinOp::Exponent)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Exponent => "^",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::ShiftLeft => "<<",
            BinOp::ShiftRight => ">>",
            BinOp::Less => "<",
            BinOp::LessEqual => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEqual => ">=",
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "xor",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix operators. They bind tighter than any binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Boolean negation (`not`, `!`)
    Not,
    /// Integer complement (`~`)
    Invert,
    /// Numeric negation (`-`)
    Negate,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
            UnaryOp::Negate => "-",
        })
    }
}

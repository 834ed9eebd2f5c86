use crate::ast::{BinOp, UnaryOp};
use crate::value::Value;

/// Expression node.
///
/// Expressions form a strict tree built bottom-up by the parser; they are
/// never mutated after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary operation (arithmetic, comparison, bitwise, logical)
    ///
    /// # Example
    /// ```text
    /// 2 + 3 * 4
    /// ```
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Prefix operation
    ///
    /// # Example
    /// ```text
    /// not done
    /// -total
    /// ```
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// A leaf: literal, variable or member access
    Term(Term),
}

impl Expr {
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn literal(value: Value) -> Self {
        Expr::Term(Term::Literal(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Term(Term::Variable(name.into()))
    }

    pub fn member(object: impl Into<String>, member: impl Into<String>) -> Self {
        Expr::Term(Term::MemberAccess {
            object: object.into(),
            member: member.into(),
        })
    }
}

/// Leaf of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Typed literal (`42`, `1.5`, `"text"`, `31/12/2023`, `true`, `empty`)
    Literal(Value),

    /// Variable reference, resolved innermost scope first
    Variable(String),

    /// Member access
    ///
    /// The member is the dotted path following the object, kept verbatim.
    ///
    /// # Examples
    /// ```text
    /// Sheet1.B7        // object "Sheet1", member "B7"
    /// int.Revenue      // object "int", member "Revenue"
    /// a.b.c            // object "a", member "b.c"
    /// ```
    MemberAccess { object: String, member: String },
}

use crate::ast::Expr;

/// A statement together with the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

impl Statement {
    pub fn new(kind: StatementKind, line: usize) -> Self {
        Statement { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Declaration of a new name in the current scope
    ///
    /// # Example
    /// ```text
    /// let rate = 0.2
    /// ```
    Declare { name: String, value: Expr },

    /// Assignment to an existing name, or a new name in the current scope
    ///
    /// # Example
    /// ```text
    /// rate = rate * 2
    /// ```
    Assign { name: String, value: Expr },

    /// Assignment through the host's member-write hook
    ///
    /// # Example
    /// ```text
    /// Sheet1.B2 = 10
    /// ```
    MemberAssign {
        object: String,
        member: String,
        value: Expr,
    },

    /// Bare expression; its value becomes the statement's value
    Expression(Expr),

    /// Conditional. `else if` chains nest as an else-scope holding one `If`.
    If {
        condition: Expr,
        then_branch: Scope,
        else_branch: Option<Scope>,
    },

    /// Loop, re-evaluating the condition before every iteration
    While { condition: Expr, body: Scope },

    /// Bare `{ ... }` block
    Scope(Scope),
}

/// An ordered list of statements evaluated in a fresh scope frame.
///
/// The top-level program is also a `Scope`, evaluated directly in the
/// global frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub statements: Vec<Statement>,
}

impl Scope {
    pub fn new(statements: Vec<Statement>) -> Self {
        Scope { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

use crate::ast::{BinOp, UnaryOp};
use chrono::NaiveDate;
use std::fmt;

/// Syntactic category of a token. A token may belong to several
/// (`-` is both a binary and a unary operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Identifier,
    Keyword,
    Literal,
    BinaryOperator,
    UnaryOperator,
    Punctuation,
    Terminator,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1000000
    /// ```
    Integer(i64),

    /// Floating point literal, or an integer literal too large for `i64`
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 99999999999999999999
    /// ```
    Double(f64),

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// ```
    String(String),

    /// Date literal, day first
    ///
    /// # Examples
    /// ```text
    /// 31/12/2023
    /// 1/2/2024
    /// ```
    Date(NaiveDate),

    /// `true` or `false`
    Boolean(bool),

    /// `empty`, the null literal
    Empty,

    /// Variable, sheet or member name ("qualifier")
    Identifier(String),

    // Keywords
    Let,
    If,
    Else,
    While,

    // Operators
    /// `^`
    Caret,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&`
    Ampersand,
    /// `|`
    Pipe,
    /// `xor`
    Xor,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `!`
    Bang,
    /// `~`
    Tilde,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    /// `=`
    Equals,

    // Terminators
    Newline,
    Semicolon,

    /// `// ...` up to, not including, the end of the line
    Comment(String),

    /// End of input
    Eof,
}

impl Token {
    /// Source text of the token, used in error messages.
    pub fn text(&self) -> String {
        match self {
            Token::Integer(n) => n.to_string(),
            Token::Double(n) => n.to_string(),
            Token::String(s) => format!("{s:?}"),
            Token::Date(d) => d.format("%d/%m/%Y").to_string(),
            Token::Boolean(b) => b.to_string(),
            Token::Empty => "empty".to_string(),
            Token::Identifier(name) => name.clone(),
            Token::Let => "let".to_string(),
            Token::If => "if".to_string(),
            Token::Else => "else".to_string(),
            Token::While => "while".to_string(),
            Token::Caret => "^".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::ShiftLeft => "<<".to_string(),
            Token::ShiftRight => ">>".to_string(),
            Token::Lt => "<".to_string(),
            Token::LtEq => "<=".to_string(),
            Token::Gt => ">".to_string(),
            Token::GtEq => ">=".to_string(),
            Token::EqEq => "==".to_string(),
            Token::NotEq => "!=".to_string(),
            Token::Ampersand => "&".to_string(),
            Token::Pipe => "|".to_string(),
            Token::Xor => "xor".to_string(),
            Token::And => "and".to_string(),
            Token::Or => "or".to_string(),
            Token::Not => "not".to_string(),
            Token::Bang => "!".to_string(),
            Token::Tilde => "~".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBrace => "{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Dot => ".".to_string(),
            Token::Comma => ",".to_string(),
            Token::Colon => ":".to_string(),
            Token::Equals => "=".to_string(),
            Token::Newline => "\\n".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Comment(text) => format!("//{text}"),
            Token::Eof => "end of input".to_string(),
        }
    }

    pub fn categories(&self) -> &'static [Category] {
        use Category::*;
        match self {
            Token::Integer(_)
            | Token::Double(_)
            | Token::String(_)
            | Token::Date(_)
            | Token::Boolean(_) => &[Literal],
            Token::Empty => &[Keyword, Literal],
            Token::Identifier(_) => &[Identifier],
            Token::Let | Token::If | Token::Else | Token::While => &[Keyword],
            Token::Xor | Token::And | Token::Or => &[Keyword, BinaryOperator],
            Token::Not => &[Keyword, UnaryOperator],
            Token::Minus => &[BinaryOperator, UnaryOperator],
            Token::Bang | Token::Tilde => &[UnaryOperator],
            Token::Caret
            | Token::Star
            | Token::Slash
            | Token::Percent
            | Token::Plus
            | Token::ShiftLeft
            | Token::ShiftRight
            | Token::Lt
            | Token::LtEq
            | Token::Gt
            | Token::GtEq
            | Token::EqEq
            | Token::NotEq
            | Token::Ampersand
            | Token::Pipe => &[BinaryOperator],
            Token::LParen
            | Token::RParen
            | Token::LBrace
            | Token::RBrace
            | Token::Dot
            | Token::Comma
            | Token::Colon
            | Token::Equals => &[Punctuation],
            Token::Newline | Token::Semicolon | Token::Eof => &[Terminator],
            Token::Comment(_) => &[Comment],
        }
    }

    pub fn is(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    /// Newline, `;` or end of input.
    pub fn is_terminator(&self) -> bool {
        self.is(Category::Terminator)
    }

    /// Tokens the parser skips between statements.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon | Token::Comment(_))
    }

    pub fn binary_op(&self) -> Option<BinOp> {
        Some(match self {
            Token::Caret => BinOp::Exponent,
            Token::Star => BinOp::Multiply,
            Token::Slash => BinOp::Divide,
            Token::Percent => BinOp::Modulo,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Subtract,
            Token::ShiftLeft => BinOp::ShiftLeft,
            Token::ShiftRight => BinOp::ShiftRight,
            Token::Lt => BinOp::Less,
            Token::LtEq => BinOp::LessEqual,
            Token::Gt => BinOp::Greater,
            Token::GtEq => BinOp::GreaterEqual,
            Token::EqEq => BinOp::Equal,
            Token::NotEq => BinOp::NotEqual,
            Token::Ampersand => BinOp::BitAnd,
            Token::Pipe => BinOp::BitOr,
            Token::Xor => BinOp::BitXor,
            Token::And => BinOp::And,
            Token::Or => BinOp::Or,
            _ => return None,
        })
    }

    pub fn unary_op(&self) -> Option<UnaryOp> {
        match self {
            Token::Not | Token::Bang => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::Invert),
            Token::Minus => Some(UnaryOp::Negate),
            _ => None,
        }
    }

    /// Binary precedence, 0 for tokens that are not binary operators.
    pub fn precedence(&self) -> u8 {
        self.binary_op().map_or(0, BinOp::precedence)
    }

    pub fn is_right_assoc(&self) -> bool {
        self.binary_op().is_some_and(BinOp::is_right_assoc)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

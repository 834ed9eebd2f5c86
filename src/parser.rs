use crate::{
    ast::{Expr, Scope, Statement, StatementKind, Token},
    lexer::{LexError, Lexer},
    value::Value,
};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} on line {line}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            line: err.line,
        }
    }
}

static EOF: Token = Token::Eof;

/// Recursive descent parser with precedence climbing for binary operators.
///
/// Tokens are pulled from the lexer lazily into a lookahead cache, together
/// with the line each one was read on.
pub struct Parser {
    lexer: Lexer,
    cache: VecDeque<(Token, usize)>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser {
            lexer,
            cache: VecDeque::new(),
        }
    }

    /// Makes sure `offset` tokens of lookahead are cached, or the end of
    /// input has been reached.
    fn fill(&mut self, offset: usize) -> Result<(), ParseError> {
        while self.cache.len() <= offset {
            if matches!(self.cache.back(), Some((Token::Eof, _))) {
                break;
            }
            let line = self.lexer.line();
            let token = self.lexer.next_token()?;
            self.cache.push_back((token, line));
        }
        Ok(())
    }

    fn peek(&mut self, offset: usize) -> Result<&Token, ParseError> {
        self.fill(offset)?;
        Ok(self.cache.get(offset).map_or(&EOF, |(token, _)| token))
    }

    /// Line of the next unconsumed token.
    fn line(&mut self) -> Result<usize, ParseError> {
        self.fill(0)?;
        Ok(self.cache.front().map_or(self.lexer.line(), |(_, line)| *line))
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.fill(0)?;
        Ok(self.cache.pop_front().map_or(Token::Eof, |(token, _)| token))
    }

    fn check(&mut self, token: &Token) -> Result<bool, ParseError> {
        Ok(self.peek(0)? == token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let found = self.advance()?;
        if found != expected {
            return Err(self.error(format!(
                "Expected '{}', found '{}'",
                expected.text(),
                found.text()
            )));
        }
        Ok(())
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.advance()? {
            Token::Identifier(name) => Ok(name),
            other => Err(self.error(format!("Expected a name, found '{}'", other.text()))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        let line = self.cache.front().map_or(self.lexer.line(), |(_, line)| *line);
        ParseError { message, line }
    }

    /// Parses a complete program. Tokens left over after the last
    /// statement are an error.
    pub fn parse(&mut self) -> Result<Scope, ParseError> {
        let program = self.parse_program()?;
        let next = self.peek(0)?.clone();
        if next != Token::Eof {
            return Err(self.error(format!("Unexpected '{}'", next.text())));
        }
        Ok(program)
    }

    fn skip_separators(&mut self) -> Result<(), ParseError> {
        while self.peek(0)?.is_skippable() {
            self.advance()?;
        }
        Ok(())
    }

    /// Statements up to the end of input or a closing brace, which is left
    /// for the caller.
    fn parse_program(&mut self) -> Result<Scope, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators()?;
            if matches!(self.peek(0)?, Token::Eof | Token::RBrace) {
                break;
            }
            let statement = self.parse_statement()?;
            // A statement ending in its own `}` needs no terminator
            let braced = matches!(
                statement.kind,
                StatementKind::If { .. } | StatementKind::While { .. } | StatementKind::Scope(_)
            );
            statements.push(statement);

            let next = self.peek(0)?;
            if !(braced || next.is_skippable() || matches!(next, Token::Eof | Token::RBrace)) {
                let text = next.text();
                return Err(self.error(format!("Expected end of statement, found '{text}'")));
            }
        }
        Ok(Scope::new(statements))
    }

    fn parse_block(&mut self) -> Result<Scope, ParseError> {
        self.expect(Token::LBrace)?;
        let scope = self.parse_program()?;
        self.expect(Token::RBrace)?;
        Ok(scope)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.line()?;
        let kind = match self.peek(0)? {
            Token::Let => {
                self.advance()?;
                let name = self.expect_identifier()?;
                self.expect(Token::Equals)?;
                let value = self.parse_expression()?;
                StatementKind::Declare { name, value }
            }
            Token::If => self.parse_if()?,
            Token::While => {
                self.advance()?;
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                StatementKind::While { condition, body }
            }
            Token::LBrace => StatementKind::Scope(self.parse_block()?),
            Token::Identifier(_) => self.parse_assignment_or_expression()?,
            _ => StatementKind::Expression(self.parse_expression()?),
        };
        Ok(Statement::new(kind, line))
    }

    /// `name = expr`, `name.member = expr`, or an expression starting with
    /// a name.
    fn parse_assignment_or_expression(&mut self) -> Result<StatementKind, ParseError> {
        if self.peek(1)? == &Token::Equals {
            let name = self.expect_identifier()?;
            self.advance()?; // Consume '='
            let value = self.parse_expression()?;
            return Ok(StatementKind::Assign { name, value });
        }

        // Look for `name(.part)+ =` without consuming anything
        let mut offset = 1;
        while self.peek(offset)? == &Token::Dot
            && matches!(self.peek(offset + 1)?, Token::Identifier(_))
        {
            offset += 2;
        }
        if offset > 1 && self.peek(offset)? == &Token::Equals {
            let object = self.expect_identifier()?;
            let member = self.parse_member_path()?;
            self.advance()?; // Consume '='
            let value = self.parse_expression()?;
            return Ok(StatementKind::MemberAssign {
                object,
                member,
                value,
            });
        }

        Ok(StatementKind::Expression(self.parse_expression()?))
    }

    fn parse_if(&mut self) -> Result<StatementKind, ParseError> {
        self.expect(Token::If)?;
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;

        // `else` may sit on a later line, after comments
        let mut offset = 0;
        while matches!(self.peek(offset)?, Token::Newline | Token::Comment(_)) {
            offset += 1;
        }

        let mut else_branch = None;
        if self.peek(offset)? == &Token::Else {
            for _ in 0..=offset {
                self.advance()?;
            }
            if self.check(&Token::If)? {
                let line = self.line()?;
                let nested = self.parse_if()?;
                else_branch = Some(Scope::new(vec![Statement::new(nested, line)]));
            } else {
                else_branch = Some(self.parse_block()?);
            }
        }

        Ok(StatementKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// One or more `.name` parts, joined with dots.
    fn parse_member_path(&mut self) -> Result<String, ParseError> {
        let mut parts = Vec::new();
        while self.check(&Token::Dot)? {
            self.advance()?;
            match self.advance()? {
                Token::Identifier(part) => parts.push(part),
                other => {
                    return Err(self.error(format!(
                        "Expected a member name after '.', found '{}'",
                        other.text()
                    )));
                }
            }
        }
        Ok(parts.join("."))
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_atom()?;
        self.parse_binary(left, 0)
    }

    /// Precedence climbing. Folds operators binding at least as tightly as
    /// `min_precedence` onto `left`.
    fn parse_binary(&mut self, mut left: Expr, min_precedence: u8) -> Result<Expr, ParseError> {
        loop {
            let Some(op) = self.peek(0)?.binary_op() else {
                break;
            };
            if op.precedence() < min_precedence {
                break;
            }
            self.advance()?;
            let mut right = self.parse_atom()?;

            loop {
                let Some(next) = self.peek(0)?.binary_op() else {
                    break;
                };
                let tighter = next.precedence() > op.precedence();
                let same_right = next.precedence() == op.precedence() && next.is_right_assoc();
                if !(tighter || same_right) {
                    break;
                }
                right = self.parse_binary(right, op.precedence() + u8::from(tighter))?;
            }

            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;
        if let Some(op) = token.unary_op() {
            let operand = self.parse_atom()?;
            return Ok(Expr::unary(op, operand));
        }

        let expr = match token {
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                expr
            }
            Token::Identifier(name) => {
                if self.check(&Token::Dot)? {
                    let member = self.parse_member_path()?;
                    Expr::member(name, member)
                } else {
                    Expr::variable(name)
                }
            }
            Token::Integer(n) => Expr::literal(Value::Integer(n)),
            Token::Double(n) => Expr::literal(Value::Double(n)),
            Token::String(s) => Expr::literal(Value::String(s)),
            Token::Date(d) => Expr::literal(Value::date(d)),
            Token::Boolean(b) => Expr::literal(Value::Boolean(b)),
            Token::Empty => Expr::literal(Value::Null),
            other => {
                return Err(self.error(format!("Unexpected '{}' in expression", other.text())));
            }
        };
        Ok(expr)
    }
}

/// Parses `source` into a program.
pub fn parse_program(source: &str) -> Result<Scope, ParseError> {
    Parser::new(Lexer::new(source)).parse()
}

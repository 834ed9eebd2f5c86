use crate::{
    ast::{BinOp, Expr, Scope, Statement, StatementKind, Term, UnaryOp},
    environment::Environment,
    format::{self, FormatError},
    parser::{ParseError, parse_program},
    value::{Bindings, Value},
};
use std::cmp::Ordering;
use thiserror::Error;

/// Errors raised while executing a parsed program. Each carries the line of
/// the statement being executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Variable '{name}' is undefined (line {line})")]
    Undefined { name: String, line: usize },

    #[error("Variable '{name}' is already defined (line {line})")]
    Redeclared { name: String, line: usize },

    #[error("{message} (line {line})")]
    Type { message: String, line: usize },

    #[error("{message} (line {line})")]
    Member { message: String, line: usize },

    #[error("Division by zero (line {line})")]
    DivisionByZero { line: usize },

    #[error("{error} (line {line})")]
    Format { error: FormatError, line: usize },
}

/// Anything `Interpreter::run` can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Failure reported by a [`MemberHost`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MemberError(pub String);

/// Host extension point for `object.member` syntax.
///
/// The interpreter never interprets member names itself. It resolves the
/// object as a variable and hands both to the host, along with the current
/// environment so the host can resolve further variables.
pub trait MemberHost: Send + Sync {
    fn read_member(
        &self,
        object: &Value,
        member: &str,
        env: &Environment,
    ) -> Result<Value, MemberError>;

    fn write_member(&self, object: &Value, member: &str, value: Value) -> Result<(), MemberError> {
        let _ = (object, value);
        Err(MemberError(format!(
            "Member assignment is not supported (writing '{member}')"
        )))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Reject strings where a number is expected instead of using their
    /// hash code.
    pub strict_strings: bool,
}

/// Result of numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Integer(n),
            Number::Float(n) => Value::Double(n),
        }
    }
}

/// Tree-walking interpreter for tag programs.
///
/// The global scope is seeded from caller-owned [`Bindings`] and handed back
/// by [`Interpreter::into_globals`], so state flows from one tag to the
/// next while every interpreter instance stays short-lived.
///
/// # Examples
///
/// ```
/// use docweave::{Bindings, Interpreter, Value};
///
/// let mut interpreter = Interpreter::new(Bindings::new());
/// assert_eq!(interpreter.run("let a = 5").unwrap(), Value::Integer(5));
/// assert_eq!(interpreter.run("a * 2").unwrap(), Value::Integer(10));
///
/// let globals = interpreter.into_globals();
/// assert_eq!(globals.get("a"), Some(&Value::Integer(5)));
/// ```
pub struct Interpreter<'h> {
    env: Environment,
    host: Option<&'h dyn MemberHost>,
    options: InterpreterOptions,
    line: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(globals: Bindings) -> Self {
        Interpreter {
            env: Environment::new(globals),
            host: None,
            options: InterpreterOptions::default(),
            line: 0,
        }
    }

    pub fn with_host(mut self, host: &'h dyn MemberHost) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Parses and executes `source` in the global scope.
    pub fn run(&mut self, source: &str) -> Result<Value, ScriptError> {
        let program = parse_program(source)?;
        Ok(self.execute(&program)?)
    }

    /// Executes an already parsed program in the global scope. Returns the
    /// value of the last statement executed.
    pub fn execute(&mut self, program: &Scope) -> Result<Value, EvalError> {
        self.exec_statements(program)
    }

    pub fn into_globals(self) -> Bindings {
        self.env.into_globals()
    }

    fn exec_statements(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        let mut last = Value::Null;
        for statement in &scope.statements {
            last = self.exec(statement)?;
        }
        Ok(last)
    }

    /// Runs `scope` in a fresh frame, popped again even when a statement
    /// fails.
    fn exec_block(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        self.env.push();
        let result = self.exec_statements(scope);
        self.env.pop();
        result
    }

    fn exec(&mut self, statement: &Statement) -> Result<Value, EvalError> {
        self.line = statement.line;

        match &statement.kind {
            StatementKind::Declare { name, value } => {
                if self.env.is_defined(name) {
                    return Err(EvalError::Redeclared {
                        name: name.clone(),
                        line: self.line,
                    });
                }
                let value = self.eval(value)?;
                self.env.declare(name.clone(), value.clone());
                Ok(value)
            }
            StatementKind::Assign { name, value } => {
                let value = self.eval(value)?;
                self.env.assign(name, value.clone());
                Ok(value)
            }
            StatementKind::MemberAssign {
                object,
                member,
                value,
            } => {
                let host = self.host()?;
                let value = self.eval(value)?;
                let target = self.variable(object)?;
                host.write_member(&target, member, value)
                    .map_err(|e| self.member_error(e))?;
                Ok(Value::Null)
            }
            StatementKind::Expression(expr) => self.eval(expr),
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(condition)? {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(Value::Null)
                }
            }
            StatementKind::While { condition, body } => {
                while self.condition(condition)? {
                    self.exec_block(body)?;
                    self.line = statement.line;
                }
                Ok(Value::Null)
            }
            StatementKind::Scope(scope) => self.exec_block(scope),
        }
    }

    fn condition(&mut self, expr: &Expr) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(self.type_error(format!(
                "Condition must be a boolean, found {}",
                other.type_name()
            ))),
        }
    }

    fn host(&self) -> Result<&'h dyn MemberHost, EvalError> {
        self.host.ok_or_else(|| EvalError::Member {
            message: "Member access needs a host, and none is attached".to_string(),
            line: self.line,
        })
    }

    fn variable(&self, name: &str) -> Result<Value, EvalError> {
        self.env
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::Undefined {
                name: name.to_string(),
                line: self.line,
            })
    }

    fn type_error(&self, message: String) -> EvalError {
        EvalError::Type {
            message,
            line: self.line,
        }
    }

    fn member_error(&self, error: MemberError) -> EvalError {
        EvalError::Member {
            message: error.0,
            line: self.line,
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Term(term) => self.eval_term(term),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                self.eval_unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
        }
    }

    fn eval_term(&mut self, term: &Term) -> Result<Value, EvalError> {
        match term {
            Term::Literal(value) => Ok(value.clone()),
            Term::Variable(name) => self.variable(name),
            Term::MemberAccess { object, member } => {
                let host = self.host()?;
                let target = self.variable(object)?;
                host.read_member(&target, member, &self.env)
                    .map_err(|e| self.member_error(e))
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, value: Value) -> Result<Value, EvalError> {
        match op {
            UnaryOp::Not => match value {
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                other => Err(self.type_error(format!(
                    "Cannot apply 'not' to a {} value",
                    other.type_name()
                ))),
            },
            UnaryOp::Invert => match value {
                Value::Integer(n) => Ok(Value::Integer(!n)),
                other => Err(self.type_error(format!(
                    "Cannot apply '~' to a {} value",
                    other.type_name()
                ))),
            },
            UnaryOp::Negate => Ok(match self.evaluate(&value)? {
                Number::Int(n) => match n.checked_neg() {
                    Some(n) => Value::Integer(n),
                    None => Value::Double(-(n as f64)),
                },
                Number::Float(n) => Value::Double(-n),
            }),
        }
    }

    fn eval_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, EvalError> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let left = self.logical_operand(op, lhs)?;
            // Short circuit
            if (op == BinOp::And) != left {
                return Ok(Value::Boolean(left));
            }
            return Ok(Value::Boolean(self.logical_operand(op, rhs)?));
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;

        match (op, &left, &right) {
            (BinOp::Add, Value::String(s), other) => {
                Ok(Value::String(format!("{s}{}", other.concat_text())))
            }
            (BinOp::Modulo, Value::String(template), other) => format::sprintf(template, other)
                .map(Value::String)
                .map_err(|error| EvalError::Format {
                    error,
                    line: self.line,
                }),
            (BinOp::Equal | BinOp::NotEqual, l, r) if l.is_null() || r.is_null() => {
                let equal = l.is_null() && r.is_null();
                Ok(Value::Boolean(equal == (op == BinOp::Equal)))
            }
            (BinOp::Equal | BinOp::NotEqual, Value::String(a), Value::String(b)) => {
                Ok(Value::Boolean((a == b) == (op == BinOp::Equal)))
            }
            (
                BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::ShiftLeft | BinOp::ShiftRight,
                l,
                r,
            ) => match (l, r) {
                (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(bitwise(op, *x, *y))),
                _ => Err(self.type_error(format!(
                    "Operands of '{op}' must be integers, found {} and {}",
                    l.type_name(),
                    r.type_name()
                ))),
            },
            _ => {
                let a = self.evaluate(&left)?;
                let b = self.evaluate(&right)?;
                self.numeric(op, a, b)
            }
        }
    }

    fn logical_operand(&mut self, op: BinOp, expr: &Expr) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(self.type_error(format!(
                "Operands of '{op}' must be booleans, found {}",
                other.type_name()
            ))),
        }
    }

    /// Numeric coercion.
    ///
    /// Null is 0, a date is its epoch milliseconds and a string is its
    /// 31-based hash code, which is only good for equality tests.
    fn evaluate(&self, value: &Value) -> Result<Number, EvalError> {
        match value {
            Value::Null => Ok(Number::Int(0)),
            Value::Integer(n) => Ok(Number::Int(*n)),
            Value::Double(n) => Ok(Number::Float(*n)),
            Value::Date(dt) => Ok(Number::Int(dt.and_utc().timestamp_millis())),
            Value::String(s) if !self.options.strict_strings => Ok(Number::Int(string_hash(s).into())),
            other => Err(self.type_error(format!(
                "Cannot use a {} value as a number",
                other.type_name()
            ))),
        }
    }

    fn numeric(&self, op: BinOp, a: Number, b: Number) -> Result<Value, EvalError> {
        use Number::Int;

        let value = match op {
            BinOp::Less | BinOp::LessEqual | BinOp::Greater | BinOp::GreaterEqual => {
                let ordering = match (a, b) {
                    (Int(x), Int(y)) => Some(x.cmp(&y)),
                    _ => a.as_f64().partial_cmp(&b.as_f64()),
                };
                let holds = match (op, ordering) {
                    (_, None) => false,
                    (BinOp::Less, Some(o)) => o == Ordering::Less,
                    (BinOp::LessEqual, Some(o)) => o != Ordering::Greater,
                    (BinOp::Greater, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                };
                Value::Boolean(holds)
            }
            BinOp::Equal | BinOp::NotEqual => {
                let equal = match (a, b) {
                    (Int(x), Int(y)) => x == y,
                    _ => a.as_f64() == b.as_f64(),
                };
                Value::Boolean(equal == (op == BinOp::Equal))
            }
            _ => match (a, b) {
                (Int(x), Int(y)) => self.integer_arithmetic(op, x, y)?,
                _ => Value::Double(float_arithmetic(op, a.as_f64(), b.as_f64())),
            },
        };
        Ok(value)
    }

    /// Integer arithmetic. Results that overflow fall back to doubles.
    fn integer_arithmetic(&self, op: BinOp, x: i64, y: i64) -> Result<Value, EvalError> {
        let exact = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Subtract => x.checked_sub(y),
            BinOp::Multiply => x.checked_mul(y),
            BinOp::Divide | BinOp::Modulo if y == 0 => {
                return Err(EvalError::DivisionByZero { line: self.line });
            }
            BinOp::Divide if x.checked_rem(y) == Some(0) => x.checked_div(y),
            BinOp::Divide => None,
            BinOp::Modulo => x.checked_rem(y),
            BinOp::Exponent => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
            _ => None,
        };
        Ok(match exact {
            Some(n) => Value::Integer(n),
            None => Number::Float(float_arithmetic(op, x as f64, y as f64)).into_value(),
        })
    }
}

fn bitwise(op: BinOp, x: i64, y: i64) -> i64 {
    match op {
        BinOp::BitAnd => x & y,
        BinOp::BitOr => x | y,
        BinOp::BitXor => x ^ y,
        // Shift distances are taken modulo 64
        BinOp::ShiftLeft => x.wrapping_shl(y as u32),
        _ => x.wrapping_shr(y as u32),
    }
}

fn float_arithmetic(op: BinOp, x: f64, y: f64) -> f64 {
    match op {
        BinOp::Add => x + y,
        BinOp::Subtract => x - y,
        BinOp::Multiply => x * y,
        BinOp::Divide => x / y,
        BinOp::Modulo => x % y,
        BinOp::Exponent => x.powf(y),
        _ => f64::NAN,
    }
}

/// 31-based polynomial hash over UTF-16 code units, wrapping at 32 bits.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

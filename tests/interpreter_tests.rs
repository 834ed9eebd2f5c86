// tests/interpreter_tests.rs

use chrono::NaiveDate;
use docweave::environment::Environment;
use docweave::interpreter::{
    EvalError, Interpreter, InterpreterOptions, MemberError, MemberHost, ScriptError,
};
use docweave::value::{Bindings, HostObject, Value};
use std::any::Any;
use std::fmt;
use std::sync::Mutex;

fn run(source: &str) -> Result<Value, ScriptError> {
    Interpreter::new(Bindings::new()).run(source)
}

fn eval(source: &str) -> Value {
    run(source).unwrap()
}

fn eval_error(source: &str) -> EvalError {
    match run(source) {
        Err(ScriptError::Eval(e)) => e,
        other => panic!("Expected an evaluation error, got {other:?}"),
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_precedence() {
    assert_eq!(eval("2 + 3 * 4 ^ 2"), Value::Integer(50));
    assert_eq!(eval("(2 + 3) * 4"), Value::Integer(20));
    assert_eq!(eval("2 ^ 3 ^ 2"), Value::Integer(512));
}

#[test]
fn test_integers_are_preserved() {
    assert_eq!(eval("7 / 7"), Value::Integer(1));
    assert_eq!(eval("7 % 3"), Value::Integer(1));
    assert_eq!(eval("7 / 2"), Value::Double(3.5));
    assert_eq!(eval("1 + 0.5"), Value::Double(1.5));
    assert_eq!(eval("-3 * 2"), Value::Integer(-6));
}

#[test]
fn test_overflow_falls_back_to_double() {
    assert_eq!(eval("9223372036854775807 + 1"), Value::Double(9223372036854775808.0));
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval_error("1 / 0"), EvalError::DivisionByZero { line: 1 }));
    assert!(matches!(eval_error("\n5 % 0"), EvalError::DivisionByZero { line: 2 }));
    assert_eq!(eval("1.0 / 0"), Value::Double(f64::INFINITY));
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("6 & 3"), Value::Integer(2));
    assert_eq!(eval("6 | 3"), Value::Integer(7));
    assert_eq!(eval("6 xor 3"), Value::Integer(5));
    assert_eq!(eval("1 << 4"), Value::Integer(16));
    assert_eq!(eval("~0"), Value::Integer(-1));
    assert!(matches!(eval_error("1.5 & 1"), EvalError::Type { .. }));
}

#[test]
fn test_bitwise_operands_are_not_coerced() {
    assert!(matches!(eval_error("\"abc\" & 1"), EvalError::Type { .. }));
    assert!(matches!(eval_error("empty | 2"), EvalError::Type { .. }));
    assert!(matches!(eval_error("31/12/2023 << 1"), EvalError::Type { .. }));
    assert!(matches!(eval_error("1 xor true"), EvalError::Type { .. }));
    assert!(matches!(eval_error("\n2 >> empty"), EvalError::Type { line: 2, .. }));
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("2 < 3"), Value::Boolean(true));
    assert_eq!(eval("2 >= 3"), Value::Boolean(false));
    assert_eq!(eval("2 == 2.0"), Value::Boolean(true));
    assert_eq!(eval("\"a\" == \"a\""), Value::Boolean(true));
    assert_eq!(eval("\"a\" != \"b\""), Value::Boolean(true));
}

// ============================================================================
// Null, Strings and Dates
// ============================================================================

#[test]
fn test_null_equality() {
    assert_eq!(eval("empty == empty"), Value::Boolean(true));
    assert_eq!(eval("empty == 0"), Value::Boolean(false));
    assert_eq!(eval("0 != empty"), Value::Boolean(true));
    // Null counts as zero in arithmetic
    assert_eq!(eval("empty + 2"), Value::Integer(2));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("\"n = \" + 5"), Value::String("n = 5".into()));
    assert_eq!(eval("\"ok: \" + true"), Value::String("ok: true".into()));
    assert_eq!(eval("\"x\" + empty"), Value::String("xnull".into()));
}

#[test]
fn test_date_concatenation() {
    let mut globals = Bindings::new();
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    globals.insert("d".into(), Value::date(date));

    let mut interpreter = Interpreter::new(globals);
    assert_eq!(
        interpreter.run("\"Date: \" + d").unwrap(),
        Value::String("Date: 05/03/2024".into())
    );
    assert_eq!(interpreter.run("d == 5/3/2024").unwrap(), Value::Boolean(true));
}

#[test]
fn test_printf_operator() {
    assert_eq!(eval("\"%05d\" % 42"), Value::String("00042".into()));
    assert!(matches!(eval_error("\"%d %d\" % 1"), EvalError::Format { .. }));
}

#[test]
fn test_strict_strings() {
    // Strings coerce to their hash code unless strict
    assert_eq!(eval("\"a\" < 98"), Value::Boolean(true));

    let options = InterpreterOptions {
        strict_strings: true,
    };
    let result = Interpreter::new(Bindings::new())
        .with_options(options)
        .run("\"a\" < 98");
    assert!(matches!(result, Err(ScriptError::Eval(EvalError::Type { .. }))));
}

// ============================================================================
// Logic and Control Flow
// ============================================================================

#[test]
fn test_logical_operators() {
    assert_eq!(eval("true and not false"), Value::Boolean(true));
    assert_eq!(eval("false or !true"), Value::Boolean(false));
    // Right side never evaluated
    assert_eq!(eval("false and missing"), Value::Boolean(false));
    assert_eq!(eval("true or missing"), Value::Boolean(true));
    assert!(matches!(eval_error("1 and true"), EvalError::Type { .. }));
}

#[test]
fn test_if_else() {
    assert_eq!(eval("let x = 3\nif x > 2 { \"big\" } else { \"small\" }"), Value::String("big".into()));
    assert_eq!(eval("if false { 1 }"), Value::Null);
    assert!(matches!(eval_error("if 1 { 2 }"), EvalError::Type { .. }));
}

#[test]
fn test_else_if_across_lines() {
    let source = "let grade = 0\nlet n = 55\nif n >= 70 {\n grade = 1\n}\n// middle band\nelse if n >= 50 {\n grade = 2\n}\nelse {\n grade = 3\n}\ngrade";
    assert_eq!(eval(source), Value::Integer(2));
}

#[test]
fn test_while_loop() {
    let source = "let total = 0\nlet i = 1\nwhile i <= 4 {\n total = total + i\n i = i + 1\n}\ntotal";
    assert_eq!(eval(source), Value::Integer(10));
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn test_redeclaration_in_nested_scope() {
    let err = eval_error("let x = 1;\n{ let x = 2; }");
    assert_eq!(
        err,
        EvalError::Redeclared {
            name: "x".into(),
            line: 2
        }
    );
}

#[test]
fn test_assignment_reaches_outer_scope() {
    assert_eq!(eval("let x = 1; if true { x = 2; } x"), Value::Integer(2));
    assert_eq!(eval("let y = 1\nwhile y < 3 { y = y + 1 }\ny"), Value::Integer(3));
}

#[test]
fn test_block_locals_are_dropped() {
    assert!(matches!(
        eval_error("{ let inner = 1 }\ninner"),
        EvalError::Undefined { line: 2, .. }
    ));
}

#[test]
fn test_undeclared_assignment_binds_globally() {
    let mut interpreter = Interpreter::new(Bindings::new());
    interpreter.run("total = 5").unwrap();
    assert_eq!(
        interpreter.into_globals().get("total"),
        Some(&Value::Integer(5))
    );
}

#[test]
fn test_globals_persist_between_runs() {
    let mut globals = Bindings::new();
    for program in ["let a = 5", "a = a * 2"] {
        let mut interpreter = Interpreter::new(globals);
        interpreter.run(program).unwrap();
        globals = interpreter.into_globals();
    }
    assert_eq!(globals.get("a"), Some(&Value::Integer(10)));
}

#[test]
fn test_failed_block_pops_its_frame() {
    let mut interpreter = Interpreter::new(Bindings::new());
    assert!(interpreter.run("{ let a = 1\n missing }").is_err());
    assert_eq!(interpreter.environment().depth(), 1);
    assert!(interpreter.run("let a = 2").is_ok());
}

#[test]
fn test_parse_errors_surface() {
    assert!(matches!(run("let = 1"), Err(ScriptError::Parse(_))));
}

// ============================================================================
// Member Access
// ============================================================================

#[derive(Debug)]
struct Ledger;

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ledger")
    }
}

impl HostObject for Ledger {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Answers `ledger.<name>` with the name's length, and records writes.
#[derive(Default)]
struct LedgerHost {
    writes: Mutex<Vec<(String, Value)>>,
}

impl MemberHost for LedgerHost {
    fn read_member(
        &self,
        object: &Value,
        member: &str,
        env: &Environment,
    ) -> Result<Value, MemberError> {
        match object {
            Value::Handle(h) if h.downcast_ref::<Ledger>().is_some() => {
                if let Some(value) = env.lookup(member) {
                    return Ok(value.clone());
                }
                Ok(Value::Integer(member.len() as i64))
            }
            _ => Err(MemberError(format!("No member '{member}'"))),
        }
    }

    fn write_member(&self, _object: &Value, member: &str, value: Value) -> Result<(), MemberError> {
        self.writes.lock().unwrap().push((member.to_string(), value));
        Ok(())
    }
}

fn ledger_globals() -> Bindings {
    let mut globals = Bindings::new();
    globals.insert("ledger".into(), Value::handle(Ledger));
    globals
}

#[test]
fn test_member_read_goes_through_host() {
    let host = LedgerHost::default();
    let mut interpreter = Interpreter::new(ledger_globals()).with_host(&host);
    assert_eq!(interpreter.run("ledger.abc + 1").unwrap(), Value::Integer(4));
    assert_eq!(interpreter.run("let abc = 10\nledger.abc").unwrap(), Value::Integer(10));
    assert!(interpreter.run("let n = 1\nn.x").is_err());
}

#[test]
fn test_member_write_goes_through_host() {
    let host = LedgerHost::default();
    let mut interpreter = Interpreter::new(ledger_globals()).with_host(&host);
    interpreter.run("ledger.B2 = 3 * 3").unwrap();
    assert_eq!(
        *host.writes.lock().unwrap(),
        vec![("B2".to_string(), Value::Integer(9))]
    );
}

#[test]
fn test_member_access_without_host() {
    let mut interpreter = Interpreter::new(ledger_globals());
    let result = interpreter.run("ledger.abc");
    assert!(matches!(result, Err(ScriptError::Eval(EvalError::Member { .. }))));
}

pub mod ast;
pub mod cli;
pub mod config;
pub mod document;
pub mod environment;
pub mod format;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod replace;
pub mod report;
pub mod sections;
pub mod tags;
pub mod value;
pub mod workbook;

pub use ast::{BinOp, Expr, Scope, Statement, StatementKind, Token, UnaryOp};
pub use config::ReportConfig;
pub use document::{Block, Document, DocumentError, Paragraph, Run};
pub use environment::Environment;
pub use format::FormatError;
pub use host::{Conversion, WorkbookHost, workbook_bindings};
pub use interpreter::{EvalError, Interpreter, InterpreterOptions, MemberError, MemberHost, ScriptError};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser, parse_program};
pub use replace::{ReplaceError, Replacer, ordered_replace};
pub use report::{ReportError, ReportJob, ReportSummary, generate, produce_report};
pub use sections::{remove_sections, repeat_sections};
pub use tags::{Tag, TagError, extract_tags};
pub use value::{Bindings, Handle, HostObject, Value};
pub use workbook::{Workbook, WorkbookError};

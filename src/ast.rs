//! # Tag Script - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the small scripting
//! language embedded in document template tags. Each tag holds one program;
//! the program is parsed once, evaluated once and discarded.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Binary and unary operators with their precedence
//! - **[expressions]** - Expression and term nodes
//! - **[statements]** - Statements and scopes (blocks)
//!
//! ## Quick Start
//!
//! ```text
//! let total = int.Revenue - int.Costs
//! if total < 0 { "Loss" } else { "Profit of " + total }
//! ```
//!
//! The value of a program is the value of the last statement executed in
//! the global scope.
//!
//! ## Core Concepts
//!
//! ### Statements
//!
//! - **Declare** `let x = expr` - binds a new name in the current scope
//! - **Assign** `x = expr` - updates the owning scope, or binds locally
//! - **Member assign** `sheet.A1 = expr` - delegated to the host
//! - **If / While / Block** - bodies run in a fresh nested scope
//!
//! ### Terminators
//!
//! Statements are separated by newlines or `;`. A statement that ends in a
//! block (`if`, `while`, `{ }`) may be followed directly by the next one,
//! and the last statement of a block needs no separator before its `}`.
//! `//` starts a comment that runs to the end of the line.
//!
//! ### Member Access
//!
//! `object.member.path` never evaluates `member.path` itself. The object is
//! looked up as a variable and the dotted path is handed to the host, which
//! decides what it means (a cell address, a named range, a conversion).
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use expressions::{Expr, Term};
pub use operators::{BinOp, UnaryOp};
pub use statements::{Scope, Statement, StatementKind};
pub use tokens::{Category, Token};

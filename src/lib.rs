//! # Rhyme
//! This crate contains the core of the Rhyme compiler:
//! a lexer, a recursive-descent parser, a tree simplifier,
//! and a code generator targeting a small stack machine.
//! If you're looking for the command line tool,
//! see the `rhyme-cli` crate in this workspace.
//!
//! ## Compiling Rhyme from Rust
//! ```
//! use rhyme::{compile, Source};
//!
//! let source = Source::source("main entry() { a := 2 + 3; print(a); return a; }");
//! let assembly = compile(source).unwrap();
//! assert!(assembly.starts_with("CALL :main\nHLT\n"));
//! ```
//!
//! ## Overview of the compilation process
//! Source code is represented as a `Source` object,
//! which is lexed into a flat list of tokens.
//! The parser builds a binary tree out of those tokens,
//! stored in an arena owned by a `Program`.
//! The tree is then simplified by folding constants
//! and removing algebraic identities until nothing changes.
//! Finally, the generator walks the tree and emits assembly text.
//!
//! The tree can also be saved to (and loaded from) a plain text
//! prefix notation, see `construct::prefix`.

pub mod common;
pub mod compiler;
pub mod construct;

use std::rc::Rc;

pub use common::{Source, Span, Spanned};
pub use compiler::{Error, Syntax};

/// Compiles some source code down to assembly,
/// simplifying the tree along the way.
/// This is the whole pipeline, see `compiler` for the individual steps.
pub fn compile(source: Rc<Source>) -> Result<String, Error> {
    compiler::gen(source)
}

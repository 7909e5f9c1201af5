//! This module contains the compiler implementation.
//!
//! Each step in the compiler pipeline turns one datatype into another,
//! starting with `Source` (string + path):
//!
//! 1. Tokens:     `lex.rs`
//! 2. Tree:       `parse.rs`
//! 3. Simpler tree: `simplify.rs`
//! 4. Assembly:   `gen.rs`
//!
//! Each function below runs the pipeline up to and including its step.

use std::rc::Rc;

pub mod lex;
pub use lex::{Lexed, Lexer};

pub mod parse;
pub use parse::Parser;

pub mod simplify;
pub use simplify::Simplifier;

pub mod gen;
pub use gen::{Codegen, Generator};

pub mod syntax;
pub use syntax::{Lexical, Syntax};

pub mod error;
pub use error::Error;

use crate::{common::Source, construct::program::Program};

#[inline(always)]
pub fn lex(source: Rc<Source>) -> Result<Lexed, Error> {
    Ok(Lexer::lex(source)?)
}

#[inline(always)]
pub fn parse(source: Rc<Source>) -> Result<Program, Error> {
    let lexed = lex(Rc::clone(&source))?;
    Ok(Parser::parse(source, lexed)?)
}

#[inline(always)]
pub fn simplify(source: Rc<Source>) -> Result<Program, Error> {
    let mut program = parse(source)?;
    Simplifier::simplify(&mut program)?;
    Ok(program)
}

#[inline(always)]
pub fn gen(source: Rc<Source>) -> Result<String, Error> {
    let program = simplify(source)?;
    Ok(Generator::gen(&program)?)
}

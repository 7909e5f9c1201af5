use std::fmt::Display;

use crate::{common::span::Spanned, construct::keyword::Keyword};

pub type Tokens = Vec<Spanned<Token>>;

/// These are the different tokens the lexer will output.
/// Identifiers are interned, so they carry an index
/// into the program's `SymbolTable` rather than a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Keyword(Keyword),
    Iden(usize),
}

impl Token {
    pub fn is(&self, keyword: Keyword) -> bool {
        *self == Token::Keyword(keyword)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // pretty formatting for tokens
        // just use debug if you're not printing a message or something.
        match self {
            Token::Number(n) => write!(f, "number `{}`", n),
            Token::Keyword(k) => write!(f, "keyword {}", k),
            Token::Iden(_) => write!(f, "an identifier"),
        }
    }
}

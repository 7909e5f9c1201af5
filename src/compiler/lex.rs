use std::{rc::Rc, str::Chars};

use log::{debug, trace};

use crate::{
    common::{
        source::Source,
        span::{Span, Spanned},
    },
    compiler::syntax::Lexical,
    construct::{
        keyword::Keyword,
        symbol::SymbolTable,
        token::{Token, Tokens},
    },
};

/// The output of the lexer:
/// the tokens of a whole source file, along with the names they refer to.
#[derive(Debug)]
pub struct Lexed {
    pub tokens:  Spanned<Tokens>,
    pub symbols: SymbolTable,
}

#[derive(Debug)]
pub struct Lexer {
    source:  Rc<Source>,
    index:   usize,
    tokens:  Tokens,
    symbols: SymbolTable,
}

impl Lexer {
    /// Lexes a source file into a stream of tokens.
    /// Identifiers are interned as they are found.
    pub fn lex(source: Rc<Source>) -> Result<Lexed, Lexical> {
        // get a span that spans the entire source file:
        let span = Span::new(&source, 0, source.contents.len());

        // build a base lexer for this file
        let mut lexer = Lexer {
            source,
            index: 0,
            tokens: vec![],
            symbols: SymbolTable::new(),
        };

        // prime the lexer
        lexer.strip();

        // consume all!
        while lexer.index < lexer.source.contents.len() {
            let token = lexer.next_token()?;
            trace!("lexed {:?} at {}", token.item, lexer.index);
            lexer.tokens.push(token);
            lexer.strip();
        }

        debug!(
            "lexed {} tokens and {} names from {}",
            lexer.tokens.len(),
            lexer.symbols.len(),
            span.path(),
        );

        Ok(Lexed {
            tokens:  Spanned::new(lexer.tokens, span),
            symbols: lexer.symbols,
        })
    }

    /// Returns all characters after the current index
    /// position.
    fn remaining(&self) -> Chars {
        self.source.contents[self.index..].chars()
    }

    /// Skips whitespace, newlines included.
    fn strip(&mut self) {
        let stripped = self
            .remaining()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum::<usize>();
        self.index += stripped;
    }

    /// Starting at the lexer's current index,
    /// consumes characters one at a time according to a
    /// `pred`icate. after the predicate returns false,
    /// the string is passed to a `wrap` function, which
    /// converts the string slice of consumed characters
    /// into a type `T`, and returns that type along
    /// with the number of bytes consumed.
    fn take_while<T>(
        &self,
        wrap: impl FnOnce(&str) -> T,
        pred: impl Fn(char) -> bool,
    ) -> (T, usize) {
        let len = self
            .remaining()
            .take_while(|c| pred(*c))
            .map(char::len_utf8)
            .sum::<usize>();
        let inside = &self.source.contents[self.index..self.index + len];
        (wrap(inside), len)
    }

    /// A maximal run of decimal digits.
    /// Digits running straight into a name, like `12ab`, are rejected.
    fn number(&self) -> Result<(Token, usize), Lexical> {
        let (digits, len) = self.take_while(|s| s.to_string(), |c| c.is_ascii_digit());

        let after = self.source.contents[self.index + len..].chars().next();
        if let Some(c) = after.filter(|c| c.is_ascii_alphabetic() || *c == '_') {
            return Err(Lexical::error(
                &format!(
                    "Malformed number literal, `{}` can't be followed by `{}`",
                    digits, c,
                ),
                &Span::new(&self.source, self.index, len + c.len_utf8()),
            ));
        }

        match digits.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok((Token::Number(n), len)),
            _ => Err(Lexical::error(
                "Number literal is too large to be represented",
                &Span::new(&self.source, self.index, len),
            )),
        }
    }

    /// Parses the next token.
    /// Expects all whitespace to be stripped.
    fn next_token(&mut self) -> Result<Spanned<Token>, Lexical> {
        let rest = &self.source.contents[self.index..];

        let (token, len) = match rest.chars().next() {
            // Number literal
            Some(c) if c.is_ascii_digit() => self.number()?,

            // Keywords and operators, first match in table order
            Some(c) => match Keyword::prefix_of(rest) {
                Some(entry) => {
                    (Token::Keyword(entry.keyword), entry.spelling.len())
                },

                // Iden
                None if c.is_ascii_alphabetic() || c == '_' => {
                    let (name, len) = self.take_while(
                        |s| s.to_string(),
                        |n| n.is_ascii_alphanumeric() || n == '_',
                    );
                    (Token::Iden(self.symbols.intern(&name)), len)
                },

                // Unrecognized char
                None => return Err(Lexical::error(
                    &format!(
                        "Hmm... The character `{}` can't start a name - check for encoding issues or typos",
                        c,
                    ),
                    &Span::new(&self.source, self.index, c.len_utf8()),
                )),
            },

            None => return Err(Lexical::error(
                "Unexpected end of source",
                &Span::point(&self.source, self.index),
            )),
        };

        let spanned = Spanned::new(token, Span::new(&self.source, self.index, len));

        self.index += len;
        Ok(spanned)
    }
}

use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    common::{
        source::Source,
        span::{Span, Spanned},
    },
    compiler::{
        lex::Lexed,
        syntax::{Note, Syntax},
    },
    construct::{
        keyword::Keyword,
        program::Program,
        token::{Token, Tokens},
        tree::NodeId,
    },
};

/// A `call` whose target is checked once every function is known.
#[derive(Debug)]
struct PendingCall {
    symbol: usize,
    span:   Span,
    token:  usize,
}

/// Builds a tree out of a flat list of tokens.
/// This is a recursive-descent parser
/// with a single forward cursor and one token of lookahead.
/// Declarations are checked as the tree is built:
/// names must be declared before they're used,
/// and may only be declared once.
#[derive(Debug)]
pub struct Parser {
    tokens:  Tokens,
    index:   usize,
    end:     Span,
    program: Program,
    calls:   Vec<PendingCall>,
    /// Where each function was first defined.
    units:   HashMap<usize, Span>,
}

impl Parser {
    /// Parses a whole program.
    /// Calls may refer to functions defined later on,
    /// so call targets are checked after everything else.
    pub fn parse(source: Rc<Source>, lexed: Lexed) -> Result<Program, Syntax> {
        let end = Span::point(&source, source.contents.len());
        let mut parser = Parser {
            tokens: lexed.tokens.item,
            index: 0,
            end,
            program: Program::empty(source, lexed.symbols),
            calls: vec![],
            units: HashMap::new(),
        };

        let root = parser.units()?;
        parser.check_calls()?;
        parser.program.tree.root = Some(root);

        let declarations = &parser.program.declarations;
        debug!(
            "parsed {} tokens into {} nodes, declaring {} variables and {} functions",
            parser.tokens.len(),
            parser.program.tree.live(),
            declarations.variables.len(),
            declarations.functions.len(),
        );
        Ok(parser.program)
    }

    // Cursor helpers

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|t| &t.item)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|t| &t.item)
    }

    fn is(&self, keyword: Keyword) -> bool {
        matches!(self.peek(), Some(t) if t.is(keyword))
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.index)
            .map(|t| t.span.clone())
            .unwrap_or_else(|| self.end.clone())
    }

    fn advance(&mut self) -> Option<Spanned<Token>> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Describes the current token for error messages.
    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!("{}", token),
            None => "end of source".to_string(),
        }
    }

    fn error(&self, reason: &str) -> Syntax {
        Syntax::error(reason, &self.span()).at_token(self.index)
    }

    fn error_with_hint(&self, reason: &str, hint: &str) -> Syntax {
        Syntax::error_with_note(reason, Note::new_with_hint(hint, &self.span()))
            .at_token(self.index)
    }

    /// Consumes the given keyword, or fails saying what was found instead.
    fn consume(&mut self, keyword: Keyword) -> Result<Span, Syntax> {
        if !self.is(keyword) {
            return Err(self.error(&format!(
                "Expected {}, found {}",
                keyword,
                self.found()
            )));
        }
        let span = self.span();
        self.index += 1;
        Ok(span)
    }

    /// Consumes an identifier, returning its symbol.
    fn name(&mut self, what: &str) -> Result<(usize, Span), Syntax> {
        match self.peek() {
            Some(Token::Iden(symbol)) => {
                let symbol = *symbol;
                let span = self.span();
                self.index += 1;
                Ok((symbol, span))
            },
            _ => Err(self.error(&format!(
                "Expected {}, found {}",
                what,
                self.found()
            ))),
        }
    }

    fn connect(
        &mut self,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> NodeId {
        self.program.tree.op(Keyword::Connect, left, right)
    }

    // Program structure

    /// Parses `(func ... | main ...)+` into a chain of units.
    fn units(&mut self) -> Result<NodeId, Syntax> {
        let mut chain = None;

        loop {
            let unit = self.unit()?;
            chain = Some(self.connect(chain, Some(unit)));

            if self.peek().is_none() {
                break;
            }
        }

        // the loop always runs at least once
        chain.ok_or_else(|| self.error("Expected a function"))
    }

    /// Parses `func Name () Body` or `main Name () Body`.
    fn unit(&mut self) -> Result<NodeId, Syntax> {
        let kind = match self.peek() {
            Some(Token::Keyword(k @ (Keyword::Func | Keyword::Main))) => *k,
            _ => {
                return Err(self.error_with_hint(
                    &format!("Expected a function, found {}", self.found()),
                    "programs are made of `func` and `main` definitions",
                ))
            },
        };
        self.index += 1;

        let (symbol, span) = self.name("a function name")?;
        if !self.program.declarations.declare_function(symbol) {
            let name = self.program.name(symbol);
            if self.program.declarations.is_variable(symbol) {
                let reason = format!("`{}` is already a variable, it can't also be a function", name);
                return Err(Syntax::error(&reason, &span).at_token(self.index - 1));
            }

            let reason = format!("Function `{}` is defined more than once", name);
            let mut error = Syntax::error(&reason, &span).at_token(self.index - 1);
            if let Some(first) = self.units.get(&symbol) {
                error = error.add_note(Note::new_with_hint("first defined here", first));
            }
            return Err(error);
        }
        self.units.insert(symbol, span.clone());

        self.consume(Keyword::OpenParen)?;
        if !self.is(Keyword::CloseParen) {
            return Err(self.error_with_hint(
                &format!("Expected `)`, found {}", self.found()),
                "functions do not take parameters",
            ));
        }
        self.index += 1;

        let name = self.program.tree.name(symbol);
        let header = self.program.tree.op(Keyword::Comma, Some(name), None);
        let body = self.body()?;

        Ok(self.program.tree.op(kind, Some(header), Some(body)))
    }

    /// Parses `{ Operation* return Expression ;? }`.
    /// The chain of operations always ends in the return.
    fn body(&mut self) -> Result<NodeId, Syntax> {
        self.consume(Keyword::OpenCurly)?;

        let mut chain = None;
        while !self.is(Keyword::Return) {
            if self.peek().is_none() || self.is(Keyword::CloseCurly) {
                return Err(self.error_with_hint(
                    &format!("Expected `return`, found {}", self.found()),
                    "every function ends by returning a value",
                ));
            }
            let operation = self.operation()?;
            chain = Some(self.connect(chain, Some(operation)));
        }

        let ret = self.ret()?;
        let body = self.connect(chain, Some(ret));
        self.consume(Keyword::CloseCurly)?;

        Ok(body)
    }

    // Statements

    fn operation(&mut self) -> Result<NodeId, Syntax> {
        match self.peek() {
            Some(Token::Keyword(Keyword::If)) => self.if_(),
            Some(Token::Keyword(Keyword::OpenCurly)) => self.block(),
            Some(Token::Keyword(Keyword::Print)) => self.print(),
            Some(Token::Keyword(Keyword::Return)) => self.ret(),
            Some(Token::Iden(_)) => self.declare_or_assign(),
            _ => Err(self.error(&format!(
                "Expected a statement, found {}",
                self.found()
            ))),
        }
    }

    /// Parses `if ( Expression ) Operation`.
    fn if_(&mut self) -> Result<NodeId, Syntax> {
        self.consume(Keyword::If)?;
        self.consume(Keyword::OpenParen)?;
        let condition = self.expression()?;
        self.consume(Keyword::CloseParen)?;
        let then = self.operation()?;

        Ok(self.program.tree.op(Keyword::If, Some(condition), Some(then)))
    }

    /// Parses `{ Operation+ }`.
    fn block(&mut self) -> Result<NodeId, Syntax> {
        self.consume(Keyword::OpenCurly)?;
        let mut node = self.operation()?;

        while !self.is(Keyword::CloseCurly) {
            if self.peek().is_none() {
                return Err(self.error("Expected `}` to close the block, found end of source"));
            }
            let next = self.operation()?;
            node = self.connect(Some(node), Some(next));
        }
        self.index += 1;

        Ok(node)
    }

    /// Parses `Name := Expression ;` or `Name = Expression ;`.
    /// Looks one token past the name to tell the two apart.
    fn declare_or_assign(&mut self) -> Result<NodeId, Syntax> {
        let keyword = match self.peek_next() {
            Some(Token::Keyword(k @ (Keyword::Declare | Keyword::Assign))) => *k,
            _ => {
                let found = self
                    .tokens
                    .get(self.index + 1)
                    .map(|t| t.item.to_string())
                    .unwrap_or_else(|| "end of source".to_string());
                return Err(self.error_with_hint(
                    &format!("Expected `:=` or `=` after a name, found {}", found),
                    "statements start with a keyword or a variable",
                ));
            },
        };

        let token = self.index;
        let (symbol, span) = self.name("a variable")?;
        let declarations = &self.program.declarations;
        let name = self.program.name(symbol).to_string();

        match keyword {
            Keyword::Declare if declarations.is_function(symbol) => {
                return Err(Syntax::error(
                    &format!("`{}` is already a function, it can't also be a variable", name),
                    &span,
                )
                .at_token(token))
            },
            Keyword::Declare if declarations.is_variable(symbol) => {
                return Err(Syntax::error_with_note(
                    &format!("Variable `{}` is declared more than once", name),
                    Note::new_with_hint("use `=` to assign to an existing variable", &span),
                )
                .at_token(token))
            },
            Keyword::Assign if !declarations.is_variable(symbol) => {
                return Err(Syntax::error_with_note(
                    &format!("Variable `{}` is assigned before it is declared", name),
                    Note::new_with_hint("declare it with `:=` first", &span),
                )
                .at_token(token))
            },
            _ => (),
        }

        self.index += 1;
        let value = self.expression()?;
        self.consume(Keyword::Connect)?;

        // declared only once the right hand side is parsed,
        // so a variable can't be used in its own declaration.
        self.program.declarations.declare_variable(symbol);

        let target = self.program.tree.name(symbol);
        Ok(self.program.tree.op(keyword, Some(target), Some(value)))
    }

    /// Parses `print ( Expression ) ;`.
    fn print(&mut self) -> Result<NodeId, Syntax> {
        self.consume(Keyword::Print)?;
        self.consume(Keyword::OpenParen)?;
        let value = self.expression()?;
        self.consume(Keyword::CloseParen)?;
        self.consume(Keyword::Connect)?;

        Ok(self.program.tree.op(Keyword::Print, Some(value), None))
    }

    /// Parses `return Expression`, with an optional trailing `;`.
    fn ret(&mut self) -> Result<NodeId, Syntax> {
        self.consume(Keyword::Return)?;
        let value = self.expression()?;
        if self.is(Keyword::Connect) {
            self.index += 1;
        }

        Ok(self.program.tree.op(Keyword::Return, Some(value), None))
    }

    // Expressions
    // Each level parses the next tighter level,
    // folding repeated operators to the left.

    fn binary(
        &mut self,
        operators: &[Keyword],
        next: fn(&mut Parser) -> Result<NodeId, Syntax>,
    ) -> Result<NodeId, Syntax> {
        let mut left = next(self)?;

        while let Some(Token::Keyword(op)) = self.peek() {
            if !operators.contains(op) {
                break;
            }
            let op = *op;
            self.index += 1;
            let right = next(self)?;
            left = self.program.tree.op(op, Some(left), Some(right));
        }

        Ok(left)
    }

    /// `Term (('+'|'-') Term)*`
    pub fn expression(&mut self) -> Result<NodeId, Syntax> {
        self.binary(&[Keyword::Add, Keyword::Sub], Parser::term)
    }

    /// `Power (('*'|'/') Power)*`
    fn term(&mut self) -> Result<NodeId, Syntax> {
        self.binary(&[Keyword::Mul, Keyword::Div], Parser::power)
    }

    /// `Primary ('^' Primary)*`
    fn power(&mut self) -> Result<NodeId, Syntax> {
        self.binary(&[Keyword::Pow], Parser::primary)
    }

    fn primary(&mut self) -> Result<NodeId, Syntax> {
        let before = self.index;
        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error("Expected an expression, found end of source")),
        };

        match token.item {
            Token::Number(n) => Ok(self.program.tree.number(n)),

            Token::Keyword(Keyword::OpenParen) => {
                let inner = self.expression()?;
                self.consume(Keyword::CloseParen)?;
                Ok(inner)
            },

            Token::Keyword(Keyword::Call) => self.call(),

            Token::Keyword(k) if k.is_expression_builtin() => self.builtin(k),

            Token::Iden(symbol) => {
                let declarations = &self.program.declarations;
                if declarations.is_variable(symbol) {
                    return Ok(self.program.tree.name(symbol));
                }

                let name = self.program.name(symbol);
                let error = if declarations.is_function(symbol) {
                    Syntax::error_with_note(
                        &format!("`{}` is a function, not a variable", name),
                        Note::new_with_hint(
                            &format!("use `call {}()` to call it", name),
                            &token.span,
                        ),
                    )
                } else {
                    Syntax::error(
                        &format!("Variable `{}` is used before it is declared", name),
                        &token.span,
                    )
                };
                Err(error.at_token(before))
            },

            Token::Keyword(Keyword::Print) => Err(Syntax::error(
                "`print` is a statement, it can't be used inside an expression",
                &token.span,
            )
            .at_token(before)),

            other => Err(Syntax::error(
                &format!("Expected an expression, found {}", other),
                &token.span,
            )
            .at_token(before)),
        }
    }

    /// Parses the arguments of a builtin like `sin(x)` or `log(2, x)`.
    /// Unary builtins keep their argument on the right.
    fn builtin(&mut self, keyword: Keyword) -> Result<NodeId, Syntax> {
        self.consume(Keyword::OpenParen)?;

        let arity = keyword.arity();
        let (left, right) = match arity {
            0 => (None, None),
            1 => (None, Some(self.expression()?)),
            2 => {
                let first = self.expression()?;
                if !self.is(Keyword::Comma) {
                    return Err(self.error_with_hint(
                        &format!("Expected `,`, found {}", self.found()),
                        &format!("{} takes 2 arguments", keyword),
                    ));
                }
                self.index += 1;
                (Some(first), Some(self.expression()?))
            },
            n => {
                return Err(self.error(&format!(
                    "Internal error: builtin {} is listed with {} arguments, which is unsupported",
                    keyword, n,
                )))
            },
        };

        if !self.is(Keyword::CloseParen) {
            let s = if arity == 1 { "" } else { "s" };
            return Err(self.error_with_hint(
                &format!("Expected `)`, found {}", self.found()),
                &format!("{} takes {} argument{}", keyword, arity, s),
            ));
        }
        self.index += 1;

        Ok(self.program.tree.op(keyword, left, right))
    }

    /// Parses the rest of `call Name ( )`.
    fn call(&mut self) -> Result<NodeId, Syntax> {
        let token = self.index;
        let (symbol, span) = self.name("the name of a function to call")?;
        self.consume(Keyword::OpenParen)?;
        if !self.is(Keyword::CloseParen) {
            return Err(self.error_with_hint(
                &format!("Expected `)`, found {}", self.found()),
                "functions do not take arguments",
            ));
        }
        self.index += 1;

        self.calls.push(PendingCall { symbol, span, token });
        let target = self.program.tree.name(symbol);
        Ok(self.program.tree.op(Keyword::Call, Some(target), None))
    }

    /// Makes sure every `call` refers to a function.
    fn check_calls(&self) -> Result<(), Syntax> {
        for call in self.calls.iter() {
            if self.program.declarations.is_function(call.symbol) {
                continue;
            }

            let name = self.program.name(call.symbol);
            let reason = if self.program.declarations.is_variable(call.symbol) {
                format!("`{}` is a variable, it can't be called", name)
            } else {
                format!("Function `{}` is called but never defined", name)
            };
            return Err(Syntax::error(&reason, &call.span).at_token(call.token));
        }
        Ok(())
    }
}

//! The saved form of a tree: a fully parenthesized prefix notation.
//! Each node is written as `( payload left right )`,
//! with `nil` standing in for a missing child:
//!
//! ```plain
//! (:=
//!     ("a" nil nil)
//!     (+
//!         (2 nil nil)
//!         (3 nil nil)
//!     )
//! )
//! ```
//!
//! Numbers are written as is, names in double quotes,
//! and operators by their canonical name.
//! The loader is whitespace-insensitive and also accepts
//! childless numbers and names written bare, as in `(+ 2 "x")`,
//! which is the compact form produced by `inline`.

use std::{fmt, rc::Rc};

use log::debug;

use crate::{
    common::{source::Source, span::Span},
    compiler::{error::Error, syntax::Syntax},
    construct::{
        keyword::Keyword,
        program::Program,
        symbol::SymbolTable,
        tree::{Kind, NodeId, TreeInvariant},
    },
};

/// Writes a subtree in prefix notation.
/// Use `{}` for the indented, one-node-per-line form,
/// and `{:#}` for the compact single line form.
pub struct Prefix<'a> {
    program: &'a Program,
    node:    NodeId,
}

impl<'a> Prefix<'a> {
    pub fn new(program: &'a Program, node: NodeId) -> Prefix<'a> {
        Prefix { program, node }
    }

    fn payload(&self, f: &mut fmt::Formatter<'_>, kind: &Kind) -> fmt::Result {
        match kind {
            Kind::Number(n) => write!(f, "{}", n),
            Kind::Name(s) => write!(f, "\"{}\"", self.program.name(*s)),
            Kind::Op(k) => write!(f, "{}", k.name()),
        }
    }

    /// Writes the start of a node, scheduling the rest of it.
    fn node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        depth: usize,
        steps: &mut Vec<Step>,
    ) -> fmt::Result {
        let node = &self.program.tree[id];
        let leaf = node.left.is_none() && node.right.is_none();

        if f.alternate() {
            if leaf && !matches!(node.kind, Kind::Op(_)) {
                return self.payload(f, &node.kind);
            }
            write!(f, "(")?;
            self.payload(f, &node.kind)?;
            steps.extend([
                Step::Text(")"),
                Step::Child(node.right, depth),
                Step::Text(" "),
                Step::Child(node.left, depth),
                Step::Text(" "),
            ]);
            return Ok(());
        }

        write!(f, "(")?;
        self.payload(f, &node.kind)?;
        if leaf {
            return write!(f, " nil nil)");
        }

        steps.extend([
            Step::Text(")"),
            Step::Line(depth),
            Step::Child(node.right, depth + 1),
            Step::Line(depth + 1),
            Step::Child(node.left, depth + 1),
            Step::Line(depth + 1),
        ]);
        Ok(())
    }
}

/// What's left to write, innermost last.
enum Step {
    Child(Option<NodeId>, usize),
    /// A newline, indented to a depth.
    Line(usize),
    Text(&'static str),
}

impl fmt::Display for Prefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps = vec![Step::Child(Some(self.node), 0)];

        while let Some(step) = steps.pop() {
            match step {
                Step::Child(Some(id), depth) => self.node(f, id, depth, &mut steps)?,
                Step::Child(None, _) => write!(f, "nil")?,
                Step::Line(depth) => write!(f, "\n{}", "    ".repeat(depth))?,
                Step::Text(text) => write!(f, "{}", text)?,
            }
        }
        Ok(())
    }
}

/// Saves a whole program's tree.
pub fn save(program: &Program) -> Result<String, TreeInvariant> {
    let root = program.tree.root.ok_or(TreeInvariant::Empty)?;
    Ok(format!("{}\n", Prefix::new(program, root)))
}

/// The compact single line form of a subtree, handy in logs and tests.
pub fn inline(program: &Program, node: NodeId) -> String {
    format!("{:#}", Prefix::new(program, node))
}

/// Loads a saved tree into a fresh program.
/// The program's source is the saved text itself.
pub fn load(source: Rc<Source>) -> Result<Program, Error> {
    let mut program = Program::empty(Rc::clone(&source), SymbolTable::new());
    load_into(&mut program, source)?;
    Ok(program)
}

/// Loads a saved tree into an existing program,
/// interning names into its symbol table.
/// The program's tree must be empty.
pub fn load_into(program: &mut Program, source: Rc<Source>) -> Result<(), Error> {
    if !program.tree.is_empty() {
        return Err(TreeInvariant::NotEmpty.into());
    }

    let mut loader = Loader { source, index: 0, program };
    let root = loader.node()?;

    loader.strip();
    if loader.index < loader.source.contents.len() {
        return Err(loader.error("Unexpected text after the end of the tree").into());
    }

    loader.program.tree.root = Some(root);
    debug!("loaded {} nodes", loader.program.tree.live());
    Ok(())
}

/// A single lexeme of the saved form.
#[derive(Debug, PartialEq)]
enum Piece {
    Open,
    Close,
    Quoted(String),
    Word(String),
}

/// What reading one position of the saved form produced.
enum Read {
    /// `nil` or a complete leaf.
    Done(Option<NodeId>),
    /// An opened node, with its payload.
    Open(Kind),
}

/// A node whose children are still being read.
struct Partial {
    kind: Kind,
    /// Set once the left child has been read.
    left: Option<Option<NodeId>>,
}

struct Loader<'a> {
    source:  Rc<Source>,
    index:   usize,
    program: &'a mut Program,
}

impl Loader<'_> {
    fn rest(&self) -> &str {
        &self.source.contents[self.index..]
    }

    fn strip(&mut self) {
        let rest = self.rest();
        self.index += rest.len() - rest.trim_start().len();
    }

    fn error(&self, reason: &str) -> Syntax {
        Syntax::error(reason, &Span::point(&self.source, self.index))
    }

    /// Reads the next piece, returning it along with where it was.
    /// In payload position, a parenthesis is the name of an operator.
    fn piece(&mut self, payload: bool) -> Result<(Piece, Span), Syntax> {
        self.strip();
        let start = self.index;
        let rest = self.rest();

        let (piece, len) = match rest.chars().next() {
            None => return Err(self.error("Unexpected end of the saved tree")),
            Some(c @ ('(' | ')')) if payload => (Piece::Word(c.to_string()), 1),
            Some('(') => (Piece::Open, 1),
            Some(')') => (Piece::Close, 1),
            Some('"') => match rest[1..].find('"') {
                Some(0) => return Err(self.error("Names can't be empty")),
                Some(end) => (Piece::Quoted(rest[1..=end].to_string()), end + 2),
                None => return Err(self.error("Name is missing its closing `\"`")),
            },
            Some(_) => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == '"')
                    .unwrap_or(rest.len());
                (Piece::Word(rest[..len].to_string()), len)
            },
        };

        self.index += len;
        Ok((piece, Span::new(&self.source, start, len)))
    }

    fn is_nil(&self) -> bool {
        let rest = self.rest();
        rest.starts_with("nil")
            && !rest[3..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
    }

    /// Reads `nil` (where allowed), a bare leaf,
    /// or the opening of a node up to and including its payload.
    fn read(&mut self, nil: bool) -> Result<Read, Syntax> {
        self.strip();
        if nil && self.is_nil() {
            self.index += 3;
            return Ok(Read::Done(None));
        }

        let (piece, span) = self.piece(false)?;
        match piece {
            Piece::Open => {
                let (piece, span) = self.piece(true)?;
                Ok(Read::Open(self.payload(piece, &span)?))
            },
            Piece::Close => Err(Syntax::error("Unexpected `)`", &span)),
            leaf => {
                let kind = self.payload(leaf, &span)?;
                if let Kind::Op(_) = kind {
                    return Err(Syntax::error(
                        "Operators must be written as `(op left right)`",
                        &span,
                    ));
                }
                Ok(Read::Done(Some(self.program.tree.construct(kind, None, None))))
            },
        }
    }

    fn close(&mut self) -> Result<(), Syntax> {
        let (piece, span) = self.piece(false)?;
        if piece != Piece::Close {
            return Err(Syntax::error("Expected `)` to close the node", &span));
        }
        Ok(())
    }

    /// Reads a whole node.
    /// Nodes still waiting on children are kept on a stack,
    /// so nesting depth is only limited by memory.
    fn node(&mut self) -> Result<NodeId, Syntax> {
        let mut open: Vec<Partial> = vec![];
        let mut next = self.read(false)?;

        loop {
            let mut child = match next {
                Read::Open(kind) => {
                    open.push(Partial { kind, left: None });
                    next = self.read(true)?;
                    continue;
                },
                Read::Done(child) => child,
            };

            // a finished child may finish its parent, and so on upwards
            loop {
                let mut partial = match open.pop() {
                    Some(partial) => partial,
                    None => return child.ok_or_else(|| self.error("Expected a node")),
                };

                match partial.left {
                    None => {
                        partial.left = Some(child);
                        open.push(partial);
                        break;
                    },
                    Some(left) => {
                        self.close()?;
                        child = Some(self.program.tree.construct(partial.kind, left, child));
                    },
                }
            }

            next = self.read(true)?;
        }
    }

    fn payload(&mut self, piece: Piece, span: &Span) -> Result<Kind, Syntax> {
        match piece {
            Piece::Quoted(name) => Ok(Kind::Name(self.program.symbols.intern(&name))),
            Piece::Word(word) => {
                if let Some(keyword) = Keyword::from_name(&word) {
                    Ok(Kind::Op(keyword))
                } else if let Ok(n) = word.parse::<f64>() {
                    Ok(Kind::Number(n))
                } else {
                    Err(Syntax::error(
                        &format!(
                            "Unknown payload `{}`, expected a number, a quoted name, or an operator",
                            word
                        ),
                        span,
                    ))
                }
            },
            _ => Err(Syntax::error("Expected the payload of a node", span)),
        }
    }
}

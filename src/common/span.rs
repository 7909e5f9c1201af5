use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source` rather than a `String`.
/// A `Span` is meant to be paired with other datastructures,
/// to be used during error reporting.
#[derive(Clone, Eq, PartialEq)]
pub struct Span {
    source: Rc<Source>,
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    /// All `Span`s have access to the `Source` from whence they came,
    /// So they can't be misinterpreted or miscombined.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span {
            source: Rc::clone(source),
            offset,
            length,
        }
    }

    /// A `Span` that points at a specific point in the source.
    /// Has a length of `0`.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span::new(source, offset, 0)
    }

    /// Return the index of the end of the `Span`.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Returns the contents of a `Span`.
    /// This indexes into the source file,
    /// so if the `Span` is along an invalid byte boundary,
    /// the program will panic.
    pub fn contents(&self) -> String {
        self.source.contents[self.offset..self.end()].to_string()
    }

    pub fn path(&self) -> String {
        self.source.path.to_string_lossy().to_string()
    }

    /// The one-based line and column where this `Span` starts,
    /// as reported to the user.
    pub fn line_col(&self) -> (usize, usize) {
        let (line, col) = self.source.position(self.offset);
        (line + 1, col + 1)
    }

    pub fn format(&self) -> FormattedSpan {
        let (start, start_col) = self.source.position(self.offset);
        let (end, end_col) = self.source.position(self.end());
        let lines = self
            .source
            .contents
            .split('\n')
            .skip(start)
            .take(end - start + 1)
            .map(|l| l.to_string())
            .collect();

        FormattedSpan {
            path: self.path(),
            start,
            lines,
            start_col,
            end_col,
        }
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("contents", &self.contents())
            .field("start", &self.offset)
            .field("end", &self.end())
            .finish()
    }
}

impl Display for Span {
    /// Given a `Span`, `fmt` will print out where the `Span` occurs in its source.
    /// Single-line `Span`s:
    /// ```plain
    /// 12 | x = 3 + ) ;
    ///    |         ^
    /// ```
    /// Multi-line `Span`s:
    /// ```plain
    /// 12 > if (x) {
    /// 13 >     y = x + 1;
    /// 14 > }
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Represents a formatted span, ready to be displayed.
/// Contains information about where the span is from,
/// and where in the text it starts and ends
/// relative to the lines in the source.
pub struct FormattedSpan {
    pub path: String,
    pub start: usize,
    pub lines: Vec<String>,
    pub start_col: usize,
    pub end_col: usize,
}

impl FormattedSpan {
    pub fn is_multiline(&self) -> bool {
        self.lines.len() != 1
    }

    pub fn gutter_padding(&self) -> usize {
        (self.start + self.lines.len()).to_string().len()
    }

    /// If a single line span, returns the number of carrots between cols.
    /// Point spans still get a single carrot.
    pub fn carrots(&self) -> Option<usize> {
        if self.is_multiline() {
            None
        } else {
            Some((self.end_col - self.start_col).max(1))
        }
    }
}

impl Display for FormattedSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let padding = " ".repeat(self.gutter_padding());

        writeln!(
            f,
            "In {}:{}:{}",
            self.path,
            self.start + 1,
            self.start_col + 1
        )?;
        writeln!(f, "{} |", padding)?;

        if let Some(carrots) = self.carrots() {
            let line_no = (self.start + 1).to_string();
            writeln!(
                f,
                "{}{} | {}",
                line_no,
                " ".repeat(padding.len() - line_no.len()),
                self.lines[0]
            )?;
            writeln!(
                f,
                "{} | {}{}",
                padding,
                " ".repeat(self.start_col),
                "^".repeat(carrots),
            )?;
        } else {
            for (index, line) in self.lines.iter().enumerate() {
                let line_no = (self.start + index + 1).to_string();
                let gap = " ".repeat(padding.len() - line_no.len());
                writeln!(f, "{}{} > {}", line_no, gap, line)?;
            }
        }

        Ok(())
    }
}

/// A wrapper for spanning types.
/// For example, a token, such as
/// ```plain
/// pub enum Token {
///     Number(f64),
///     Keyword(Keyword),
///     Iden(usize),
/// }
/// ```
/// can be spanned to indicate where it was lexed from (a `Spanned<Token>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Takes a generic item, and wraps in in a `Span` to make it `Spanned`.
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}

use std::fmt;

use crate::common::span::Span;

/// Represents a note attached to a Syntax error,
/// i.e. a location in source code with an optional
/// specific hint or tip corresponding this this specific location
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub span: Span,
    pub hint: Option<String>,
}

impl Note {
    pub fn new(span: Span) -> Note {
        Note { span, hint: None }
    }

    pub fn new_with_hint(hint: &str, span: &Span) -> Note {
        Note {
            span: span.clone(),
            hint: Some(hint.to_string()),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.span.format();
        write!(f, "{}", formatted)?;

        if let Some(ref hint) = self.hint {
            writeln!(
                f,
                "{} = note: {}",
                " ".repeat(formatted.gutter_padding()),
                hint
            )?;
        }
        Ok(())
    }
}

/// Represents a static error (grammar, declarations, etc.)
/// found while parsing a program or loading a saved tree.
/// Ideally, each note included should have a distinct `Span` and hint.
/// Usually, one `Note` per error is enough.
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    pub reason: String,
    pub notes:  Vec<Note>,
    /// Index of the offending token, if the error came from the parser.
    pub token:  Option<usize>,
}

impl Syntax {
    /// Creates a new static error with a single note that does not have a hint.
    pub fn error(reason: &str, span: &Span) -> Syntax {
        Syntax::error_with_note(reason, Note::new(span.clone()))
    }

    /// Creates a new static error with a single note that may or may not have a
    /// hint.
    pub fn error_with_note(reason: &str, note: Note) -> Syntax {
        Syntax {
            reason: reason.to_string(),
            notes:  vec![note],
            token:  None,
        }
    }

    /// Extend a syntax error by adding another note to the error.
    pub fn add_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    /// Records which token the error was found at.
    pub fn at_token(mut self, index: usize) -> Self {
        self.token = Some(index);
        self
    }

    /// One-based line and column of the first note.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        self.notes.first().map(|n| n.span.line_col())
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for note in self.notes.iter() {
            write!(f, "{}", note)?;
        }
        write!(f, "Syntax Error: {}", self.reason)
    }
}

impl std::error::Error for Syntax {}

/// An error raised while splitting source into tokens,
/// such as a stray character or a malformed number.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexical {
    pub reason: String,
    pub span:   Span,
}

impl Lexical {
    pub fn error(reason: &str, span: &Span) -> Lexical {
        Lexical {
            reason: reason.to_string(),
            span:   span.clone(),
        }
    }

    pub fn line_col(&self) -> (usize, usize) {
        self.span.line_col()
    }
}

impl fmt::Display for Lexical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.span)?;
        write!(f, "Lexical Error: {}", self.reason)
    }
}

impl std::error::Error for Lexical {}

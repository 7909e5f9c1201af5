use crate::{
    compiler::{
        gen::Codegen,
        syntax::{Lexical, Syntax},
    },
    construct::tree::TreeInvariant,
};

/// Any error raised along the pipeline.
/// The first error raised aborts the whole compilation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Lexical(#[from] Lexical),
    #[error("{0}")]
    Syntax(#[from] Syntax),
    #[error("Tree Error: {0}")]
    Tree(#[from] TreeInvariant),
    #[error("Codegen Error: {0}")]
    Codegen(#[from] Codegen),
}

impl Error {
    /// One-based line and column of the error, if it has a position.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        match self {
            Error::Lexical(lexical) => Some(lexical.line_col()),
            Error::Syntax(syntax) => syntax.line_col(),
            Error::Tree(_) | Error::Codegen(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::{source::Source, span::Span};

    #[test]
    fn messages() {
        let error: Error = Codegen::Duplicate("main".to_string()).into();
        assert_eq!(error.to_string(), "Codegen Error: label `main` is defined more than once");
        assert_eq!(error.line_col(), None);

        let error: Error = TreeInvariant::Empty.into();
        assert_eq!(error.to_string(), "Tree Error: the tree has no root");

        let source = Source::source("x");
        let error: Error = Lexical::error("Oops", &Span::new(&source, 0, 1)).into();
        assert!(error.to_string().ends_with("Lexical Error: Oops"));
        assert_eq!(error.line_col(), Some((1, 1)));
    }
}

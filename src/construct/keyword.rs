use std::fmt::Display;

/// Every keyword and operator of the language.
/// Operator nodes in the tree are tagged with one of these,
/// so punctuation-only keywords (parens, braces) exist here too
/// even though they never make it into a well-formed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, proptest_derive::Arbitrary)]
pub enum Keyword {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,

    // Math builtins
    Log,
    Ln,
    Sin,
    Cos,
    Tg,
    Ctg,
    Arcsin,
    Arccos,
    Arctg,
    Arcctg,
    Sh,
    Ch,
    Th,
    Cth,

    // IO builtins
    Input,
    Print,

    // Structure
    Connect,
    Comma,
    Declare,
    Assign,
    If,
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,

    // Functions
    Func,
    Main,
    Return,
    Call,
}

/// A single row of the keyword table.
#[derive(Debug)]
pub struct Entry {
    pub keyword: Keyword,
    /// How the keyword is written in source code.
    pub spelling: &'static str,
    /// How the keyword is written in a saved tree.
    pub name: &'static str,
    /// Whether the keyword is called like a function, i.e. `sin(x)`.
    pub builtin: bool,
    pub arity: usize,
}

macro_rules! entry {
    ($keyword:ident, $spelling:expr, $name:expr, $builtin:expr, $arity:expr) => {
        Entry {
            keyword: Keyword::$keyword,
            spelling: $spelling,
            name: $name,
            builtin: $builtin,
            arity: $arity,
        }
    };
}

/// The keyword table.
/// The lexer takes the first entry whose spelling prefixes the input,
/// so order matters: an entry must never be shadowed by an earlier,
/// shorter one.
pub const KEYWORDS: &[Entry] = &[
    entry!(Add,        "+",      "+",      false, 2),
    entry!(Sub,        "-",      "-",      false, 2),
    entry!(Mul,        "*",      "*",      false, 2),
    entry!(Div,        "/",      "/",      false, 2),
    entry!(Pow,        "^",      "^",      false, 2),
    entry!(Log,        "log",    "log",    true,  2),
    entry!(Ln,         "ln",     "ln",     true,  1),
    entry!(Sin,        "sin",    "sin",    true,  1),
    entry!(Cos,        "cos",    "cos",    true,  1),
    entry!(Tg,         "tg",     "tg",     true,  1),
    entry!(Ctg,        "ctg",    "ctg",    true,  1),
    entry!(Arcsin,     "arcsin", "arcsin", true,  1),
    entry!(Arccos,     "arccos", "arccos", true,  1),
    entry!(Arctg,      "arctg",  "arctg",  true,  1),
    entry!(Arcctg,     "arcctg", "arcctg", true,  1),
    entry!(Sh,         "sh",     "sh",     true,  1),
    entry!(Ch,         "ch",     "ch",     true,  1),
    entry!(Th,         "th",     "th",     true,  1),
    entry!(Cth,        "cth",    "cth",    true,  1),
    entry!(Input,      "input",  "input",  true,  0),
    entry!(Print,      "print",  "print",  true,  1),
    entry!(Connect,    ";",      ";",      false, 0),
    entry!(Comma,      ",",      ",",      false, 0),
    entry!(Declare,    ":=",     ":=",     false, 0),
    entry!(Assign,     "=",      "=",      false, 0),
    entry!(If,         "if",     "if",     false, 0),
    entry!(OpenParen,  "(",      "(",      false, 0),
    entry!(CloseParen, ")",      ")",      false, 0),
    entry!(OpenCurly,  "{",      "{",      false, 0),
    entry!(CloseCurly, "}",      "}",      false, 0),
    entry!(Func,       "func",   "func",   false, 0),
    entry!(Main,       "main",   "main",   false, 0),
    entry!(Return,     "return", "return", false, 0),
    entry!(Call,       "call",   "call",   false, 0),
];

impl Keyword {
    /// Finds the first keyword whose spelling is a prefix of `remaining`.
    pub fn prefix_of(remaining: &str) -> Option<&'static Entry> {
        KEYWORDS.iter().find(|e| remaining.starts_with(e.spelling))
    }

    /// Finds a keyword by its canonical name, as written in saved trees.
    pub fn from_name(name: &str) -> Option<Keyword> {
        KEYWORDS.iter().find(|e| e.name == name).map(|e| e.keyword)
    }

    pub fn entry(&self) -> &'static Entry {
        // every keyword has exactly one row, see the `complete` test.
        KEYWORDS
            .iter()
            .find(|e| e.keyword == *self)
            .unwrap_or(&KEYWORDS[0])
    }

    pub fn name(&self) -> &'static str {
        self.entry().name
    }

    pub fn arity(&self) -> usize {
        self.entry().arity
    }

    /// Builtins that may appear inside an expression.
    /// `print` is function-style but only allowed as a statement.
    pub fn is_expression_builtin(&self) -> bool {
        self.entry().builtin && *self != Keyword::Print
    }

    /// Operators that the simplifier knows how to evaluate.
    pub fn is_math(&self) -> bool {
        use Keyword::*;
        matches!(
            self,
            Add | Sub | Mul | Div | Pow | Log | Ln | Sin | Cos | Tg | Ctg
                | Arcsin | Arccos | Arctg | Arcctg | Sh | Ch | Th | Cth
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}`", self.entry().spelling)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn complete() {
        let mut seen = std::collections::HashSet::new();
        for entry in KEYWORDS {
            assert!(seen.insert(entry.keyword), "{:?} listed twice", entry.keyword);
        }
        assert_eq!(seen.len(), KEYWORDS.len());
        assert_eq!(KEYWORDS.len(), 34);
    }

    #[test]
    fn no_shadowing() {
        // an earlier spelling may never be a prefix of a later one
        for (i, early) in KEYWORDS.iter().enumerate() {
            for late in &KEYWORDS[i + 1..] {
                assert!(
                    !late.spelling.starts_with(early.spelling),
                    "{} shadows {}",
                    early.spelling,
                    late.spelling,
                );
            }
        }
    }

    #[test]
    fn prefix_lookup() {
        assert_eq!(Keyword::prefix_of(":= 3").unwrap().keyword, Keyword::Declare);
        assert_eq!(Keyword::prefix_of("= 3").unwrap().keyword, Keyword::Assign);
        assert_eq!(Keyword::prefix_of("arcctg(x)").unwrap().keyword, Keyword::Arcctg);
        assert_eq!(Keyword::prefix_of("cth(x)").unwrap().keyword, Keyword::Cth);
        assert!(Keyword::prefix_of("x").is_none());
    }

    proptest! {
        #[test]
        fn names_round_trip(keyword: Keyword) {
            prop_assert_eq!(Keyword::from_name(keyword.name()), Some(keyword));
        }

        #[test]
        fn arity_matches_shape(keyword: Keyword) {
            if keyword.is_math() {
                prop_assert!(keyword.arity() == 1 || keyword.arity() == 2);
            }
            if keyword.is_expression_builtin() {
                prop_assert!(keyword.arity() <= 2);
            }
        }
    }
}

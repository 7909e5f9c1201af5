//! Snippet tests for the rhyme compiler pipeline as a whole.
//! Each snippet in `tests/snippets` starts with a heading like:
//!
//! ```plain
//! # action: run
//! # outcome: success
//! # input: 3 4
//! # expect: 7
//! # returns: 0
//! ```
//!
//! Heading lines are blanked out before compiling,
//! so errors still point at the right line.
use std::{collections::HashMap, fs, path::PathBuf, rc::Rc};

use rhyme::{
    compiler::{self, Error},
    construct::prefix,
    *,
};

mod machine;

/// Represents specific success/failure modes of a snippet test.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Lexical,
    Syntax,
    Tree,
    Codegen,
    Trace,
}

impl Outcome {
    pub fn parse(outcome: &str) -> Outcome {
        match outcome {
            "success" => Outcome::Success,
            "lexical" => Outcome::Lexical,
            "syntax" => Outcome::Syntax,
            "tree" => Outcome::Tree,
            "codegen" => Outcome::Codegen,
            "trace" => Outcome::Trace,
            invalid => panic!("invalid outcome '{}' in strat heading", invalid),
        }
    }

    pub fn of(error: &Error) -> Outcome {
        match error {
            Error::Lexical(_) => Outcome::Lexical,
            Error::Syntax(_) => Outcome::Syntax,
            Error::Tree(_) => Outcome::Tree,
            Error::Codegen(_) => Outcome::Codegen,
        }
    }
}

/// Represents what part of the compiler a snippet tests.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Lex,
    Parse,
    Simplify,
    Gen,
    Run,
}

impl Action {
    pub fn parse(action: &str) -> Action {
        match action {
            "lex" => Action::Lex,
            "parse" => Action::Parse,
            "simplify" => Action::Simplify,
            "gen" => Action::Gen,
            "run" => Action::Run,
            invalid => panic!("invalid action '{}' in strat heading", invalid),
        }
    }
}

fn numbers(list: &str) -> Vec<f64> {
    list.split_whitespace()
        .map(|n| n.parse().expect("expected a list of numbers"))
        .collect()
}

/// Represents a test strategy for executing a snippet,
/// found at the top of each file.
#[derive(Debug)]
pub struct TestStrat {
    /// How to run the test.
    action:  Action,
    /// The expected outcome.
    outcome: Outcome,
    /// Values fed to `input()`, in order.
    input:   Vec<f64>,
    /// Values the program should print.
    /// Should only be used with Action::Run
    expect:  Option<Vec<f64>>,
    /// What `main` should return.
    returns: Option<f64>,
}

impl TestStrat {
    /// Uses a heading to construct a test strat
    pub fn heading(heading: HashMap<String, String>) -> TestStrat {
        let mut outcome = None;
        let mut action = None;
        let mut input = vec![];
        let mut expect = None;
        let mut returns = None;

        for (strat, result) in heading.iter() {
            match strat.as_str() {
                "outcome" => outcome = Some(Outcome::parse(result)),
                "action" => action = Some(Action::parse(result)),
                "input" => input = numbers(result),
                "expect" => expect = Some(numbers(result)),
                "returns" => returns = Some(result.parse().expect("expected a number")),
                invalid => panic!("invalid strat '{}' in strat heading", invalid),
            }
        }

        TestStrat {
            outcome: outcome.expect("no outcome provided"),
            action: action.expect("no action provided"),
            input,
            expect,
            returns,
        }
    }

    /// Parses the Test Strat from a given snippet,
    /// returning it along with the snippet with its heading blanked out.
    pub fn snippet(source: &Rc<Source>) -> (TestStrat, Rc<Source>) {
        let mut heading = HashMap::new();
        let mut blanked = vec![];

        // build up a list of key-value pairs
        for line in source.contents.lines() {
            let strat = match line.trim().strip_prefix('#') {
                Some(strat) => strat,
                None => {
                    blanked.push(line);
                    continue;
                },
            };
            blanked.push("");

            let (key, value) = strat
                .split_once(':')
                .expect("Missing colon in test strat heading");
            if heading
                .insert(key.trim().to_string(), value.trim().to_string())
                .is_some()
            {
                panic!("Key present twice in test strat heading");
            }
        }

        let blanked = Source::new(&blanked.join("\n"), &source.path);
        (TestStrat::heading(heading), blanked)
    }
}

fn outcome<T>(t: Result<T, Error>) -> Outcome {
    match t {
        Ok(_) => Outcome::Success,
        Err(e) => {
            eprintln!("{}", e);
            Outcome::of(&e)
        },
    }
}

fn snippet_outcome(source: Rc<Source>, strat: &TestStrat) -> Outcome {
    let result = match strat.action {
        Action::Lex => return outcome(compiler::lex(source)),
        Action::Simplify => return outcome(compiler::simplify(source)),
        Action::Gen => return outcome(compiler::gen(source)),
        // saving then loading a parsed tree gives back the same tree
        Action::Parse => {
            let program = match compiler::parse(source) {
                Ok(p) => p,
                Err(e) => return outcome::<()>(Err(e)),
            };
            let saved = prefix::save(&program).expect("parsed trees have a root");
            let loaded = prefix::load(Source::source(&saved)).expect("saved trees load");
            assert!(program.same_tree(&loaded), "tree did not round trip");
            return Outcome::Success;
        },
        Action::Run => compiler::gen(source),
    };

    let assembly = match result {
        Ok(a) => a,
        Err(e) => return outcome::<()>(Err(e)),
    };
    println!("{}", assembly);

    let halted = match machine::run(&assembly, &strat.input) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}", e);
            return Outcome::Trace;
        },
    };

    if let Some(expected) = &strat.expect {
        assert_eq!(&halted.output, expected, "printed values do not match");
    }
    if let Some(expected) = strat.returns {
        assert_eq!(halted.rax, expected, "returned value does not match");
    }
    Outcome::Success
}

fn test_snippet(source: Rc<Source>, strat: &TestStrat) {
    let outcome = snippet_outcome(source, strat);
    if outcome != strat.outcome {
        println!("expected outcome {:?}", strat.outcome);
        println!("actual outcome {:?}", outcome);
        panic!("test failed, outcomes are not the same");
    }
}

fn snippets(dir: &str) {
    let paths = fs::read_dir(dir)
        .expect("You must be in the base rhyme directory, snippets in ./tests/snippets");

    let mut to_run: Vec<PathBuf> = vec![];
    for path in paths {
        to_run.push(path.expect("Could not read path").path())
    }
    to_run.sort();

    println!("\nRunning {} snippet test(s)...", to_run.len());

    for (counter, path) in to_run.iter().enumerate() {
        println!("test {}: {}...", counter, path.display());

        let source = Source::path(path).expect("Could not get snippet source");
        let (test_strat, source) = TestStrat::snippet(&source);

        test_snippet(source, &test_strat);
    }

    println!("All tests passed!\n");
}

#[test]
fn test_snippets() {
    snippets("./tests/snippets")
}

#[test]
fn blanked_heading_keeps_positions() {
    let source = Source::source("# action: parse\n# outcome: syntax\nmain m() {\n  return x;\n}");
    let (strat, blanked) = TestStrat::snippet(&source);
    assert_eq!(strat.action, Action::Parse);

    let error = compiler::parse(blanked).unwrap_err();
    assert_eq!(error.line_col(), Some((4, 10)));
}

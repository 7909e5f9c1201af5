use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
};

use log::{debug, trace};

use crate::construct::{
    keyword::Keyword,
    program::Program,
    tree::{Kind, NodeId},
};

/// The most copies of a base `^` is unrolled into,
/// counting the copies made by any enclosing `^`.
pub const MAX_UNROLLED_POWER: usize = 64;

/// Things the generator can't lower.
/// These carry no position, as the tree has none.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Codegen {
    #[error("there is no tree to generate code for")]
    Empty,
    #[error("the left side of {0} must be a variable")]
    Target(Keyword),
    #[error("{0} must be given the name of a function")]
    NotAFunction(Keyword),
    #[error("{0} is missing an operand")]
    Missing(Keyword),
    #[error("the target has no instruction for {0}")]
    Unsupported(Keyword),
    #[error(
        "`^` can only be lowered with a whole literal exponent, \
         a base that doesn't use `input` or `call`, \
         and at most 64 copies of the base once nested powers are unrolled"
    )]
    Power,
    #[error("a number or a name can't have operands")]
    Leaf,
    #[error("{0} can't appear here")]
    Misplaced(Keyword),
    #[error("label `{0}` is defined more than once")]
    Duplicate(String),
    #[error("label `{0}` is used but never defined")]
    Undefined(String),
}

/// The only register the target machine has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Rax,
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Rax => write!(f, "RAX"),
        }
    }
}

/// A single line of stack machine assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Push(f64),
    /// Pops the top of the stack into a register.
    PopR(Register),
    /// Pushes the value of a register.
    PushR(Register),
    /// Pushes the memory cell addressed by a register.
    PushM(Register),
    /// Pops into the memory cell addressed by a register.
    PopM(Register),
    Add,
    Sub,
    Mul,
    Div,
    In,
    Out,
    /// Pops two values, jumping if they're equal.
    Je(String),
    Call(String),
    Ret,
    Hlt,
    Label(String),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match self {
            Push(n) => write!(f, "PUSH {}", n),
            PopR(r) => write!(f, "POPR {}", r),
            PushR(r) => write!(f, "PUSHR {}", r),
            PushM(r) => write!(f, "PUSHM [{}]", r),
            PopM(r) => write!(f, "POPM [{}]", r),
            Add => write!(f, "ADD"),
            Sub => write!(f, "SUB"),
            Mul => write!(f, "MUL"),
            Div => write!(f, "DIV"),
            In => write!(f, "IN"),
            Out => write!(f, "OUT"),
            Je(label) => write!(f, "JE :{}", label),
            Call(label) => write!(f, "CALL :{}", label),
            Ret => write!(f, "RET"),
            Hlt => write!(f, "HLT"),
            Label(label) => write!(f, ":{}", label),
        }
    }
}

/// Walks a tree and lowers it to stack machine assembly.
///
/// Every variable lives in one flat memory,
/// addressed by the index of its name in the symbol table.
/// A function leaves its result in `RAX`,
/// which the caller pushes back onto the stack after the `CALL`.
///
/// Labels are collected before anything is emitted,
/// so every jump and call is known to have exactly one target.
pub struct Generator<'a> {
    program: &'a Program,
    code:    Vec<Instruction>,
    /// Maps the name of each unit to its label.
    units:   HashMap<usize, String>,
    defined: HashSet<String>,
    endifs:  usize,
    /// How many times the subtree being walked is emitted,
    /// because of the `^`s it sits in.
    copies:  usize,
}

impl<'a> Generator<'a> {
    /// Generates the assembly text for a whole program, one line per instruction.
    pub fn gen(program: &'a Program) -> Result<String, Codegen> {
        let code = Generator::instructions(program)?;
        Ok(code.iter().map(|i| format!("{}\n", i)).collect())
    }

    /// Generates the instructions for a whole program.
    /// Nothing is returned if any part of the program can't be lowered.
    pub fn instructions(program: &'a Program) -> Result<Vec<Instruction>, Codegen> {
        let root = program.tree.root.ok_or(Codegen::Empty)?;
        let mut generator = Generator {
            program,
            code: vec![],
            units: HashMap::new(),
            defined: HashSet::new(),
            endifs: 0,
            copies: 1,
        };

        generator.labels(root)?;
        generator.targets(root)?;
        if !generator.defined.contains("main") {
            return Err(Codegen::Undefined("main".to_string()));
        }

        generator.emit(Instruction::Call("main".to_string()));
        generator.emit(Instruction::Hlt);
        generator.walk(root)?;

        debug!(
            "generated {} instructions for {} units",
            generator.code.len(),
            generator.units.len(),
        );
        Ok(generator.code)
    }

    fn emit(&mut self, instruction: Instruction) {
        trace!("emit {}", instruction);
        self.code.push(instruction);
    }

    /// The name a `func` or `main` header, or a `call`, refers to.
    fn unit_name(&self, keyword: Keyword, node: Option<NodeId>) -> Result<usize, Codegen> {
        let tree = &self.program.tree;
        let name = match keyword {
            // (, "name" nil)
            Keyword::Func | Keyword::Main => match node.map(|h| &tree[h]) {
                Some(header) if header.op() == Some(Keyword::Comma) => header.left,
                _ => None,
            },
            _ => node,
        };

        match name.map(|n| &tree[n].kind) {
            Some(Kind::Name(symbol)) => Ok(*symbol),
            _ => Err(Codegen::NotAFunction(keyword)),
        }
    }

    /// Collects the label of every unit, rejecting duplicates.
    fn labels(&mut self, root: NodeId) -> Result<(), Codegen> {
        let program = self.program;

        for id in program.tree.preorder(root) {
            let node = &program.tree[id];
            let keyword = match node.op() {
                Some(k @ (Keyword::Func | Keyword::Main)) => k,
                _ => continue,
            };

            let symbol = self.unit_name(keyword, node.left)?;
            let label = match keyword {
                Keyword::Main => "main".to_string(),
                _ => program.name(symbol).to_string(),
            };

            if !self.defined.insert(label.clone()) {
                return Err(Codegen::Duplicate(label));
            }
            self.units.insert(symbol, label);
        }
        Ok(())
    }

    /// Makes sure every `call` has a unit to go to,
    /// and that numbers and names are leaves.
    fn targets(&self, root: NodeId) -> Result<(), Codegen> {
        let tree = &self.program.tree;

        for id in tree.preorder(root) {
            let node = &tree[id];
            match node.kind {
                Kind::Number(_) | Kind::Name(_) if node.left.is_some() || node.right.is_some() => {
                    return Err(Codegen::Leaf)
                },
                Kind::Op(Keyword::Call) => {
                    let symbol = self.unit_name(Keyword::Call, node.left)?;
                    if !self.units.contains_key(&symbol) {
                        return Err(Codegen::Undefined(self.program.name(symbol).to_string()));
                    }
                },
                _ => (),
            }
        }
        Ok(())
    }

    /// A fresh `endif_N` label that no function is already using.
    fn endif(&mut self) -> String {
        loop {
            let label = format!("endif_{}", self.endifs);
            self.endifs += 1;
            if !self.defined.contains(&label) {
                return label;
            }
        }
    }

    /// Whether evaluating a subtree has no effects,
    /// i.e. it neither reads input nor calls a function.
    fn pure(&self, id: NodeId) -> bool {
        let tree = &self.program.tree;
        tree.preorder(id)
            .into_iter()
            .all(|n| !matches!(tree[n].op(), Some(Keyword::Input | Keyword::Call)))
    }

    fn walk(&mut self, id: NodeId) -> Result<(), Codegen> {
        let program = self.program;
        let node = &program.tree[id];

        match node.kind {
            Kind::Number(n) => {
                self.emit(Instruction::Push(n));
                Ok(())
            },
            Kind::Name(symbol) => {
                self.address(symbol);
                self.emit(Instruction::PushM(Register::Rax));
                Ok(())
            },
            Kind::Op(keyword) => self.op(keyword, id),
        }
    }

    /// Loads the address of a variable into `RAX`.
    fn address(&mut self, symbol: usize) {
        self.emit(Instruction::Push(symbol as f64));
        self.emit(Instruction::PopR(Register::Rax));
    }

    fn op(&mut self, keyword: Keyword, id: NodeId) -> Result<(), Codegen> {
        let program = self.program;
        let (left, right) = (program.tree[id].left, program.tree[id].right);
        let operand = |node: Option<NodeId>| node.ok_or(Codegen::Missing(keyword));

        use Keyword::*;
        match keyword {
            Add | Sub | Mul | Div => {
                let (l, r) = (operand(left)?, operand(right)?);
                self.walk(l)?;
                self.walk(r)?;
                self.emit(match keyword {
                    Add => Instruction::Add,
                    Sub => Instruction::Sub,
                    Mul => Instruction::Mul,
                    _ => Instruction::Div,
                });
            },

            Pow => self.power(operand(left)?, operand(right)?)?,

            Input => self.emit(Instruction::In),

            Print => {
                self.walk(operand(left)?)?;
                self.emit(Instruction::Out);
            },

            If => {
                let (condition, then) = (operand(left)?, operand(right)?);
                let label = self.endif();
                self.walk(condition)?;
                self.emit(Instruction::Push(0.0));
                self.emit(Instruction::Je(label.clone()));
                self.walk(then)?;
                self.emit(Instruction::Label(label));
            },

            Declare | Assign => {
                let symbol = match left.map(|l| &self.program.tree[l].kind) {
                    Some(Kind::Name(symbol)) => *symbol,
                    _ => return Err(Codegen::Target(keyword)),
                };
                self.walk(operand(right)?)?;
                self.address(symbol);
                self.emit(Instruction::PopM(Register::Rax));
            },

            // chains grow with every statement, so they're flattened
            // instead of walked down
            Connect => {
                for statement in program.tree.statements(id) {
                    self.walk(statement)?;
                }
            },

            Func | Main => {
                let symbol = self.unit_name(keyword, left)?;
                let label = self
                    .units
                    .get(&symbol)
                    .cloned()
                    .ok_or_else(|| Codegen::Undefined(self.program.name(symbol).to_string()))?;
                self.emit(Instruction::Label(label));
                self.walk(operand(right)?)?;
            },

            Return => {
                self.walk(operand(left)?)?;
                self.emit(Instruction::PopR(Register::Rax));
                self.emit(Instruction::Ret);
            },

            Call => {
                let symbol = self.unit_name(keyword, left)?;
                let label = self
                    .units
                    .get(&symbol)
                    .cloned()
                    .ok_or_else(|| Codegen::Undefined(self.program.name(symbol).to_string()))?;
                self.emit(Instruction::Call(label));
                self.emit(Instruction::PushR(Register::Rax));
            },

            Log | Ln | Sin | Cos | Tg | Ctg | Arcsin | Arccos | Arctg | Arcctg | Sh | Ch
            | Th | Cth => return Err(Codegen::Unsupported(keyword)),

            Comma | OpenParen | CloseParen | OpenCurly | CloseCurly => {
                return Err(Codegen::Misplaced(keyword))
            },
        }

        Ok(())
    }

    /// Unrolls `base ^ n` into repeated multiplication.
    /// Nested powers multiply, as each copy of the base
    /// unrolls its own powers again.
    fn power(&mut self, base: NodeId, exponent: NodeId) -> Result<(), Codegen> {
        let n = self.program.tree[exponent]
            .number()
            .filter(|n| n.fract() == 0.0 && (0.0..=MAX_UNROLLED_POWER as f64).contains(n))
            .ok_or(Codegen::Power)? as usize;

        if !self.pure(base) {
            return Err(Codegen::Power);
        }

        if n == 0 {
            self.emit(Instruction::Push(1.0));
            return Ok(());
        }

        let copies = self.copies * n;
        if copies > MAX_UNROLLED_POWER {
            return Err(Codegen::Power);
        }
        let outer = std::mem::replace(&mut self.copies, copies);

        self.walk(base)?;
        for _ in 1..n {
            self.walk(base)?;
            self.emit(Instruction::Mul);
        }

        self.copies = outer;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::{
        common::source::Source,
        compiler::{lex::Lexer, parse::Parser, simplify::Simplifier},
        construct::prefix,
    };

    fn gen(source: &str) -> Result<String, Codegen> {
        let source = Source::source(source);
        let lexed = Lexer::lex(Rc::clone(&source)).unwrap();
        let program = Parser::parse(source, lexed).unwrap();
        Generator::gen(&program)
    }

    fn gen_tree(tree: &str) -> Result<String, Codegen> {
        let program = prefix::load(Source::source(tree)).unwrap();
        Generator::gen(&program)
    }

    #[test]
    fn straight_line() {
        let target = "\
CALL :main
HLT
:main
PUSH 5
PUSH 1
POPR RAX
POPM [RAX]
PUSH 1
POPR RAX
PUSHM [RAX]
OUT
PUSH 1
POPR RAX
PUSHM [RAX]
POPR RAX
RET
";
        assert_eq!(gen("main m() { a := 5; print(a); return a; }").unwrap(), target);
    }

    #[test]
    fn arithmetic_order() {
        let code = gen("main m() { return 7 - input() / 2; }").unwrap();
        assert!(code.ends_with(":main\nPUSH 7\nIN\nPUSH 2\nDIV\nSUB\nPOPR RAX\nRET\n"));
    }

    #[test]
    fn conditional() {
        let code = gen("main m() { a := input(); if (a) print(a); return 0; }").unwrap();
        let lines = code.lines().collect::<Vec<_>>();
        let je = lines.iter().position(|l| *l == "JE :endif_0").unwrap();
        assert_eq!(lines[je - 1], "PUSH 0");
        assert_eq!(lines[je - 2], "PUSHM [RAX]");
        assert_eq!(lines[je + 4], "OUT");
        assert_eq!(lines[je + 5], ":endif_0");
    }

    #[test]
    fn unique_endifs() {
        let code = gen(
            "func f() { if (1) { if (2) print(2); } return 1; } \
             main m() { if (3) print(3); return call f(); }",
        )
        .unwrap();

        for n in 0..3 {
            let label = format!(":endif_{}", n);
            assert_eq!(code.lines().filter(|l| *l == label).count(), 1);
            assert_eq!(code.matches(&format!("JE {}\n", label)).count(), 1);
        }
        assert!(!code.contains("endif_3"));
    }

    #[test]
    fn endifs_avoid_function_names() {
        let code = gen(
            "func endif_0() { return 1; } main m() { if (1) print(1); return call endif_0(); }",
        )
        .unwrap();
        assert!(code.contains("JE :endif_1\n"));
        assert_eq!(code.matches(":endif_0\n").count(), 2);
    }

    #[test]
    fn calls() {
        let code = gen("main m() { return call f() + 1; } func f() { return 2; }").unwrap();
        assert!(code.contains("CALL :f\nPUSHR RAX\nPUSH 1\nADD\n"));
        assert!(code.contains(":f\nPUSH 2\nPOPR RAX\nRET\n"));
    }

    #[test]
    fn calling_main_by_name() {
        let code = gen("main m() { if (0) print(call m()); return 1; }").unwrap();
        assert_eq!(code.matches("CALL :main\n").count(), 2);
    }

    #[test]
    fn powers() {
        let code = gen("main m() { x := 3; return x ^ 3; }").unwrap();
        let load = "PUSH 1\nPOPR RAX\nPUSHM [RAX]\n";
        assert!(code.contains(&format!("{}{}MUL\n{}MUL\nPOPR RAX", load, load, load)));

        let code = gen("main m() { x := 3; return x ^ 0; }").unwrap();
        assert!(code.contains(":main\nPUSH 3\nPUSH 1\nPOPR RAX\nPOPM [RAX]\nPUSH 1\nPOPR RAX\nRET\n"));

        assert_eq!(gen("main m() { x := 3; return x ^ x; }"), Err(Codegen::Power));
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (return (^ 2 0.5) nil)))"),
            Err(Codegen::Power)
        );
        assert_eq!(gen("main m() { return input() ^ 2; }"), Err(Codegen::Power));
        assert_eq!(gen("main m() { return 2 ^ 65; }"), Err(Codegen::Power));
    }

    #[test]
    fn nested_powers() {
        let code = gen("main m() { x := 2; return (x ^ 8) ^ 8; }").unwrap();
        assert_eq!(code.matches("PUSHM [RAX]\n").count(), 64);
        assert_eq!(code.matches("MUL\n").count(), 63);

        assert_eq!(gen("main m() { x := 2; return (x ^ 8) ^ 9; }"), Err(Codegen::Power));
        assert_eq!(
            gen("main m() { x := 2; return ((x ^ 64) ^ 64) ^ 64; }"),
            Err(Codegen::Power)
        );

        // side by side powers don't share a budget
        let code = gen("main m() { x := 2; return x ^ 64 + x ^ 64; }").unwrap();
        assert_eq!(code.matches("PUSHM [RAX]\n").count(), 128);
    }

    #[test]
    fn long_programs() {
        let mut source = String::from("main m() { a := 0;");
        for _ in 0..10_000 {
            source.push_str(" a = a + 1;");
        }
        source.push_str(" return a; }");

        let code = gen(&source).unwrap();
        // header, label, the declaration, each assignment, then the return
        assert_eq!(code.lines().count(), 2 + 1 + 4 + 10_000 * 8 + 5);
    }

    #[test]
    fn unsupported_builtins() {
        assert_eq!(
            gen("main m() { x := 1; return sin(x); }"),
            Err(Codegen::Unsupported(Keyword::Sin))
        );

        // once folded there's nothing left to lower
        let source = Source::source("main m() { return sin(0) + log(2, 2); }");
        let lexed = Lexer::lex(Rc::clone(&source)).unwrap();
        let mut program = Parser::parse(source, lexed).unwrap();
        Simplifier::simplify(&mut program).unwrap();
        assert!(Generator::gen(&program).unwrap().contains("PUSH 1\nPOPR RAX\nRET\n"));
    }

    #[test]
    fn labels() {
        assert_eq!(
            gen("main a() { return 1; } main b() { return 2; }"),
            Err(Codegen::Duplicate("main".to_string()))
        );
        assert_eq!(
            gen("func f() { return 1; }"),
            Err(Codegen::Undefined("main".to_string()))
        );
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (return (call \"g\" nil) nil)))"),
            Err(Codegen::Undefined("g".to_string()))
        );
        assert_eq!(
            gen_tree(
                "(; (; nil (func (, \"f\" nil) (return 1 nil))) \
                   (func (, \"f\" nil) (return 2 nil)))"
            ),
            Err(Codegen::Duplicate("f".to_string()))
        );
    }

    #[test]
    fn malformed_trees() {
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (; (:= 1 2) (return 0 nil))))"),
            Err(Codegen::Target(Keyword::Declare))
        );
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (return (+ 1 nil) nil)))"),
            Err(Codegen::Missing(Keyword::Add))
        );
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (return (( nil nil) nil)))"),
            Err(Codegen::Misplaced(Keyword::OpenParen))
        );
        assert_eq!(
            gen_tree("(; nil (main 5 (return 0 nil)))"),
            Err(Codegen::NotAFunction(Keyword::Main))
        );
        assert_eq!(gen_tree("(return 0 nil)"), Err(Codegen::Undefined("main".to_string())));
        assert_eq!(
            gen_tree("(; nil (main (, \"m\" nil) (return (5 (1 nil nil) nil) nil)))"),
            Err(Codegen::Leaf)
        );
        assert_eq!(
            gen_tree("(; nil (main (, (\"m\" 1 2) nil) (return 0 nil)))"),
            Err(Codegen::Leaf)
        );
    }

    #[test]
    fn empty_program() {
        let program = Program::empty(
            Source::source(""),
            crate::construct::symbol::SymbolTable::new(),
        );
        assert_eq!(Generator::gen(&program), Err(Codegen::Empty));
    }
}

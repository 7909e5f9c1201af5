//! A tiny interpreter for the assembly the generator emits,
//! so snippets can check what a program actually does.

use std::collections::{HashMap, VecDeque};

/// Runs for at most this many instructions.
const MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Push(f64),
    PopR,
    PushR,
    PushM,
    PopM,
    Add,
    Sub,
    Mul,
    Div,
    In,
    Out,
    Je(String),
    Call(String),
    Ret,
    Hlt,
    Label,
}

/// What's left once a program halts.
#[derive(Debug, Clone, PartialEq)]
pub struct Halted {
    pub output: Vec<f64>,
    pub rax:    f64,
}

pub struct Machine {
    code:   Vec<Line>,
    labels: HashMap<String, usize>,
    stack:  Vec<f64>,
    memory: HashMap<usize, f64>,
    rax:    f64,
    calls:  Vec<usize>,
    input:  VecDeque<f64>,
    output: Vec<f64>,
}

fn register(operand: Option<&str>, wanted: &str) -> Result<(), String> {
    match operand {
        Some(r) if r == wanted => Ok(()),
        other => Err(format!("expected `{}`, found {:?}", wanted, other)),
    }
}

fn label(operand: Option<&str>) -> Result<String, String> {
    match operand.and_then(|l| l.strip_prefix(':')) {
        Some(l) => Ok(l.to_string()),
        None => Err(format!("expected a label, found {:?}", operand)),
    }
}

impl Machine {
    pub fn load(assembly: &str, input: &[f64]) -> Result<Machine, String> {
        let mut code = vec![];
        let mut labels = HashMap::new();

        for (number, text) in assembly.lines().enumerate() {
            let mut words = text.split_whitespace();
            let op = match words.next() {
                Some(op) => op,
                None => return Err(format!("line {} is empty", number + 1)),
            };
            let operand = words.next();

            let line = match op {
                "PUSH" => Line::Push(
                    operand
                        .and_then(|n| n.parse().ok())
                        .ok_or(format!("line {}: bad literal", number + 1))?,
                ),
                "POPR" => register(operand, "RAX").map(|_| Line::PopR)?,
                "PUSHR" => register(operand, "RAX").map(|_| Line::PushR)?,
                "PUSHM" => register(operand, "[RAX]").map(|_| Line::PushM)?,
                "POPM" => register(operand, "[RAX]").map(|_| Line::PopM)?,
                "ADD" => Line::Add,
                "SUB" => Line::Sub,
                "MUL" => Line::Mul,
                "DIV" => Line::Div,
                "IN" => Line::In,
                "OUT" => Line::Out,
                "JE" => Line::Je(label(operand)?),
                "CALL" => Line::Call(label(operand)?),
                "RET" => Line::Ret,
                "HLT" => Line::Hlt,
                l if l.starts_with(':') => {
                    if labels.insert(l[1..].to_string(), code.len()).is_some() {
                        return Err(format!("label `{}` is defined twice", l));
                    }
                    Line::Label
                },
                other => return Err(format!("line {}: unknown instruction `{}`", number + 1, other)),
            };
            code.push(line);
        }

        // every jump must land somewhere
        for line in code.iter() {
            if let Line::Je(l) | Line::Call(l) = line {
                if !labels.contains_key(l) {
                    return Err(format!("label `{}` is never defined", l));
                }
            }
        }

        Ok(Machine {
            code,
            labels,
            stack: vec![],
            memory: HashMap::new(),
            rax: 0.0,
            calls: vec![],
            input: input.iter().copied().collect(),
            output: vec![],
        })
    }

    fn pop(&mut self) -> Result<f64, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn address(&self) -> Result<usize, String> {
        if self.rax >= 0.0 && self.rax.fract() == 0.0 {
            Ok(self.rax as usize)
        } else {
            Err(format!("`{}` is not an address", self.rax))
        }
    }

    pub fn run(mut self) -> Result<Halted, String> {
        let mut pc = 0;

        for _ in 0..MAX_STEPS {
            let line = self
                .code
                .get(pc)
                .cloned()
                .ok_or("ran off the end of the program")?;
            pc += 1;

            match line {
                Line::Push(n) => self.stack.push(n),
                Line::PopR => self.rax = self.pop()?,
                Line::PushR => self.stack.push(self.rax),
                Line::PushM => {
                    let value = self.memory.get(&self.address()?).copied().unwrap_or(0.0);
                    self.stack.push(value);
                },
                Line::PopM => {
                    let (value, address) = (self.pop()?, self.address()?);
                    self.memory.insert(address, value);
                },
                Line::Add | Line::Sub | Line::Mul | Line::Div => {
                    let (b, a) = (self.pop()?, self.pop()?);
                    self.stack.push(match line {
                        Line::Add => a + b,
                        Line::Sub => a - b,
                        Line::Mul => a * b,
                        _ => a / b,
                    });
                },
                Line::In => {
                    let value = self.input.pop_front().ok_or("ran out of input")?;
                    self.stack.push(value);
                },
                Line::Out => {
                    let value = self.pop()?;
                    self.output.push(value);
                },
                Line::Je(l) => {
                    let (b, a) = (self.pop()?, self.pop()?);
                    if a == b {
                        pc = self.labels[&l];
                    }
                },
                Line::Call(l) => {
                    self.calls.push(pc);
                    pc = self.labels[&l];
                },
                Line::Ret => pc = self.calls.pop().ok_or("returned without a call")?,
                Line::Hlt => {
                    return Ok(Halted {
                        output: self.output,
                        rax:    self.rax,
                    })
                },
                Line::Label => (),
            }
        }

        Err(format!("did not halt within {} steps", MAX_STEPS))
    }
}

/// Loads and runs some assembly.
pub fn run(assembly: &str, input: &[f64]) -> Result<Halted, String> {
    Machine::load(assembly, input)?.run()
}

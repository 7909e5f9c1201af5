use colored::*;

/// A colored, right-aligned tag printed before a message on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Compiling,
    Finished,
    Warn,
    Fatal,
}

impl Status {
    fn tag(self) -> ColoredString {
        match self {
            Status::Compiling => "Compiling".blue(),
            Status::Finished => "Finished".green(),
            Status::Warn => "Warning".yellow(),
            Status::Fatal => "Fatal".red(),
        }
        .bold()
    }

    pub fn log(self, message: &str) {
        let lines = message.lines().collect::<Vec<&str>>();

        // compiler errors span several lines, so they get a header of their own
        if lines.len() > 1 {
            eprintln!("\n{}", self.tag());
            for line in lines {
                eprintln!("{}", line);
            }
            eprintln!();
        } else {
            eprintln!("{:>12} {}", self.tag(), message);
        }
    }
}

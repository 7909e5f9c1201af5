use std::{env::current_dir, ffi::OsStr, path::PathBuf};

use log::Level;
use structopt::StructOpt;

pub fn package_dir(path: &OsStr) -> PathBuf {
    if path == "." {
        current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

/// How much to log, given how many times `-v` was passed.
pub fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    }
}

#[derive(StructOpt, Debug)]
pub struct Package {
    #[structopt(default_value = ".", parse(from_os_str = package_dir))]
    pub path: PathBuf,
}

#[derive(StructOpt, Debug)]
#[structopt(name = "Rhyme", bin_name = "rhyme", about)]
pub struct Args {
    /// Logs more about each compiler stage, repeat for more detail
    #[structopt(short, long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    #[structopt(subcommand)]
    pub command: Rhyme,
}

#[derive(StructOpt, Debug)]
pub enum Rhyme {
    /// Creates a new Rhyme package
    New(Package),
    /// Compiles the specified package to assembly
    Build(Package),
    /// Parses a source file and saves its tree in prefix notation
    Front {
        #[structopt(parse(from_os_str))]
        input:  PathBuf,
        #[structopt(parse(from_os_str))]
        output: PathBuf,
    },
    /// Compiles a saved tree to assembly
    Back {
        #[structopt(parse(from_os_str))]
        input:       PathBuf,
        #[structopt(parse(from_os_str))]
        output:      PathBuf,
        /// Skips constant folding and identity elimination
        #[structopt(long)]
        no_simplify: bool,
    },
}

use structopt::StructOpt;

// argument parser and configuation
pub mod cli;
pub mod manifest;
pub mod status;

// command implementations
pub mod build;
pub mod new;
pub mod stage;

use crate::{
    cli::{Args, Rhyme},
    status::Status,
};

pub const MANIFEST: &str = "rhyme.toml";
pub const SOURCE: &str = "src";
pub const ENTRYPOINT: &str = "main.rhy";
pub const OUTPUT: &str = "out/main.asm";

fn main() {
    let args = Args::from_args();

    if let Err(e) = simple_logger::init_with_level(cli::level(args.verbose)) {
        Status::Warn.log(&format!("Could not set up logging: {}", e));
    }

    let result = match args.command {
        Rhyme::New(package) => new::new(package.path),
        Rhyme::Build(package) => build::build(package.path),
        Rhyme::Front { input, output } => stage::front(&input, &output),
        Rhyme::Back {
            input,
            output,
            no_simplify,
        } => stage::back(&input, &output, !no_simplify),
    };

    if let Err(r) = result {
        Status::Fatal.log(&r);
        std::process::exit(1);
    }
}

//! The front and back halves of the compiler, run separately.
//! The front end saves a tree in prefix notation,
//! which the back end picks up to generate assembly.

use std::{fs, path::Path, rc::Rc};

use log::info;
use rhyme::{
    compiler::{self, Error, Generator, Simplifier},
    construct::{prefix, program::Program},
    Source,
};

use crate::status::Status;

pub fn read(path: &Path) -> Result<Rc<Source>, String> {
    Source::path(path).map_err(|e| format!("Could not read '{}': {}", path.display(), e))
}

/// Writes a file, creating the directories leading up to it.
pub fn write(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Could not create '{}': {}", parent.display(), e))?;
    }
    fs::write(path, contents).map_err(|e| format!("Could not write '{}': {}", path.display(), e))?;
    info!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Simplifies a program if asked to, then generates its assembly.
pub fn lower(program: &mut Program, simplify: bool) -> Result<String, Error> {
    if simplify {
        let iterations = Simplifier::simplify(program)?;
        info!("simplified in {} iterations", iterations);
    }
    Ok(Generator::gen(program)?)
}

pub fn front(input: &Path, output: &Path) -> Result<(), String> {
    Status::Compiling.log(&input.display().to_string());

    let program = compiler::parse(read(input)?).map_err(|e| e.to_string())?;
    let saved = prefix::save(&program).map_err(|e| Error::from(e).to_string())?;
    write(output, &saved)?;

    Status::Finished.log(&format!("Saved the tree to '{}'", output.display()));
    Ok(())
}

pub fn back(input: &Path, output: &Path, simplify: bool) -> Result<(), String> {
    Status::Compiling.log(&input.display().to_string());

    let mut program = prefix::load(read(input)?).map_err(|e| e.to_string())?;
    program.verify().map_err(|e| Error::from(e).to_string())?;
    let assembly = lower(&mut program, simplify).map_err(|e| e.to_string())?;
    write(output, &assembly)?;

    Status::Finished.log(&format!("Wrote assembly to '{}'", output.display()));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn front_then_back() {
        let dir = std::env::temp_dir().join(format!("rhyme-stage-{}", std::process::id()));
        let source = dir.join("add.rhy");
        let tree = dir.join("build").join("add.ast");
        let assembly = dir.join("build").join("add.asm");

        write(&source, "main m() { x := input(); return x * (1 + 1); }").unwrap();
        front(&source, &tree).unwrap();
        assert!(fs::read_to_string(&tree).unwrap().starts_with("(;\n    nil\n    (main\n"));

        back(&tree, &assembly, true).unwrap();
        let simplified = fs::read_to_string(&assembly).unwrap();
        assert!(simplified.contains("PUSHM [RAX]\nPUSH 2\nMUL\n"));

        back(&tree, &assembly, false).unwrap();
        let unsimplified = fs::read_to_string(&assembly).unwrap();
        assert!(unsimplified.contains("PUSH 1\nPUSH 1\nADD\nMUL\n"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failures_leave_nothing_behind() {
        let dir = std::env::temp_dir().join(format!("rhyme-stage-fail-{}", std::process::id()));
        let source = dir.join("bad.rhy");
        let assembly = dir.join("bad.asm");

        write(&source, "(; nil (main (, \"m\" nil) (return (sin nil \"x\") nil)))").unwrap();
        let error = back(&source, &assembly, true).unwrap_err();
        assert!(error.starts_with("Codegen Error"));
        assert!(!assembly.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}

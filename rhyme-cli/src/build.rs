use std::path::PathBuf;

use log::info;
use rhyme::{
    compiler::{self, Error},
    construct::prefix,
};

use crate::{
    manifest::Manifest,
    stage::{lower, read, write},
    status::Status,
};

pub fn build(path: PathBuf) -> Result<(), String> {
    let (manifest, root) = Manifest::package(&path)?;
    let config = &manifest.build;

    Status::Compiling.log(&format!(
        "{} v{} ({})",
        manifest.package.name,
        manifest.package.version,
        root.display()
    ));

    let source = read(&root.join(&config.entrypoint)).map_err(|_| {
        format!("Could not find source entrypoint '{}'", config.entrypoint)
    })?;

    let mut program = compiler::parse(source).map_err(|e| e.to_string())?;
    if config.verify {
        program.verify().map_err(|e| Error::from(e).to_string())?;
        info!("verified {} nodes", program.tree.live());
    }

    let assembly = lower(&mut program, config.simplify).map_err(|e| e.to_string())?;

    // written only once everything has compiled
    let output = root.join(&config.output);
    if config.ast {
        let saved = prefix::save(&program).map_err(|e| Error::from(e).to_string())?;
        write(&output.with_extension("ast"), &saved)?;
    }
    write(&output, &assembly)?;

    Status::Finished.log(&format!(
        "Wrote {} lines of assembly to '{}'",
        assembly.lines().count(),
        config.output
    ));
    Ok(())
}

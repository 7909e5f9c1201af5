use std::{fs, path::PathBuf};

use log::info;

use crate::{manifest::Manifest, status::Status, ENTRYPOINT, MANIFEST, SOURCE};

/// The program a new package starts out with.
pub const HELLO: &str = "\
main entry() {
    greeting := 42;
    print(greeting);
    return 0;
}
";

pub fn new(package: PathBuf) -> Result<(), String> {
    // get the name of the package
    let name = package
        .file_name()
        .ok_or("Can not determine directory name")?
        .to_str()
        .ok_or("Directory name is not representable")?
        .to_owned();

    fs::create_dir_all(&package).map_err(|_| "Unable to create package directory")?;

    if package.join(MANIFEST).is_file() {
        Status::Warn.log(&format!(
            "The manifest file ({}) has already been created",
            MANIFEST
        ))
    } else {
        let manifest = Manifest::new(name.clone());
        fs::write(
            package.join(MANIFEST),
            toml::to_string_pretty(&manifest).map_err(|_| "Could not generate manifest file")?,
        )
        .map_err(|_| "Could not write manifest file")?;
        info!("wrote {}", package.join(MANIFEST).display());
    }

    let entrypoint = package.join(SOURCE).join(ENTRYPOINT);
    if entrypoint.is_file() {
        Status::Warn.log(&format!(
            "The source entrypoint ({}/{}) has already been created",
            SOURCE, ENTRYPOINT
        ));
    } else {
        fs::create_dir_all(package.join(SOURCE))
            .map_err(|_| "Could not create source directory")?;
        fs::write(&entrypoint, HELLO).map_err(|_| "Could not create source entrypoint")?;
        info!("wrote {}", entrypoint.display());
    }

    Status::Finished.log(&format!("The package '{}' was created successfully", name));
    Ok(())
}

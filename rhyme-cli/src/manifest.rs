use std::{
    fs,
    path::{Path, PathBuf},
};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{ENTRYPOINT, MANIFEST, OUTPUT, SOURCE};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Manifest {
    pub package: Package,
    #[serde(default)]
    pub build:   Build,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Package {
    // required keys
    pub name:    String, // package name
    pub version: String, // package version, using semver
    #[serde(default)]
    pub authors: Vec<String>,

    // optional keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license:    Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// How a package is compiled.
/// Paths are relative to the directory holding the manifest.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Build {
    pub entrypoint: String,
    pub output:     String,
    /// Fold constants and remove identities before generating code.
    pub simplify:   bool,
    /// Check the tree for consistency right after parsing.
    pub verify:     bool,
    /// Also save the tree in prefix notation next to the output.
    pub ast:        bool,
}

impl Default for Build {
    fn default() -> Build {
        Build {
            entrypoint: format!("{}/{}", SOURCE, ENTRYPOINT),
            output:     OUTPUT.to_string(),
            simplify:   true,
            verify:     true,
            ast:        false,
        }
    }
}

impl Manifest {
    pub fn new(name: String) -> Manifest {
        Manifest {
            package: Package {
                name,
                version: format!("{}", Version::new(0, 1, 0)),
                authors: vec![],
                license: None,
                repository: None,
            },
            build:   Build::default(),
        }
    }

    /// Searches `path` and its parents for a manifest,
    /// returning it along with the directory it was found in.
    pub fn package(mut path: &Path) -> Result<(Manifest, PathBuf), String> {
        loop {
            let candidate = path.join(MANIFEST);
            if candidate.is_file() {
                let source = fs::read_to_string(&candidate)
                    .map_err(|_| "The manifest file could not be read")?;
                return Ok((Manifest::parse(&source)?, path.to_path_buf()));
            }

            path = path.parent().ok_or(format!(
                "The manifest file ({}) could not be found",
                MANIFEST
            ))?;
        }
    }

    pub fn parse(source: &str) -> Result<Manifest, String> {
        let manifest: Manifest = toml::from_str(source)
            .map_err(|e| format!("Could not parse the manifest file: {}", e))?;

        Version::parse(&manifest.package.version).map_err(|e| {
            format!(
                "The package version `{}` is not a valid semantic version: {}",
                manifest.package.version, e
            )
        })?;

        Ok(manifest)
    }
}

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};

/// `Source` represents some literal source code.
/// Whether a program on disk, a saved tree, or a test
/// snippet. It's essentially a string with a path, the path
/// serving as the source's name. Source files without a
/// path point to `./source`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Creates a new `Source` given both an `&str` and a
    /// `PathBuf`. Note that this function does not
    /// check that the contents of the file
    /// match the source.
    /// `Source::path` or `Source::source` should be used
    /// instead.
    pub fn new(source: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: source.to_string(),
            path: path.to_owned(),
        })
    }

    /// Build a `Source` from a path.
    /// This will read a file to create a new source.
    pub fn path(path: &Path) -> std::io::Result<Rc<Source>> {
        let mut source = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut source)?;

        Ok(Source::new(&source, path))
    }

    /// Build an empty `Source` containing just a string.
    /// Note that this source will point towards `./source`.
    pub fn source(source: &str) -> Rc<Source> {
        Source::new(source, &PathBuf::from("./source"))
    }

    /// Converts a byte offset into a zero-based line
    /// and a zero-based column counted in characters.
    /// Offsets past the end are clamped to the end of the source.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let before = &self.contents[..offset.min(self.contents.len())];
        let line = before.matches('\n').count();
        let col = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count(),
            None => before.chars().count(),
        };
        (line, col)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn positions() {
        let source = Source::source("ab\ncd\n\nx");
        assert_eq!(source.position(0), (0, 0));
        assert_eq!(source.position(1), (0, 1));
        assert_eq!(source.position(3), (1, 0));
        assert_eq!(source.position(4), (1, 1));
        assert_eq!(source.position(6), (2, 0));
        assert_eq!(source.position(7), (3, 0));
        assert_eq!(source.position(8), (3, 1));
        assert_eq!(source.position(100), (3, 1));
    }
}

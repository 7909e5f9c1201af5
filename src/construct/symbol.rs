use std::collections::HashMap;

/// Interns identifiers.
/// Each distinct spelling gets one dense index,
/// handed out in order of first occurrence.
/// Symbols are never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        Default::default()
    }

    /// Returns the index of `name`, adding it if it's new.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(index) = self.index.get(name) {
            return *index;
        }

        let index = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), index);
        index
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

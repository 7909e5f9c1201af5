use std::rc::Rc;

use crate::{
    common::Source,
    construct::{
        scope::Declarations,
        symbol::SymbolTable,
        tree::{Tree, TreeInvariant},
    },
};

/// Everything a single compilation owns:
/// the source it came from, its interned names,
/// what has been declared, and the tree itself.
/// Dropping a `Program` releases all of it.
#[derive(Debug, Clone)]
pub struct Program {
    pub source:       Rc<Source>,
    pub symbols:      SymbolTable,
    pub declarations: Declarations,
    pub tree:         Tree,
}

impl Program {
    /// A program with nothing in its tree yet.
    pub fn empty(source: Rc<Source>, symbols: SymbolTable) -> Program {
        Program {
            source,
            symbols,
            declarations: Declarations::new(),
            tree: Tree::new(),
        }
    }

    /// Checks that the tree is non-empty and self-consistent.
    pub fn verify(&self) -> Result<(), TreeInvariant> {
        if self.tree.is_empty() {
            return Err(TreeInvariant::Empty);
        }
        self.tree.verify()
    }

    /// Whether two programs hold the same tree,
    /// comparing names by spelling rather than by symbol index.
    pub fn same_tree(&self, other: &Program) -> bool {
        match (self.tree.root, other.tree.root) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                let symbols = (&self.symbols, &other.symbols);
                self.tree.same_shape(a, &other.tree, b, symbols)
            },
            _ => false,
        }
    }

    /// Looks up the spelling of an interned name.
    pub fn name(&self, symbol: usize) -> &str {
        self.symbols.name(symbol).unwrap_or("<unknown>")
    }
}

use std::{collections::HashSet, fmt::Debug, hash::Hash};

/// Represents an ordered set of elements with O(1) membership checking.
/// Note that this is insert-only.
#[derive(Clone, PartialEq)]
pub struct VecSet<T: Eq + Hash + Clone> {
    order:   Vec<T>,
    members: HashSet<T>,
}

impl<T> Debug for VecSet<T>
where
    T: Eq + Hash + Clone + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.order)
    }
}

impl<T: Eq + Hash + Clone> Default for VecSet<T> {
    fn default() -> Self {
        VecSet {
            order:   vec![],
            members: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> VecSet<T> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Push a member onto the Vec.
    /// Returns `false` if the member was already present,
    /// in which case nothing changes.
    pub fn push(&mut self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.members.insert(item.clone());
        self.order.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool { self.members.contains(item) }

    pub fn len(&self) -> usize { self.order.len() }
}

/// The declaration stack.
/// Tracks which symbols may currently be referenced.
/// Variables and functions live in separate sets,
/// but a symbol may only ever be one of the two.
///
/// Scoping is flat: nothing is ever popped,
/// so a variable declared inside an `if` stays visible
/// for the rest of the program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub variables: VecSet<usize>,
    pub functions: VecSet<usize>,
}

impl Declarations {
    pub fn new() -> Declarations {
        Default::default()
    }

    pub fn is_variable(&self, symbol: usize) -> bool {
        self.variables.contains(&symbol)
    }

    pub fn is_function(&self, symbol: usize) -> bool {
        self.functions.contains(&symbol)
    }

    /// Declares a variable, returning `false` if the name is already taken.
    pub fn declare_variable(&mut self, symbol: usize) -> bool {
        !self.is_function(symbol) && self.variables.push(symbol)
    }

    /// Declares a function, returning `false` if the name is already taken.
    pub fn declare_function(&mut self, symbol: usize) -> bool {
        !self.is_variable(symbol) && self.functions.push(symbol)
    }
}

use std::{
    collections::{HashMap, HashSet},
    ops::{Index, IndexMut},
};

use crate::construct::{keyword::Keyword, symbol::SymbolTable};

/// A handle to a node owned by a `Tree`.
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a node holds.
/// Operators derive their arity from the keyword table;
/// unary operators keep their operand under `right`.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Number(f64),
    Op(Keyword),
    /// An interned identifier, i.e. a variable or a function name.
    Name(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind:  Kind,
    pub left:  Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Node {
    pub fn number(&self) -> Option<f64> {
        match self.kind {
            Kind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn op(&self) -> Option<Keyword> {
        match self.kind {
            Kind::Op(k) => Some(k),
            _ => None,
        }
    }
}

/// Things that can go wrong with the shape of a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeInvariant {
    #[error("{live} nodes are alive but {reachable} are reachable from the root")]
    Mismatch { reachable: usize, live: usize },
    #[error("node #{0} is reachable from more than one parent")]
    Shared(usize),
    #[error("node #{0} is referenced after being deleted")]
    Dangling(usize),
    #[error("the tree has no root")]
    Empty,
    #[error("can not load into a tree that already has a root")]
    NotEmpty,
}

/// An arena that owns every node of a program's tree.
/// Every construction and every deletion updates the live count,
/// which `verify` checks against what is actually reachable from `root`.
///
/// There are no parent links. Algorithms that rewrite the tree
/// take a node and return the node that should replace it,
/// leaving it up to the caller to install the result.
///
/// Statement chains lean left and grow with every statement,
/// so nothing here recurses: whole-tree walks keep their own stack.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    free:  Vec<usize>,
    live:  usize,
    pub root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Tree {
        Default::default()
    }

    /// Builds a new node, taking ownership of both children.
    pub fn construct(
        &mut self,
        kind: Kind,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> NodeId {
        let node = Some(Node { kind, left, right });
        self.live += 1;

        match self.free.pop() {
            Some(index) => {
                self.slots[index] = node;
                NodeId(index)
            },
            None => {
                self.slots.push(node);
                NodeId(self.slots.len() - 1)
            },
        }
    }

    pub fn number(&mut self, value: f64) -> NodeId {
        self.construct(Kind::Number(value), None, None)
    }

    pub fn name(&mut self, symbol: usize) -> NodeId {
        self.construct(Kind::Name(symbol), None, None)
    }

    pub fn op(
        &mut self,
        keyword: Keyword,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> NodeId {
        self.construct(Kind::Op(keyword), left, right)
    }

    /// Duplicates a subtree.
    /// This is the only way a subtree may end up in two places.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut copies = HashMap::new();
        let mut copy = id;

        // reversed pre-order reaches children before their parents,
        // and ends on the root of the subtree
        for old in self.preorder(id).into_iter().rev() {
            let Node { kind, left, right } = self[old].clone();
            let left = left.and_then(|l| copies.get(&l).copied());
            let right = right.and_then(|r| copies.get(&r).copied());
            copy = self.construct(kind, left, right);
            copies.insert(old, copy);
        }

        copy
    }

    /// Frees every node of a subtree.
    pub fn delete(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.slots.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.left);
                stack.extend(node.right);
                self.free.push(next.0);
                self.live -= 1;
            }
        }
    }

    /// Every node of a subtree, parents before children
    /// and left children before right ones.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = vec![];
        let mut stack = vec![id];

        while let Some(next) = stack.pop() {
            let node = &self[next];
            stack.extend(node.right);
            stack.extend(node.left);
            order.push(next);
        }
        order
    }

    /// Flattens a left-leaning chain of `;` into its statements, in order.
    /// Empty links are skipped; anything that isn't a `;` is one statement.
    pub fn statements(&self, id: NodeId) -> Vec<NodeId> {
        let mut statements = vec![];
        let mut next = Some(id);

        while let Some(link) = next {
            let node = &self[link];
            if node.op() != Some(Keyword::Connect) {
                statements.push(link);
                break;
            }
            statements.extend(node.right);
            next = node.left;
        }

        statements.reverse();
        statements
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Recounts every node reachable from the root
    /// and compares that against the live count.
    /// Also catches nodes with two parents and handles to freed nodes.
    pub fn verify(&self) -> Result<(), TreeInvariant> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            let node = self.get(id).ok_or(TreeInvariant::Dangling(id.0))?;
            if !seen.insert(id) {
                return Err(TreeInvariant::Shared(id.0));
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }

        if seen.len() != self.live {
            return Err(TreeInvariant::Mismatch {
                reachable: seen.len(),
                live:      self.live,
            });
        }

        Ok(())
    }

    /// Compares two subtrees by tag, payload and shape.
    /// The subtrees may belong to different trees,
    /// so names are compared by spelling, each looked up in its own table.
    /// `NaN` literals compare equal to each other.
    pub fn same_shape(
        &self,
        a: NodeId,
        other: &Tree,
        b: NodeId,
        symbols: (&SymbolTable, &SymbolTable),
    ) -> bool {
        let mut stack = vec![(a, b)];

        while let Some((a, b)) = stack.pop() {
            let (x, y) = (&self[a], &other[b]);

            let same_kind = match (&x.kind, &y.kind) {
                (Kind::Number(n), Kind::Number(m)) => n == m || (n.is_nan() && m.is_nan()),
                (Kind::Name(s), Kind::Name(t)) => {
                    match (symbols.0.name(*s), symbols.1.name(*t)) {
                        (None, None) => s == t,
                        (p, q) => p == q,
                    }
                },
                (k, l) => k == l,
            };
            if !same_kind {
                return false;
            }

            for children in [(x.left, y.left), (x.right, y.right)] {
                match children {
                    (None, None) => (),
                    (Some(p), Some(q)) => stack.push((p, q)),
                    _ => return false,
                }
            }
        }

        true
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    /// Panics if the node was deleted,
    /// as a live handle to a freed node is always a bug.
    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node #{} was used after being deleted", id.0),
        }
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("node #{} was used after being deleted", id.0),
        }
    }
}

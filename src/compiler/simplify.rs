use log::{debug, trace};

use crate::construct::{
    keyword::Keyword,
    program::Program,
    tree::{NodeId, Tree, TreeInvariant},
};

/// Literals closer than this to an identity constant count as equal to it.
pub const TOLERANCE: f64 = 1e-9;

/// What an algebraic identity turns a node into.
enum Rewrite {
    /// Keep a copy of one of the operands.
    Keep(NodeId),
    /// Replace the whole node with a literal.
    Constant(f64),
    /// `0 - x` becomes `-1 * x`.
    Negate(NodeId),
}

/// Shrinks a tree by folding constant subexpressions
/// and eliminating algebraic identities,
/// repeating both passes until neither changes anything.
///
/// Passes take a node and return the node that should take its place,
/// deleting whatever they replace.
pub struct Simplifier<'a> {
    tree:    &'a mut Tree,
    folded:  usize,
    removed: usize,
}

impl<'a> Simplifier<'a> {
    /// Simplifies a program's tree in place,
    /// returning how many times both passes were run.
    /// The tree is verified afterwards.
    pub fn simplify(program: &mut Program) -> Result<usize, TreeInvariant> {
        let mut root = program.tree.root.ok_or(TreeInvariant::Empty)?;
        let size = program.tree.live();

        let mut simplifier = Simplifier {
            tree:    &mut program.tree,
            folded:  0,
            removed: 0,
        };

        let mut iterations = 0;
        loop {
            iterations += 1;
            let before = simplifier.rewrites();
            root = simplifier.calc(root);
            root = simplifier.trivial(root);
            trace!("simplifier iteration {}: {} rewrites so far", iterations, simplifier.rewrites());

            if simplifier.rewrites() == before {
                break;
            }
        }

        let (folded, removed) = (simplifier.folded, simplifier.removed);
        program.tree.root = Some(root);

        debug!(
            "simplified {} nodes down to {} in {} iterations ({} folded, {} identities)",
            size,
            program.tree.live(),
            iterations,
            folded,
            removed,
        );

        program.verify()?;
        Ok(iterations)
    }

    fn rewrites(&self) -> usize {
        self.folded + self.removed
    }

    /// Runs a pass over both children of a node, installing the results.
    /// Neither pass rewrites a `;`, so a chain of them is walked
    /// down its left spine in a loop, then passed over in order.
    fn children(&mut self, id: NodeId, pass: fn(&mut Self, NodeId) -> NodeId) {
        let mut links = vec![id];
        let mut bottom = id;
        while self.tree[bottom].op() == Some(Keyword::Connect) {
            match self.tree[bottom].left {
                Some(left) if self.tree[left].op() == Some(Keyword::Connect) => {
                    links.push(left);
                    bottom = left;
                },
                _ => break,
            }
        }

        if let Some(left) = self.tree[bottom].left {
            let left = pass(self, left);
            self.tree[bottom].left = Some(left);
        }
        for link in links.into_iter().rev() {
            if let Some(right) = self.tree[link].right {
                let right = pass(self, right);
                self.tree[link].right = Some(right);
            }
        }
    }

    /// Constant folding, bottom-up.
    fn calc(&mut self, id: NodeId) -> NodeId {
        self.children(id, Simplifier::calc);

        let node = &self.tree[id];
        let keyword = match node.op() {
            Some(k) if k.is_math() => k,
            _ => return id,
        };

        let right = match node.right.and_then(|r| self.tree[r].number()) {
            Some(n) => n,
            None => return id,
        };
        let left = match node.left {
            None => None,
            Some(l) => match self.tree[l].number() {
                Some(n) => Some(n),
                None => return id,
            },
        };

        match evaluate(keyword, left, right) {
            Some(value) => {
                self.tree.delete(id);
                self.folded += 1;
                self.tree.number(value)
            },
            None => id,
        }
    }

    /// Algebraic identity elimination, bottom-up.
    fn trivial(&mut self, id: NodeId) -> NodeId {
        self.children(id, Simplifier::trivial);

        let node = &self.tree[id];
        let (keyword, left, right) = match (node.op(), node.left, node.right) {
            (Some(k), Some(l), Some(r)) => (k, l, r),
            _ => return id,
        };

        let l = self.tree[left].number();
        let r = self.tree[right].number();
        let is = |n: Option<f64>, c: f64| n.map_or(false, |n| (n - c).abs() < TOLERANCE);

        use Keyword::*;
        let rewrite = match keyword {
            Add if is(r, 0.0) => Rewrite::Keep(left),
            Add if is(l, 0.0) => Rewrite::Keep(right),
            Sub if is(r, 0.0) => Rewrite::Keep(left),
            Sub if is(l, 0.0) => Rewrite::Negate(right),
            Mul if is(r, 1.0) => Rewrite::Keep(left),
            Mul if is(l, 1.0) => Rewrite::Keep(right),
            Mul if is(r, 0.0) || is(l, 0.0) => Rewrite::Constant(0.0),
            Div if is(r, 1.0) => Rewrite::Keep(left),
            Div if is(l, 0.0) => Rewrite::Constant(0.0),
            Pow if is(r, 1.0) => Rewrite::Keep(left),
            Pow if is(r, 0.0) || is(l, 1.0) => Rewrite::Constant(1.0),
            _ => return id,
        };

        // the survivor lives inside the node being deleted,
        // so it's copied out first.
        let replacement = match rewrite {
            Rewrite::Keep(survivor) => self.tree.deep_copy(survivor),
            Rewrite::Constant(value) => self.tree.number(value),
            Rewrite::Negate(operand) => {
                let minus = self.tree.number(-1.0);
                let operand = self.tree.deep_copy(operand);
                self.tree.op(Mul, Some(minus), Some(operand))
            },
        };

        self.tree.delete(id);
        self.removed += 1;
        replacement
    }
}

/// Evaluates an operator on literals.
/// Domain errors are not special-cased and come out as `NaN` or infinities.
/// Returns `None` when the operands don't fit the operator,
/// e.g. a binary operator missing its left operand.
pub fn evaluate(keyword: Keyword, left: Option<f64>, right: f64) -> Option<f64> {
    use Keyword::*;
    let x = right;

    let value = match (keyword, left) {
        (Add, Some(l)) => l + x,
        (Sub, Some(l)) => l - x,
        (Mul, Some(l)) => l * x,
        (Div, Some(l)) => l / x,
        (Pow, Some(l)) => l.powf(x),
        (Log, Some(base)) => x.ln() / base.ln(),

        (Ln, None) => x.ln(),
        (Sin, None) => x.sin(),
        (Cos, None) => x.cos(),
        (Tg, None) => x.tan(),
        (Ctg, None) => 1.0 / x.tan(),
        (Arcsin, None) => x.asin(),
        (Arccos, None) => x.acos(),
        (Arctg, None) => x.atan(),
        (Arcctg, None) => 1.0 / x.atan(),
        (Sh, None) => x.sinh(),
        (Ch, None) => x.cosh(),
        (Th, None) => x.tanh(),
        (Cth, None) => 1.0 / x.tanh(),

        _ => return None,
    };

    Some(value)
}

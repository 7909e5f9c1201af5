//! Datastructures built and consumed by the compiler:
//! tokens, the keyword table, interned names, declarations,
//! and the tree along with its saved text form.

pub mod keyword;
pub mod prefix;
pub mod program;
pub mod scope;
pub mod symbol;
pub mod token;
pub mod tree;

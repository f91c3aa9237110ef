//! The algebra tree (spec.md §4.4) and alias generator (spec.md §4.3) that
//! sit between SPARQL parsing and the pattern translator.

mod alias;
mod build;
mod node;

pub use alias::{Alias, AliasGenerator, AliasRole};
pub use build::{build_algebra, peel_modifiers, Modifier};
pub use node::{AlgebraNode, AlgebraTriple};

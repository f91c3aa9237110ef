//! Logical entities shared across the relquad workspace: RDF terms, scoped
//! variables, the algebra's pattern-node and property-path vocabulary, and
//! projection plans.
//!
//! This crate does not implement SPARQL parsing; [`spargebra`] already
//! builds a [`spargebra::algebra::GraphPattern`] tree, and this crate's
//! [`scope`] and [`term`] modules exist to carry the extra bookkeeping the
//! translator needs on top of that tree (variable scope levels, a
//! content-addressable normal form for terms).

mod projection;
mod scope;
mod term;

pub use projection::{ProjectedColumn, ProjectionPlan};
pub use scope::{ScopeId, ScopedVariable};
pub use term::{TermKind, TermValue};

// Re-export the oxigraph term model so that downstream crates share a single
// definition of `Term`, `Variable`, `Quad`, etc.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, Literal, LiteralRef, NamedNode,
    NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Term, TermRef, Triple,
    TripleRef, Variable, VariableRef,
};

// Re-export the parts of spargebra's algebra that the translator consumes
// directly: the canonical graph-pattern tree, property paths, the dataset
// clause (FROM / FROM NAMED), and the ground/variable term-pattern
// vocabulary used by quad patterns and updates.
pub use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, GraphTarget,
    OrderExpression, PropertyPathExpression, QueryDataset,
};
pub use spargebra::term::{
    GraphNamePattern, GroundQuad, GroundQuadPattern, GroundTerm, GroundTermPattern,
    NamedNodePattern, QuadPattern, TermPattern, TriplePattern,
};
pub use spargebra::{GraphUpdateOperation, Query, SparqlSyntaxError, Update};

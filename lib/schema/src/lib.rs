//! The fixed physical schema the translator emits SQL against (spec.md
//! §3): column names for `term` and `rdf_quad`, the minimum index layout,
//! and content-addressed term UUID derivation. Physical *table* names are
//! templated from a space id and a global prefix; since that template
//! needs the prefix from the resolved configuration anyway, it lives on
//! `relquad_common::RelquadConfig` rather than here.

pub mod columns;
pub mod indexes;
mod term_uuid;

pub use indexes::{IndexSpec, RDF_QUAD_INDEXES};
pub use term_uuid::TermId;

//! Ties `relquad-translator`'s SQL text to a [`relquad_common::RelationalStore`]
//! collaborator: form dispatch for the four query forms (spec.md §4.8),
//! the update executor (§4.9), and the result materializer that resolves
//! `term_uuid` columns back into RDF terms (§4.10).

mod dispatch;
mod materializer;
mod solution;
mod update;

#[cfg(test)]
mod test_support;

pub use dispatch::{execute_ask, execute_construct, execute_describe, execute_query, execute_select};
pub use materializer::{materialize_boolean, materialize_solutions};
pub use solution::{QueryResults, QuerySolution};
pub use update::execute_update;

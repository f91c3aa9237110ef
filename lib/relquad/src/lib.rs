//! Public entry point for the SPARQL-over-SQL translator and execution
//! core (spec.md §6): parses SPARQL 1.1 query/update text, translates it
//! through `relquad-translator`, and runs the result against a
//! caller-supplied [`RelationalStore`](relquad_common::RelationalStore).
//!
//! This crate owns none of the storage itself — unlike the teacher's
//! `Store`, which bundles a `DataFusion`-backed `MemQuadStorage`, a
//! [`Store`] here is a thin facade over whatever relational database the
//! embedding service already talks to. Usage example:
//!
//! ```
//! use relquad::{QueryResults, Store};
//! use relquad_common::RelquadConfig;
//!
//! # async fn run(store: impl relquad_common::RelationalStore + 'static) -> relquad::Result<()> {
//! let config = RelquadConfig::new("rq", "http://example.org/defaultGraph");
//! let facade = Store::new(Box::new(store), config, "acme");
//!
//! facade.update("INSERT DATA { <http://example.org/s> <http://example.org/p> \"o\" }").await?;
//!
//! if let QueryResults::Solutions(mut solutions) = facade.query("SELECT ?s WHERE { ?s ?p ?o }").await? {
//!     assert_eq!(solutions.len(), 1);
//! }
//! # Ok(())
//! # }
//! ```

mod options;
mod store;

pub use options::{QueryExplanation, QueryOptions};
pub use relquad_common::error::{RelquadError as Error, RelquadResult as Result};
pub use relquad_execution::{QueryResults, QuerySolution};
pub use store::Store;

pub mod model {
    pub use relquad_model::*;
}

pub mod common {
    pub use relquad_common::*;
}

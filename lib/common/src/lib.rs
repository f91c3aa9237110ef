//! Ambient concerns shared by every relquad crate: the resolved
//! configuration struct, the error taxonomy (spec.md §7), the cooperative
//! deadline token (spec.md §5), and the `RelationalStore` collaborator
//! trait the translator's output ultimately runs against (spec.md §6).

mod config;
mod deadline;
pub mod error;
mod store;

pub use config::{CacheConfig, DeadlineConfig, RelquadConfig, SpaceTableNames};
pub use deadline::Deadline;
pub use error::{ParseError, RelquadError, RelquadResult, SourceOffset, StoreError};
pub use store::{RelationalStore, Row, RowCursor, SqlValue, StoreTransaction};

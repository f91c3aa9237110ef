//! The process-wide term-UUID cache (spec.md §4.2): batched lookup and
//! insertion of terms, with bidirectional mapping and bounded memory.

mod cache;

pub use cache::TermCache;

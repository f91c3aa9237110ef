/// Column names of the `term` table (spec.md §3). Fixed regardless of
/// space, since the per-space segment lives in the table name, not the
/// columns.
pub mod term {
    pub const TERM_UUID: &str = "term_uuid";
    pub const TERM_TEXT: &str = "term_text";
    pub const TERM_TYPE: &str = "term_type";
    pub const LANG: &str = "lang";
    pub const DATATYPE: &str = "datatype";
    pub const TERM_TEXT_FTS: &str = "term_text_fts";
}

/// Column names of the `rdf_quad` table (spec.md §3).
pub mod rdf_quad {
    pub const SUBJECT_UUID: &str = "subject_uuid";
    pub const PREDICATE_UUID: &str = "predicate_uuid";
    pub const OBJECT_UUID: &str = "object_uuid";
    pub const CONTEXT_UUID: &str = "context_uuid";

    /// The four columns in declaration order, as they appear in the
    /// uniqueness constraint spec.md §3 requires over all of them.
    pub const ALL: [&str; 4] = [SUBJECT_UUID, PREDICATE_UUID, OBJECT_UUID, CONTEXT_UUID];
}

/// The single-character `term_type` discriminant values (mirrors
/// [`relquad_model::TermKind::code`]).
pub mod term_type {
    pub const IRI: char = 'U';
    pub const LITERAL: char = 'L';
    pub const BLANK: char = 'B';
    pub const GRAPH: char = 'G';
}

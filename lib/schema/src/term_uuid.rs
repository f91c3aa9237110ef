use relquad_model::TermValue;
use std::fmt;
use uuid::Uuid;

/// The namespace [`Uuid::new_v5`] hashes every term under. Fixed so that
/// identical terms always derive the same `term_uuid` across processes and
/// across insertion order (spec.md §4.1, the "Content-addressed terms"
/// property in §8).
const TERM_NAMESPACE: Uuid = Uuid::from_bytes([
    0x2f, 0x8a, 0x61, 0x0c, 0x9b, 0x3d, 0x4e, 0x71, 0x8c, 0x52, 0x6a, 0x1d, 0x4f, 0x9e, 0x0b, 0x77,
]);

/// A content-addressed identifier for one [`TermValue`]. Two `TermValue`s
/// that compare equal always derive the same `TermId`; nothing else does,
/// short of a UUIDv5 collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(Uuid);

impl TermId {
    /// The reserved `context_uuid` for the default graph (SPEC_FULL.md
    /// §13(c)). Chosen as the all-zero UUID so it can never collide with a
    /// UUIDv5 derivation, which is never the nil UUID for any real input.
    pub const DEFAULT_GRAPH: TermId = TermId(Uuid::nil());

    #[must_use]
    pub fn from_term(term: &TermValue) -> Self {
        let normalized = format!(
            "{}\u{0}{}\u{0}{}\u{0}{}",
            term.kind().code(),
            term.language().unwrap_or(""),
            term.datatype().unwrap_or(""),
            term.lexical(),
        );
        TermId(Uuid::new_v5(&TERM_NAMESPACE, normalized.as_bytes()))
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        TermId(uuid)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<TermId> for Uuid {
    fn from(id: TermId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_terms_derive_the_same_id() {
        let a = TermValue::iri("http://example.org/a");
        let b = TermValue::iri("http://example.org/a");
        assert_eq!(TermId::from_term(&a), TermId::from_term(&b));
    }

    #[test]
    fn kind_participates_in_identity() {
        let iri = TermValue::iri("x");
        let blank = TermValue::blank("x");
        assert_ne!(TermId::from_term(&iri), TermId::from_term(&blank));
    }

    #[test]
    fn lang_tag_participates_in_identity() {
        let en = TermValue::lang_literal("hi", "en");
        let plain = TermValue::typed_literal("hi", "http://www.w3.org/2001/XMLSchema#string");
        assert_ne!(TermId::from_term(&en), TermId::from_term(&plain));
    }

    #[test]
    fn default_graph_is_never_a_real_derivation() {
        let anything = TermValue::graph("http://example.org/g");
        assert_ne!(TermId::from_term(&anything), TermId::DEFAULT_GRAPH);
    }
}

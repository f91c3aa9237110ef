use oxrdf::{BlankNodeRef, LiteralRef, NamedNodeRef, TermRef};
use std::fmt;

/// The four kinds of term a `term_uuid` can refer to (spec.md §3's
/// `term_type` column: `U`/`L`/`B`/`G`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Iri,
    Literal,
    Blank,
    /// A named-graph identifier. `rdf_quad.context_uuid` reuses the `term`
    /// table, tagged with this kind, so graph names are content-addressed
    /// the same way subjects/predicates/objects are.
    Graph,
}

impl TermKind {
    /// The single-character code stored in `term.term_type`.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            TermKind::Iri => 'U',
            TermKind::Literal => 'L',
            TermKind::Blank => 'B',
            TermKind::Graph => 'G',
        }
    }

    /// Parses the single-character `term.term_type` code back into a kind.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'U' => Some(TermKind::Iri),
            'L' => Some(TermKind::Literal),
            'B' => Some(TermKind::Blank),
            'G' => Some(TermKind::Graph),
            _ => None,
        }
    }
}

/// A normalized, content-addressable view of an RDF term: exactly the
/// `(kind, lang-or-empty, datatype-or-empty, lexical)` tuple that
/// [`relquad_schema`](../relquad_schema/index.html)'s UUIDv5 derivation
/// hashes (spec.md §4.1). Two terms that normalize to the same `TermValue`
/// must resolve to the same `term_uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermValue {
    kind: TermKind,
    lexical: String,
    language: Option<String>,
    datatype: Option<String>,
}

impl TermValue {
    #[must_use]
    pub fn iri(iri: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Iri,
            lexical: iri.into(),
            language: None,
            datatype: None,
        }
    }

    #[must_use]
    pub fn blank(id: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Blank,
            lexical: id.into(),
            language: None,
            datatype: None,
        }
    }

    #[must_use]
    pub fn graph(iri: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Graph,
            lexical: iri.into(),
            language: None,
            datatype: None,
        }
    }

    #[must_use]
    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Literal,
            lexical: lexical.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    #[must_use]
    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Literal,
            lexical: lexical.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TermKind {
        self.kind
    }

    #[must_use]
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    /// Reconstructs a `TermValue` from the raw columns a `term` table row
    /// carries (spec.md §3: `term_text`, `term_type`, `lang`, `datatype`).
    /// Used when resolving a `term_uuid` back to a term, since the UUID
    /// derivation in `relquad-schema` is one-way.
    #[must_use]
    pub fn from_row_parts(
        kind: TermKind,
        lexical: impl Into<String>,
        language: Option<String>,
        datatype: Option<String>,
    ) -> Self {
        Self {
            kind,
            lexical: lexical.into(),
            language,
            datatype,
        }
    }
}

impl From<TermRef<'_>> for TermValue {
    fn from(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(nn) => TermValue::iri(nn.as_str()),
            TermRef::BlankNode(bnode) => TermValue::blank(bnode.as_str()),
            TermRef::Literal(lit) => lit.into(),
        }
    }
}

impl From<LiteralRef<'_>> for TermValue {
    fn from(lit: LiteralRef<'_>) -> Self {
        if let Some(language) = lit.language() {
            TermValue::lang_literal(lit.value(), language)
        } else {
            TermValue::typed_literal(lit.value(), lit.datatype().as_str())
        }
    }
}

impl From<NamedNodeRef<'_>> for TermValue {
    fn from(nn: NamedNodeRef<'_>) -> Self {
        TermValue::iri(nn.as_str())
    }
}

impl From<BlankNodeRef<'_>> for TermValue {
    fn from(bnode: BlankNodeRef<'_>) -> Self {
        TermValue::blank(bnode.as_str())
    }
}

impl TermValue {
    /// Reconstructs the owned [`oxrdf::Term`] this value denotes. `Graph`
    /// values have no `Term` counterpart (they only ever appear in
    /// `rdf_quad.context_uuid`) and are rejected with `None`.
    #[must_use]
    pub fn to_term(&self) -> Option<oxrdf::Term> {
        match self.kind {
            TermKind::Iri => Some(oxrdf::NamedNode::new_unchecked(&self.lexical).into()),
            TermKind::Blank => Some(oxrdf::BlankNode::new_unchecked(&self.lexical).into()),
            TermKind::Literal => {
                let literal = match (&self.language, &self.datatype) {
                    (Some(lang), _) => oxrdf::Literal::new_language_tagged_literal_unchecked(&self.lexical, lang),
                    (None, Some(datatype)) => {
                        oxrdf::Literal::new_typed_literal(&self.lexical, oxrdf::NamedNode::new_unchecked(datatype))
                    }
                    (None, None) => oxrdf::Literal::new_simple_literal(&self.lexical),
                };
                Some(literal.into())
            }
            TermKind::Graph => None,
        }
    }
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TermKind::Iri | TermKind::Graph => write!(f, "<{}>", self.lexical),
            TermKind::Blank => write!(f, "_:{}", self.lexical),
            TermKind::Literal => {
                write!(f, "\"{}\"", self.lexical)?;
                if let Some(language) = &self.language {
                    write!(f, "@{language}")
                } else if let Some(datatype) = &self.datatype {
                    write!(f, "^^<{datatype}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

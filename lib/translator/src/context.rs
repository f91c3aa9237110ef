use relquad_algebra::AliasGenerator;
use relquad_common::{RelquadConfig, SqlValue};
use relquad_schema::TermId;
use std::cell::RefCell;

/// Per-query translation state: the table names this query targets, the
/// accumulated bind parameters (spec.md §4.6: bound positions become
/// `= :uuid` using a pre-resolved UUID), and the resolved configuration
/// (recursion cap, default graph).
///
/// One `TranslationContext` is shared, by reference, across a query's
/// whole translation; each nested scope gets its own [`AliasGenerator`]
/// child but reads and writes the same parameter list, since a single SQL
/// statement is always the translation's output (spec.md §1).
pub struct TranslationContext<'a> {
    pub term_table: &'a str,
    pub rdf_quad_table: &'a str,
    pub config: &'a RelquadConfig,
    params: RefCell<Vec<SqlValue>>,
}

impl<'a> TranslationContext<'a> {
    #[must_use]
    pub fn new(term_table: &'a str, rdf_quad_table: &'a str, config: &'a RelquadConfig) -> Self {
        Self {
            term_table,
            rdf_quad_table,
            config,
            params: RefCell::new(Vec::new()),
        }
    }

    /// Appends a bind parameter and returns its `$n` placeholder text.
    #[must_use]
    pub fn bind(&self, value: SqlValue) -> String {
        let mut params = self.params.borrow_mut();
        params.push(value);
        format!("${}", params.len())
    }

    #[must_use]
    pub fn bind_uuid(&self, id: TermId) -> String {
        self.bind(SqlValue::Uuid(id.as_uuid()))
    }

    #[must_use]
    pub fn into_params(self) -> Vec<SqlValue> {
        self.params.into_inner()
    }

    #[must_use]
    pub fn params_snapshot(&self) -> Vec<SqlValue> {
        self.params.borrow().clone()
    }
}

#[must_use]
pub fn root_alias_generator() -> AliasGenerator {
    AliasGenerator::root()
}

use relquad_model::{Term, Variable};
use std::collections::BTreeMap;

/// One row of a `SELECT`/`ASK` result: a partial binding from variable to
/// term, `None` for a variable that was in scope but left unbound (e.g.
/// the optional side of a `LeftJoin` that matched nothing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySolution {
    bindings: BTreeMap<Variable, Term>,
}

impl QuerySolution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, variable: Variable, term: Term) {
        self.bindings.insert(variable, term);
    }

    #[must_use]
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    #[must_use]
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.keys()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The outcome of `execute_query` (spec.md §4.8): one variant per SPARQL
/// query form.
pub enum QueryResults {
    Solutions(Vec<QuerySolution>),
    Boolean(bool),
    Graph(Vec<relquad_model::Quad>),
}

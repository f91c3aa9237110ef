use crate::ScopedVariable;
use std::fmt;

/// One output column of a translated query: the name it surfaces under in
/// the result set, the scoped variable it carries, and whether the executor
/// must resolve its `term_uuid` back to a lexical term (spec.md §3's
/// Projection plan entity, §4.10's materializer input).
///
/// `ASK` and some `CONSTRUCT`/`DESCRIBE` columns carry a variable purely for
/// join bookkeeping and are never surfaced to the caller, hence
/// `resolve_to_term` rather than always resolving every column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    output_name: String,
    variable: ScopedVariable,
    resolve_to_term: bool,
}

impl ProjectedColumn {
    #[must_use]
    pub fn new(output_name: impl Into<String>, variable: ScopedVariable) -> Self {
        Self {
            output_name: output_name.into(),
            variable,
            resolve_to_term: true,
        }
    }

    /// Marks this column as join-only: its `term_uuid` is carried through
    /// the generated SQL but never resolved or surfaced in the result set.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.resolve_to_term = false;
        self
    }

    #[must_use]
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    #[must_use]
    pub fn variable(&self) -> &ScopedVariable {
        &self.variable
    }

    #[must_use]
    pub fn resolve_to_term(&self) -> bool {
        self.resolve_to_term
    }
}

impl fmt::Display for ProjectedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.variable, self.output_name)
    }
}

/// The ordered list of columns a translated query surfaces, in SPARQL
/// `SELECT` clause order. Order matters: `sparesults`' JSON/TSV writers and
/// the N-Quads/boolean materializers for `CONSTRUCT`/`DESCRIBE`/`ASK` all
/// consume this list positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPlan {
    columns: Vec<ProjectedColumn>,
}

impl ProjectionPlan {
    #[must_use]
    pub fn new(columns: Vec<ProjectedColumn>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[ProjectedColumn] {
        &self.columns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn push(&mut self, column: ProjectedColumn) {
        self.columns.push(column);
    }

    /// Output names in column order, as the `head.vars` member of SPARQL
    /// Results JSON expects them.
    #[must_use]
    pub fn output_names(&self) -> Vec<&str> {
        self.columns.iter().map(ProjectedColumn::output_name).collect()
    }
}

impl IntoIterator for ProjectionPlan {
    type Item = ProjectedColumn;
    type IntoIter = std::vec::IntoIter<ProjectedColumn>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

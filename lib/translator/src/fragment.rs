use relquad_model::Variable;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Where a variable's `term_uuid` can be read from, and whether a join to
/// `term` already exposes its lexical text/kind/lang/datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableColumn {
    /// SQL expression yielding the `term_uuid`, e.g. `q0.subject_uuid`.
    pub uuid_expr: String,
    /// Alias of a `term` join already present for this position, if any
    /// (spec.md §4.6: "each position that must appear in results joins
    /// once to `term`").
    pub term_alias: Option<String>,
    /// `true` once this binding has passed through a `LeftJoin`'s
    /// optional side, so the materializer must treat a `NULL` read as
    /// unbound rather than an error.
    pub nullable: bool,
    /// `true` when `uuid_expr` is already a scalar value (an `Extend`
    /// binding produced by a compiled expression) rather than a
    /// `term_uuid` that still needs resolving against `term`.
    pub computed: bool,
}

impl VariableColumn {
    #[must_use]
    pub fn required(uuid_expr: impl Into<String>) -> Self {
        Self {
            uuid_expr: uuid_expr.into(),
            term_alias: None,
            nullable: false,
            computed: false,
        }
    }

    /// A binding whose value is already a scalar SQL expression, as
    /// produced by `BIND`/`Extend` (spec.md §4.6), not a `term_uuid`.
    #[must_use]
    pub fn computed(expr: impl Into<String>) -> Self {
        Self {
            uuid_expr: expr.into(),
            term_alias: None,
            nullable: false,
            computed: true,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// The `(FROM fragment, WHERE conditions, JOIN list, variable→column map)`
/// tuple spec.md §4.6 specifies every pattern-translator node returns,
/// bundled into one type so it composes: a parent node reads its
/// children's fragments and merges them rather than re-deriving bindings.
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// The first table/subquery reference of the `FROM` clause. Empty
    /// only for a node (like `Values` with zero rows) that contributes no
    /// relation at all.
    pub from: Vec<String>,
    pub joins: Vec<String>,
    pub where_conditions: Vec<String>,
    pub bindings: BTreeMap<Variable, VariableColumn>,
}

impl SqlFragment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_bindings_from(&mut self, other: &SqlFragment) {
        for (var, column) in &other.bindings {
            self.bindings.entry(var.clone()).or_insert_with(|| column.clone());
        }
    }

    /// Renders `FROM <from> <joins> [WHERE <conditions>]` as it appears
    /// inside a derived-table subquery or the outermost statement.
    #[must_use]
    pub fn render_from_clause(&self) -> String {
        let mut sql = String::new();
        if !self.from.is_empty() {
            let _ = write!(sql, "FROM {}", self.from.join(", "));
        }
        for join in &self.joins {
            let _ = write!(sql, " {join}");
        }
        if !self.where_conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", self.where_conditions.join(" AND "));
        }
        sql
    }
}

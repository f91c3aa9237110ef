/// Per-query overrides of [`relquad_common::RelquadConfig`]'s defaults
/// (SPEC_FULL.md §13(d)): a caller that knows a particular query's property
/// paths need more or less headroom than the space-wide default can pass
/// one of these without touching the shared config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    recursion_limit: Option<u32>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    #[must_use]
    pub(crate) fn recursion_limit(&self) -> Option<u32> {
        self.recursion_limit
    }
}

/// The SQL text a query form translated to, returned alongside its results
/// by [`Store::explain_query_opt`](crate::Store::explain_query_opt) (SPEC_FULL.md §11,
/// mirroring the teacher's `Store::explain_query_opt`/`QueryExplanation`).
/// Unlike the teacher's explanation this carries no cost-based statistics —
/// that remains the store's job, per the Non-goals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExplanation {
    sql: String,
}

impl QueryExplanation {
    #[must_use]
    pub(crate) fn new(sql: String) -> Self {
        Self { sql }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

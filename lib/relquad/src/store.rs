use crate::options::{QueryExplanation, QueryOptions};
use futures::stream::{self, Stream};
use relquad_common::error::RelquadResult;
use relquad_common::{RelationalStore, RelquadConfig, RelquadError, SpaceTableNames};
use relquad_execution::{execute_query, execute_update, QueryResults};
use relquad_model::{Query, Quad, Update};
use relquad_termcache::TermCache;
use tracing::instrument;

/// A SPARQL-queryable view onto one space of a relational store
/// (spec.md §6): couples a [`RelationalStore`] collaborator, the resolved
/// table names for one space, and that space's term-UUID cache.
///
/// Unlike the teacher's `Store`, which owns its `DataFusion` storage
/// engine directly, this facade never owns the database connection — the
/// caller constructs whatever [`RelationalStore`] talks to its database
/// and hands it in.
pub struct Store {
    store: Box<dyn RelationalStore>,
    config: RelquadConfig,
    tables: SpaceTableNames,
    cache: TermCache,
}

impl Store {
    /// Opens a facade onto `space_id` using `config`'s table-naming
    /// template (spec.md §4.1) and a cache sized per
    /// [`RelquadConfig::cache`].
    #[must_use]
    pub fn new(store: Box<dyn RelationalStore>, config: RelquadConfig, space_id: &str) -> Self {
        let tables = config.table_names(space_id);
        let cache = TermCache::new(config.cache());
        Self { store, config, tables, cache }
    }

    /// The underlying collaborator, for callers that need to run DDL or
    /// inspect connection state directly.
    #[must_use]
    pub fn collaborator(&self) -> &dyn RelationalStore {
        self.store.as_ref()
    }

    /// The physical table names this facade resolved for its space.
    #[must_use]
    pub fn tables(&self) -> &SpaceTableNames {
        &self.tables
    }

    /// Preloads the term cache with every `term_uuid` whose lexical text
    /// starts with one of `config.cache().pinned_prefixes` (spec.md §4.2),
    /// so the first queries against common vocabulary (`rdf:`, `xsd:`,
    /// `rdfs:`) don't pay a cache-miss round trip. Returns the number of
    /// terms warmed.
    pub async fn warm_cache(&self) -> RelquadResult<usize> {
        let mut warmed = 0;
        for prefix in &self.config.cache().pinned_prefixes {
            warmed += self.cache.warm(self.store.as_ref(), self.tables.term(), prefix).await?;
        }
        Ok(warmed)
    }

    /// Executes a SPARQL 1.1 query (spec.md §4.8) with the space's default
    /// options.
    pub async fn query(&self, sparql: &str) -> RelquadResult<QueryResults> {
        self.query_opt(sparql, QueryOptions::default()).await
    }

    /// Executes a SPARQL 1.1 query with per-call overrides.
    #[instrument(skip(self, sparql))]
    pub async fn query_opt(&self, sparql: &str, options: QueryOptions) -> RelquadResult<QueryResults> {
        let query = Query::parse(sparql, None)?;
        let config = self.resolved_config(options);
        self.run_query(&query, &config).await
    }

    /// Like [`Self::query_opt`], but also returns the SQL text the query
    /// form translated to (spec.md §11, mirroring the teacher's
    /// `Store::explain_query_opt`). The explanation carries no cost-based
    /// statistics — that remains the store's job.
    pub async fn explain_query_opt(
        &self,
        sparql: &str,
        options: QueryOptions,
    ) -> RelquadResult<(QueryResults, QueryExplanation)> {
        let query = Query::parse(sparql, None)?;
        let config = self.resolved_config(options);
        let sql = explain_sql(&config, self.tables.term(), self.tables.rdf_quad(), &query)?;
        let results = self.run_query(&query, &config).await?;
        Ok((results, QueryExplanation::new(sql)))
    }

    /// Runs `CONSTRUCT`/`DESCRIBE` and exposes the resulting graph as a
    /// [`Stream`] (SPEC_FULL.md §11, mirroring the teacher's
    /// `QuerySolutionStream`). The quads are still fully materialized by
    /// `relquad-execution` before this returns — turning that into a true
    /// incrementally-produced stream would mean reworking the
    /// materializer's buffering, which is out of scope for this facade —
    /// but callers get the stream-shaped API now so that change is
    /// additive later.
    pub async fn graph_stream(&self, sparql: &str) -> RelquadResult<impl Stream<Item = Quad>> {
        match self.query(sparql).await? {
            QueryResults::Graph(quads) => Ok(stream::iter(quads)),
            QueryResults::Solutions(_) | QueryResults::Boolean(_) => Err(RelquadError::Type(
                "graph_stream only applies to CONSTRUCT/DESCRIBE, which return a graph".to_owned(),
            )),
        }
    }

    /// Runs a SPARQL 1.1 Update under one transaction (spec.md §4.9): the
    /// whole update commits or none of it does.
    #[instrument(skip(self, sparql))]
    pub async fn update(&self, sparql: &str) -> RelquadResult<()> {
        let update = Update::parse(sparql, None)?;
        execute_update(self.store.as_ref(), &self.config, self.tables.term(), self.tables.rdf_quad(), &update).await
    }

    fn resolved_config(&self, options: QueryOptions) -> RelquadConfig {
        match options.recursion_limit() {
            Some(limit) => self.config.clone().with_recursion_limit(limit),
            None => self.config.clone(),
        }
    }

    async fn run_query(&self, query: &Query, config: &RelquadConfig) -> RelquadResult<QueryResults> {
        execute_query(self.store.as_ref(), &self.cache, config, self.tables.term(), self.tables.rdf_quad(), query).await
    }
}

fn explain_sql(config: &RelquadConfig, term_table: &str, rdf_quad_table: &str, query: &Query) -> RelquadResult<String> {
    let sql = match query {
        Query::Select { pattern, .. } => relquad_translator::translate_select(config, term_table, rdf_quad_table, pattern)?.0,
        Query::Ask { pattern, .. } => relquad_translator::translate_ask(config, term_table, rdf_quad_table, pattern)?.0,
        Query::Construct { pattern, .. } | Query::Describe { pattern, .. } => {
            relquad_translator::translate_pattern(config, term_table, rdf_quad_table, pattern)?.0
        }
    };
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relquad_common::error::StoreError;
    use relquad_common::{Row, RowCursor, SqlValue, StoreTransaction};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A store that panics if touched, for tests that exercise a failure
    /// before any SQL would be submitted (e.g. a parse error).
    struct UnreachableStore;

    #[async_trait]
    impl RelationalStore for UnreachableStore {
        async fn execute_query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Box<dyn RowCursor>, StoreError> {
            panic!("query reached the store despite an earlier parse failure")
        }
        async fn execute_ddl(&self, _sql: &str) -> Result<(), StoreError> {
            panic!("ddl reached the store despite an earlier parse failure")
        }
        async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
            panic!("transaction reached the store despite an earlier parse failure")
        }
        async fn cancel(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// A store that answers exactly one `ASK {}`-shaped query: `SELECT
    /// EXISTS(SELECT 1 ) AS answer`, for an empty `WHERE` clause. Enough to
    /// exercise the facade's parse → translate → execute → materialize
    /// wiring without reimplementing the nested-loop SQL interpreter that
    /// `relquad-execution`'s own tests already cover.
    struct AlwaysTrueAskStore;

    #[async_trait]
    impl RelationalStore for AlwaysTrueAskStore {
        async fn execute_query(&self, sql: &str, _params: &[SqlValue]) -> Result<Box<dyn RowCursor>, StoreError> {
            assert!(sql.starts_with("SELECT EXISTS("), "unexpected SQL from an empty ASK pattern: {sql}");
            let rows = VecDeque::from([Row::new(vec![SqlValue::Bool(true)])]);
            Ok(Box::new(FixedCursor { rows: Mutex::new(rows) }))
        }
        async fn execute_ddl(&self, _sql: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
            Err(StoreError::other("this fixture does not support updates"))
        }
        async fn cancel(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct FixedCursor {
        rows: Mutex<VecDeque<Row>>,
    }

    #[async_trait]
    impl RowCursor for FixedCursor {
        async fn next_row(&mut self) -> Result<Option<Row>, StoreError> {
            Ok(self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front())
        }

        fn column_names(&self) -> &[String] {
            &[]
        }
    }

    fn config() -> RelquadConfig {
        RelquadConfig::new("rq", "http://example.org/defaultGraph")
    }

    #[tokio::test]
    async fn a_syntax_error_never_reaches_the_store() {
        let facade = Store::new(Box::new(UnreachableStore), config(), "acme");
        let error = facade.query("SELECT ?s WHERE").await.unwrap_err();
        assert!(matches!(error, relquad_common::RelquadError::Parse(_)));
    }

    #[tokio::test]
    async fn table_names_are_scoped_to_the_space() {
        let facade = Store::new(Box::new(UnreachableStore), config(), "acme");
        assert_eq!(facade.tables().term(), "rq_acme_term");
        assert_eq!(facade.tables().rdf_quad(), "rq_acme_rdf_quad");
    }

    #[tokio::test]
    async fn ask_with_an_empty_pattern_round_trips_through_the_facade() {
        let facade = Store::new(Box::new(AlwaysTrueAskStore), config(), "acme");
        let results = facade.query("ASK {}").await.unwrap();
        assert!(matches!(results, QueryResults::Boolean(true)));
    }

    #[tokio::test]
    async fn explain_reports_the_translated_sql() {
        let facade = Store::new(Box::new(AlwaysTrueAskStore), config(), "acme");
        let (results, explanation) = facade.explain_query_opt("ASK {}", QueryOptions::default()).await.unwrap();
        assert!(matches!(results, QueryResults::Boolean(true)));
        assert!(explanation.sql().starts_with("SELECT EXISTS("));
    }

    #[tokio::test]
    async fn graph_stream_rejects_a_non_graph_query_form() {
        let facade = Store::new(Box::new(AlwaysTrueAskStore), config(), "acme");
        let error = facade.graph_stream("ASK {}").await.unwrap_err();
        assert!(matches!(error, relquad_common::RelquadError::Type(_)));
    }

    #[test]
    fn recursion_limit_override_replaces_the_space_default() {
        let facade = Store::new(Box::new(UnreachableStore), config(), "acme");
        let overridden = facade.resolved_config(QueryOptions::new().with_recursion_limit(3));
        assert_eq!(overridden.default_recursion_limit(), 3);
        let unchanged = facade.resolved_config(QueryOptions::default());
        assert_eq!(unchanged.default_recursion_limit(), facade.config.default_recursion_limit());
    }
}

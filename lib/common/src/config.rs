/// Resolved configuration the translator and execution layers consume.
/// How this struct is populated (file, env, service discovery) is a
/// surrounding-service concern; this crate only defines its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelquadConfig {
    /// Prefix shared by every physical table name, before the per-space
    /// segment (spec.md §4.1).
    global_table_prefix: String,

    /// The reserved `context_uuid` namespace IRI the default graph encodes
    /// under (SPEC_FULL.md §13(c): the default graph is a distinct named
    /// graph, not a union of named graphs).
    default_graph_iri: String,

    /// Global recursion-depth cap for property paths, overridable per
    /// query (SPEC_FULL.md §13(d)).
    default_recursion_limit: u32,

    cache: CacheConfig,
    deadlines: DeadlineConfig,
}

impl RelquadConfig {
    #[must_use]
    pub fn new(global_table_prefix: impl Into<String>, default_graph_iri: impl Into<String>) -> Self {
        Self {
            global_table_prefix: global_table_prefix.into(),
            default_graph_iri: default_graph_iri.into(),
            default_recursion_limit: 10,
            cache: CacheConfig::default(),
            deadlines: DeadlineConfig::default(),
        }
    }

    #[must_use]
    pub fn global_table_prefix(&self) -> &str {
        &self.global_table_prefix
    }

    #[must_use]
    pub fn default_graph_iri(&self) -> &str {
        &self.default_graph_iri
    }

    #[must_use]
    pub fn default_recursion_limit(&self) -> u32 {
        self.default_recursion_limit
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.default_recursion_limit = limit;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn deadlines(&self) -> &DeadlineConfig {
        &self.deadlines
    }

    #[must_use]
    pub fn with_deadlines(mut self, deadlines: DeadlineConfig) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Derives the physical table names for one space from this config's
    /// prefix, per the `(global_prefix, space_id)` template in spec.md
    /// §4.1.
    #[must_use]
    pub fn table_names(&self, space_id: &str) -> SpaceTableNames {
        SpaceTableNames::new(&self.global_table_prefix, space_id)
    }
}

/// Term-UUID cache sizing (spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of non-pinned entries held before LRU eviction.
    pub max_entries: usize,
    /// Vocabulary IRI prefixes preloaded via `warm` and never evicted.
    pub pinned_prefixes: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000_000,
            pinned_prefixes: vec![
                "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_owned(),
                "http://www.w3.org/2001/XMLSchema#".to_owned(),
                "http://www.w3.org/2000/01/rdf-schema#".to_owned(),
            ],
        }
    }
}

/// Wall-clock deadlines (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineConfig {
    pub query_timeout_ms: u64,
    pub update_timeout_ms: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 30_000,
            update_timeout_ms: 60_000,
        }
    }
}

/// The physical table names for one `(global_prefix, space_id)` pair.
/// Computed without a catalog lookup, per spec.md §4.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceTableNames {
    term: String,
    rdf_quad: String,
}

impl SpaceTableNames {
    fn new(global_prefix: &str, space_id: &str) -> Self {
        Self {
            term: format!("{global_prefix}_{space_id}_term"),
            rdf_quad: format!("{global_prefix}_{space_id}_rdf_quad"),
        }
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn rdf_quad(&self) -> &str {
        &self.rdf_quad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_follow_the_fixed_template() {
        let config = RelquadConfig::new("rq", "http://example.org/defaultGraph");
        let tables = config.table_names("acme");
        assert_eq!(tables.term(), "rq_acme_term");
        assert_eq!(tables.rdf_quad(), "rq_acme_rdf_quad");
    }

    #[test]
    fn recursion_limit_defaults_to_ten() {
        let config = RelquadConfig::new("rq", "http://example.org/defaultGraph");
        assert_eq!(config.default_recursion_limit(), 10);
    }
}

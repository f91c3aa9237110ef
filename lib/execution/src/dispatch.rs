use crate::materializer::{materialize_boolean, materialize_solutions};
use crate::solution::{QueryResults, QuerySolution};
use relquad_common::error::RelquadResult;
use relquad_common::{RelationalStore, RelquadConfig, RelquadError};
use relquad_model::{NamedNodePattern, Query, Quad, Term, TermPattern, TriplePattern};
use relquad_schema::TermId;
use relquad_termcache::TermCache;
use tracing::instrument;

/// Dispatches one parsed query to the form its variant names (spec.md
/// §4.8): `SELECT`/`ASK` run their translated statement straight through
/// the materializer, while `CONSTRUCT`/`DESCRIBE` additionally
/// instantiate a triple template from each solution.
#[instrument(skip(store, cache, config, query))]
pub async fn execute_query(
    store: &dyn RelationalStore,
    cache: &TermCache,
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    query: &Query,
) -> RelquadResult<QueryResults> {
    match query {
        Query::Select { pattern, .. } => {
            let solutions = execute_select(store, cache, config, term_table, rdf_quad_table, pattern).await?;
            Ok(QueryResults::Solutions(solutions))
        }
        Query::Ask { pattern, .. } => {
            let answer = execute_ask(store, config, term_table, rdf_quad_table, pattern).await?;
            Ok(QueryResults::Boolean(answer))
        }
        Query::Construct { template, pattern, .. } => {
            let quads = execute_construct(store, cache, config, term_table, rdf_quad_table, template, pattern).await?;
            Ok(QueryResults::Graph(quads))
        }
        Query::Describe { pattern, .. } => {
            let quads = execute_describe(store, cache, config, term_table, rdf_quad_table, pattern).await?;
            Ok(QueryResults::Graph(quads))
        }
    }
}

pub async fn execute_select(
    store: &dyn RelationalStore,
    cache: &TermCache,
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &relquad_model::GraphPattern,
) -> RelquadResult<Vec<QuerySolution>> {
    let (sql, params) = relquad_translator::translate_select(config, term_table, rdf_quad_table, pattern)?;
    let algebra = relquad_algebra::build_algebra(pattern);
    let projection: Vec<_> = algebra.visible_variables().into_iter().collect();
    let cursor = store.execute_query(&sql, &params).await.map_err(RelquadError::Store)?;
    materialize_solutions(cache, store, term_table, &projection, cursor).await
}

pub async fn execute_ask(
    store: &dyn RelationalStore,
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &relquad_model::GraphPattern,
) -> RelquadResult<bool> {
    let (sql, params) = relquad_translator::translate_ask(config, term_table, rdf_quad_table, pattern)?;
    let cursor = store.execute_query(&sql, &params).await.map_err(RelquadError::Store)?;
    materialize_boolean(cursor).await
}

pub async fn execute_construct(
    store: &dyn RelationalStore,
    cache: &TermCache,
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    template: &[TriplePattern],
    pattern: &relquad_model::GraphPattern,
) -> RelquadResult<Vec<Quad>> {
    let (sql, params, projection) = relquad_translator::translate_pattern(config, term_table, rdf_quad_table, pattern)?;
    let cursor = store.execute_query(&sql, &params).await.map_err(RelquadError::Store)?;
    let solutions = materialize_solutions(cache, store, term_table, &projection, cursor).await?;

    let mut quads = Vec::new();
    for solution in &solutions {
        quads.extend(instantiate_template(template, solution));
    }
    Ok(quads)
}

/// `DESCRIBE` (spec.md §4.8): every `NamedNode`/`BlankNode` bound by the
/// `WHERE` clause is expanded to every quad where it appears as subject
/// or object. A `DESCRIBE` whose
/// pattern binds nothing — no resource and no matching solution — is a
/// cardinality error rather than an empty graph, since the form promises
/// a description of *something*.
pub async fn execute_describe(
    store: &dyn RelationalStore,
    cache: &TermCache,
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &relquad_model::GraphPattern,
) -> RelquadResult<Vec<Quad>> {
    let (sql, params, projection) = relquad_translator::translate_pattern(config, term_table, rdf_quad_table, pattern)?;
    let cursor = store.execute_query(&sql, &params).await.map_err(RelquadError::Store)?;
    let solutions = materialize_solutions(cache, store, term_table, &projection, cursor).await?;

    let mut resources = std::collections::BTreeSet::new();
    for solution in &solutions {
        for variable in solution.variables() {
            if let Some(term) = solution.get(variable) {
                if matches!(term, Term::NamedNode(_) | Term::BlankNode(_)) {
                    resources.insert(term.clone());
                }
            }
        }
    }

    if resources.is_empty() {
        return Err(RelquadError::Cardinality(
            "DESCRIBE matched no bindable resource; a query with no WHERE must name a resource directly".to_owned(),
        ));
    }

    let mut quads = Vec::new();
    for resource in resources {
        quads.extend(describe_resource(store, cache, term_table, rdf_quad_table, &resource).await?);
    }
    Ok(quads)
}

async fn describe_resource(
    store: &dyn RelationalStore,
    cache: &TermCache,
    term_table: &str,
    rdf_quad_table: &str,
    resource: &Term,
) -> RelquadResult<Vec<Quad>> {
    use relquad_common::SqlValue;
    use relquad_model::TermValue;
    use relquad_schema::columns::rdf_quad;

    let value = match resource {
        Term::NamedNode(nn) => TermValue::from(nn.as_ref()),
        Term::BlankNode(bn) => TermValue::from(bn.as_ref()),
        Term::Literal(_) => return Ok(Vec::new()),
    };
    let id = TermId::from_term(&value);
    // spec.md §4.8: DESCRIBE's bounded description covers every quad where
    // the resource appears as subject OR object, not just its outgoing
    // triples. A self-loop quad (`resource`, p, `resource`) matches both
    // branches, so the combined rows are deduped below via `quads`'s
    // `BTreeSet` rather than relying on `UNION` to do it in SQL.
    let sql = format!(
        "SELECT {s}, {p}, {o}, {g} FROM {rdf_quad_table} WHERE {s} = $1 UNION ALL SELECT {s}, {p}, {o}, {g} FROM {rdf_quad_table} WHERE {o} = $1",
        s = rdf_quad::SUBJECT_UUID,
        p = rdf_quad::PREDICATE_UUID,
        o = rdf_quad::OBJECT_UUID,
        g = rdf_quad::CONTEXT_UUID,
    );
    let mut cursor = store
        .execute_query(&sql, &[SqlValue::Uuid(id.as_uuid())])
        .await
        .map_err(RelquadError::Store)?;

    let mut rows = Vec::new();
    let mut uuids = rustc_hash::FxHashSet::default();
    let mut seen_rows = rustc_hash::FxHashSet::default();
    while let Some(row) = cursor.next_row().await.map_err(RelquadError::Store)? {
        let key: Vec<uuid::Uuid> = row
            .values()
            .iter()
            .filter_map(|value| match value {
                SqlValue::Uuid(uuid) => Some(*uuid),
                _ => None,
            })
            .collect();
        if !seen_rows.insert(key) {
            continue;
        }
        for value in row.values() {
            if let SqlValue::Uuid(uuid) = value {
                uuids.insert(TermId::from_uuid(*uuid));
            }
        }
        rows.push(row);
    }
    let uuid_list: Vec<TermId> = uuids.into_iter().collect();
    let resolved = cache.resolve_uuids(store, term_table, &uuid_list).await?;

    let mut quads = Vec::new();
    for row in rows {
        let subject = column_term(&row, 0, &resolved)?;
        let predicate = column_term(&row, 1, &resolved)?;
        let object = column_term(&row, 2, &resolved)?;
        let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) else {
            continue;
        };
        let Term::NamedNode(predicate) = predicate else {
            continue;
        };
        let subject = match subject {
            Term::NamedNode(nn) => relquad_model::NamedOrBlankNode::NamedNode(nn),
            Term::BlankNode(bn) => relquad_model::NamedOrBlankNode::BlankNode(bn),
            Term::Literal(_) => continue,
        };
        quads.push(Quad::new(subject, predicate, object, relquad_model::GraphName::DefaultGraph));
    }
    Ok(quads)
}

fn column_term(
    row: &relquad_common::Row,
    index: usize,
    resolved: &rustc_hash::FxHashMap<TermId, relquad_model::TermValue>,
) -> RelquadResult<Option<Term>> {
    use relquad_common::{SqlValue, StoreError};
    match row.get(index) {
        Some(SqlValue::Uuid(uuid)) => {
            let id = TermId::from_uuid(*uuid);
            let value = resolved
                .get(&id)
                .ok_or_else(|| RelquadError::Store(StoreError::other(format!("unresolved term_uuid {uuid}"))))?;
            Ok(value.to_term())
        }
        other => Err(RelquadError::Store(StoreError::other(format!(
            "expected a term_uuid column, found {other:?}"
        )))),
    }
}

fn instantiate_template(template: &[TriplePattern], solution: &QuerySolution) -> Vec<Quad> {
    template
        .iter()
        .filter_map(|triple| {
            let subject = resolve_subject(&triple.subject, solution)?;
            let predicate = resolve_predicate(&triple.predicate, solution)?;
            let object = resolve_term(&triple.object, solution)?;
            Some(Quad::new(subject, predicate, object, relquad_model::GraphName::DefaultGraph))
        })
        .collect()
}

fn resolve_term(pattern: &TermPattern, solution: &QuerySolution) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(nn) => Some(nn.clone().into()),
        TermPattern::BlankNode(bn) => Some(bn.clone().into()),
        TermPattern::Literal(lit) => Some(lit.clone().into()),
        TermPattern::Variable(var) => solution.get(var).cloned(),
        TermPattern::Triple(_) => None,
    }
}

fn resolve_subject(pattern: &TermPattern, solution: &QuerySolution) -> Option<relquad_model::NamedOrBlankNode> {
    match resolve_term(pattern, solution)? {
        Term::NamedNode(nn) => Some(relquad_model::NamedOrBlankNode::NamedNode(nn)),
        Term::BlankNode(bn) => Some(relquad_model::NamedOrBlankNode::BlankNode(bn)),
        Term::Literal(_) => None,
    }
}

fn resolve_predicate(pattern: &NamedNodePattern, solution: &QuerySolution) -> Option<relquad_model::NamedNode> {
    match pattern {
        NamedNodePattern::NamedNode(nn) => Some(nn.clone()),
        NamedNodePattern::Variable(var) => match solution.get(var)? {
            Term::NamedNode(nn) => Some(nn.clone()),
            _ => None,
        },
    }
}

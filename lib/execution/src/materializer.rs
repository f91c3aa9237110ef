use crate::solution::QuerySolution;
use relquad_common::error::RelquadResult;
use relquad_common::{RelationalStore, RelquadError, Row, RowCursor, SqlValue, StoreError};
use relquad_model::Variable;
use relquad_schema::TermId;
use relquad_termcache::TermCache;
use rustc_hash::FxHashSet;

/// Drains a result cursor and resolves every `term_uuid` column back to
/// its lexical term (spec.md §4.10). Reads the whole cursor before
/// resolving uuids so the cache sees one batched `IN`-list lookup per
/// query rather than one round-trip per row.
pub async fn materialize_solutions(
    cache: &TermCache,
    store: &dyn RelationalStore,
    term_table: &str,
    projection: &[Variable],
    mut cursor: Box<dyn RowCursor>,
) -> RelquadResult<Vec<QuerySolution>> {
    let mut rows = Vec::new();
    let mut uuids: FxHashSet<TermId> = FxHashSet::default();

    while let Some(row) = cursor.next_row().await.map_err(RelquadError::Store)? {
        for value in row.values() {
            if let SqlValue::Uuid(uuid) = value {
                let id = TermId::from_uuid(*uuid);
                if id != TermId::DEFAULT_GRAPH {
                    uuids.insert(id);
                }
            }
        }
        rows.push(row);
    }

    let uuid_list: Vec<TermId> = uuids.into_iter().collect();
    let resolved = cache.resolve_uuids(store, term_table, &uuid_list).await?;

    let mut solutions = Vec::with_capacity(rows.len());
    for row in rows {
        let mut solution = QuerySolution::new();
        for (variable, value) in projection.iter().zip(row.values()) {
            let SqlValue::Uuid(uuid) = value else {
                continue;
            };
            let id = TermId::from_uuid(*uuid);
            let term_value = resolved.get(&id).ok_or_else(|| {
                RelquadError::Store(StoreError::other(format!(
                    "row referenced term_uuid {uuid} that was not found in {term_table}"
                )))
            })?;
            if let Some(term) = term_value.to_term() {
                solution.bind(variable.clone(), term);
            }
        }
        solutions.push(solution);
    }
    Ok(solutions)
}

/// Reads a single `ASK` boolean answer column from a one-row, one-column
/// cursor.
pub async fn materialize_boolean(mut cursor: Box<dyn RowCursor>) -> RelquadResult<bool> {
    let row: Row = cursor
        .next_row()
        .await
        .map_err(RelquadError::Store)?
        .ok_or_else(|| RelquadError::Store(StoreError::other("ASK query returned no rows")))?;
    match row.get(0) {
        Some(SqlValue::Bool(value)) => Ok(*value),
        other => Err(RelquadError::Store(StoreError::other(format!(
            "expected a boolean ASK answer, found {other:?}"
        )))),
    }
}

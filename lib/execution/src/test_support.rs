//! A fake in-memory [`RelationalStore`] (SPEC_FULL.md §10.4), playing the
//! role the teacher's `MemQuadStorage`/`MemObjectIdMapping` play for
//! `Store::default()`: lets update-executor and materializer tests run
//! without a real SQL engine.
//!
//! This is a small nested-loop interpreter over the handful of statement
//! shapes `relquad-translator` and `relquad-execution::update` actually
//! emit: flat multi-table joins, conjunctive `WHERE` equalities/`IN`-lists,
//! `UNION ALL`, and simple `INSERT`/`DELETE`. It does not implement derived
//! `(SELECT ...) AS x` subqueries, `WITH RECURSIVE`, aggregates, or
//! `ORDER BY`/`LIMIT` — patterns that use those (`LeftJoin`, `Union`,
//! property-path closures, `GROUP BY` queries) are exercised through the
//! translator's SQL-text snapshot tests instead of full execution here.

use async_trait::async_trait;
use relquad_common::error::StoreError;
use relquad_common::{RelationalStore, Row, RowCursor, SqlValue, StoreTransaction};
use relquad_model::{GraphName, NamedOrBlankNode, Quad, Term};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl Table {
    fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// An in-process relational store backed by plain `Vec`s, scoped to one
/// `term` table and one `rdf_quad` table.
pub struct InMemoryStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(term_table: &str, rdf_quad_table: &str) -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            term_table.to_owned(),
            Table::new(&["term_uuid", "term_text", "term_type", "lang", "datatype"]),
        );
        tables.insert(
            rdf_quad_table.to_owned(),
            Table::new(&["subject_uuid", "predicate_uuid", "object_uuid", "context_uuid"]),
        );
        Self { tables: Arc::new(Mutex::new(tables)) }
    }

    /// Seeds a quad directly, bypassing SQL, for test setup.
    pub fn seed_quad(&self, rdf_quad_table: &str, subject: Uuid, predicate: Uuid, object: Uuid, graph: Uuid) {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let table = tables.get_mut(rdf_quad_table).expect("rdf_quad table must be seeded");
        table.rows.push(vec![
            SqlValue::Uuid(subject),
            SqlValue::Uuid(predicate),
            SqlValue::Uuid(object),
            SqlValue::Uuid(graph),
        ]);
    }

    /// Seeds a term row directly, bypassing SQL, for test setup.
    pub fn seed_term(&self, term_table: &str, uuid: Uuid, text: &str, kind: char, lang: Option<&str>, datatype: Option<&str>) {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let table = tables.get_mut(term_table).expect("term table must be seeded");
        table.rows.push(vec![
            SqlValue::Uuid(uuid),
            SqlValue::Text(text.to_owned()),
            SqlValue::Text(kind.to_string()),
            lang.map_or(SqlValue::Null, |l| SqlValue::Text(l.to_owned())),
            datatype.map_or(SqlValue::Null, |d| SqlValue::Text(d.to_owned())),
        ]);
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tables.get(table).map_or(0, |t| t.rows.len())
    }
}

type BoundRow<'a> = HashMap<String, &'a SqlValue>;

fn resolve_param(params: &[SqlValue], token: &str) -> Option<SqlValue> {
    let index: usize = token.strip_prefix('$')?.parse().ok()?;
    params.get(index - 1).cloned()
}

fn eval_side(token: &str, row: &BoundRow<'_>, params: &[SqlValue]) -> Option<SqlValue> {
    let token = token.trim();
    if let Some(value) = resolve_param(params, token) {
        return Some(value);
    }
    if let Some(value) = row.get(token) {
        return Some((*value).clone());
    }
    if !token.contains('.') {
        // An unqualified column name, as in a single-table statement with
        // no declared alias (e.g. `copy_graph`'s `FROM table WHERE col =
        // $1`) — match the one bound key ending in `.token`.
        let suffix = format!(".{token}");
        if let Some((_, value)) = row.iter().find(|(key, _)| key.ends_with(&suffix)) {
            return Some((*value).clone());
        }
    }
    if let Some(uuid_text) = token.strip_prefix('\'').and_then(|t| t.strip_suffix("'::uuid")) {
        return Uuid::parse_str(uuid_text).ok().map(SqlValue::Uuid);
    }
    None
}

fn eval_condition(condition: &str, row: &BoundRow<'_>, params: &[SqlValue]) -> bool {
    let condition = condition.trim().trim_start_matches('(').trim_end_matches(')');
    if let Some((lhs, rhs)) = condition.split_once("<>") {
        return eval_side(lhs, row, params) != eval_side(rhs, row, params);
    }
    if let Some((lhs, list)) = condition.split_once(" IN (") {
        let list = list.trim_end_matches(')');
        let lhs_value = eval_side(lhs, row, params);
        return list
            .split(',')
            .any(|token| lhs_value == eval_side(token, row, params));
    }
    if let Some((lhs, rhs)) = condition.split_once('=') {
        return eval_side(lhs, row, params) == eval_side(rhs, row, params);
    }
    true
}

/// A parsed `FROM`/`JOIN` item: `table AS alias [ON condition]`.
struct FromItem {
    table: String,
    alias: String,
    on: Option<String>,
}

fn parse_from_items(from_clause: &str) -> Vec<FromItem> {
    from_clause
        .split(" JOIN ")
        .flat_map(|segment| segment.split(','))
        .filter_map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() {
                return None;
            }
            let (head, on) = match piece.split_once(" ON ") {
                Some((head, on)) => (head, Some(on.trim().to_owned())),
                None => (piece, None),
            };
            let mut parts = head.split_whitespace();
            let table = parts.next()?.to_owned();
            let _as = parts.next();
            let alias = parts.next().unwrap_or(&table).to_owned();
            Some(FromItem { table, alias, on })
        })
        .collect()
}

fn run_select(tables: &HashMap<String, Table>, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
    let sql = sql.trim();
    if let Some(inner) = sql
        .strip_prefix("SELECT EXISTS(")
        .and_then(|s| s.strip_suffix(") AS answer"))
    {
        let from_and_where = inner
            .trim_start_matches("SELECT 1 ")
            .strip_prefix("FROM ")
            .ok_or_else(|| StoreError::other("fake store requires a FROM clause in an EXISTS subquery"))?;
        let (from_clause, where_clause) = match from_and_where.split_once(" WHERE ") {
            Some((from_clause, where_clause)) => (from_clause, Some(where_clause)),
            None => (from_and_where, None),
        };
        let exists = !evaluate_rows(tables, from_clause, where_clause, params)?.is_empty();
        return Ok(vec![Row::new(vec![SqlValue::Bool(exists)])]);
    }

    let mut results = Vec::new();
    for branch in sql.split(" UNION ALL ") {
        results.extend(run_select_branch(tables, branch, params)?);
    }
    Ok(results)
}

fn run_select_branch(tables: &HashMap<String, Table>, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
    let without_select = sql
        .trim()
        .strip_prefix("SELECT ")
        .ok_or_else(|| StoreError::other("fake store only understands SELECT statements"))?;
    let (select_list, rest) = without_select
        .split_once(" FROM ")
        .ok_or_else(|| StoreError::other("fake store requires a FROM clause"))?;
    let (from_clause, where_clause) = match rest.split_once(" WHERE ") {
        Some((from_clause, where_clause)) => (from_clause, Some(where_clause)),
        None => (rest, None),
    };
    let combined = evaluate_rows(tables, from_clause, where_clause, params)?;

    let projections: Vec<&str> = select_list.split(',').map(str::trim).collect();
    let mut rows = Vec::with_capacity(combined.len());
    for bound in &combined {
        let mut values = Vec::with_capacity(projections.len());
        for projection in &projections {
            let expr = projection.split(" AS ").next().unwrap_or(projection).trim();
            let value = eval_side(expr, bound, params)
                .ok_or_else(|| StoreError::other(format!("fake store could not evaluate projection {expr}")))?;
            values.push(value);
        }
        rows.push(Row::new(values));
    }
    Ok(rows)
}

/// Joins and filters a `FROM ... [WHERE ...]` clause pair into bound rows,
/// shared by plain `SELECT` branches and `EXISTS(SELECT 1 FROM ...)` checks.
fn evaluate_rows<'a>(
    tables: &'a HashMap<String, Table>,
    from_clause: &str,
    where_clause: Option<&str>,
    params: &[SqlValue],
) -> Result<Vec<BoundRow<'a>>, StoreError> {
    let items = parse_from_items(from_clause);

    let mut combined: Vec<BoundRow<'a>> = vec![HashMap::new()];
    for item in &items {
        let table = tables
            .get(&item.table)
            .ok_or_else(|| StoreError::other(format!("unknown table {}", item.table)))?;
        let mut next = Vec::new();
        for base in &combined {
            for candidate in &table.rows {
                let mut row = base.clone();
                for (index, column) in table.columns.iter().enumerate() {
                    row.insert(format!("{}.{column}", item.alias), &candidate[index]);
                }
                if item.on.as_deref().is_none_or(|on| eval_condition(on, &row, params)) {
                    next.push(row);
                }
            }
        }
        combined = next;
    }

    if let Some(where_clause) = where_clause {
        combined.retain(|row| where_clause.split(" AND ").all(|c| eval_condition(c, row, params)));
    }

    Ok(combined)
}

fn run_insert(tables: &mut HashMap<String, Table>, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
    let without_insert = sql
        .trim()
        .strip_prefix("INSERT INTO ")
        .ok_or_else(|| StoreError::other("expected INSERT INTO"))?;
    let (head, after_columns) = without_insert
        .split_once('(')
        .ok_or_else(|| StoreError::other("expected a column list"))?;
    let table_name = head.trim().to_owned();
    let (columns_text, remainder) = after_columns
        .split_once(')')
        .ok_or_else(|| StoreError::other("unterminated column list"))?;
    let columns: Vec<&str> = columns_text.split(',').map(str::trim).collect();

    let new_rows = if let Some(select_start) = remainder.find("SELECT ") {
        let select_sql = remainder[select_start..]
            .split(" ON CONFLICT")
            .next()
            .unwrap_or(&remainder[select_start..]);
        let immutable: &HashMap<String, Table> = tables;
        run_select(immutable, select_sql, params)
            .map_err(|e| e)?
            .into_iter()
            .map(|row| row.values().to_vec())
            .collect::<Vec<_>>()
    } else {
        let values_start = remainder
            .find("VALUES (")
            .ok_or_else(|| StoreError::other("expected VALUES"))?
            + "VALUES (".len();
        let values_text = remainder[values_start..]
            .split(')')
            .next()
            .ok_or_else(|| StoreError::other("unterminated VALUES list"))?;
        let row: Vec<SqlValue> = values_text
            .split(',')
            .map(|token| resolve_param(params, token.trim()).unwrap_or(SqlValue::Null))
            .collect();
        vec![row]
    };

    let table = tables
        .get_mut(&table_name)
        .ok_or_else(|| StoreError::other(format!("unknown table {table_name}")))?;
    let key_indices: Vec<usize> = columns
        .iter()
        .filter_map(|column| table.column_index(column))
        .collect();

    let mut inserted = 0u64;
    for candidate in new_rows {
        let duplicate = table.rows.iter().any(|existing| {
            key_indices.iter().all(|&index| existing.get(index) == candidate.get(index))
        });
        if !duplicate {
            let mut ordered = vec![SqlValue::Null; table.columns.len()];
            for (position, column) in columns.iter().enumerate() {
                if let Some(index) = table.column_index(column) {
                    ordered[index] = candidate[position].clone();
                }
            }
            table.rows.push(ordered);
            inserted += 1;
        }
    }
    Ok(inserted)
}

fn run_delete(tables: &mut HashMap<String, Table>, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
    let without_delete = sql
        .trim()
        .strip_prefix("DELETE FROM ")
        .ok_or_else(|| StoreError::other("expected DELETE FROM"))?;
    let (table_name, where_clause) = match without_delete.split_once(" WHERE ") {
        Some((name, clause)) => (name.trim().to_owned(), Some(clause)),
        None => (without_delete.trim().to_owned(), None),
    };
    let table = tables
        .get_mut(&table_name)
        .ok_or_else(|| StoreError::other(format!("unknown table {table_name}")))?;

    let Some(where_clause) = where_clause else {
        let removed = table.rows.len() as u64;
        table.rows.clear();
        return Ok(removed);
    };

    if let Some(cols_and_select) = where_clause.trim().strip_prefix('(') {
        let (cols_text, rest) = cols_and_select
            .split_once(')')
            .ok_or_else(|| StoreError::other("unterminated tuple in WHERE"))?;
        let select_sql = rest
            .trim()
            .strip_prefix("IN (")
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| StoreError::other("expected IN (SELECT ...) after tuple"))?;
        let columns: Vec<usize> = cols_text
            .split(',')
            .filter_map(|c| table.column_index(c.trim()))
            .collect();
        let snapshot: HashMap<String, Table> =
            std::iter::once((table_name.clone(), table.clone())).collect();
        let keep_set = run_select(&snapshot, select_sql, params)?;
        let before = table.rows.len();
        table.rows.retain(|row| {
            !keep_set.iter().any(|candidate| {
                columns
                    .iter()
                    .enumerate()
                    .all(|(position, &index)| candidate.get(position) == row.get(index))
            })
        });
        return Ok((before - table.rows.len()) as u64);
    }

    let bound_columns: Vec<(usize, bool, String)> = where_clause
        .split(" AND ")
        .filter_map(|condition| {
            let condition = condition.trim();
            if let Some((lhs, rhs)) = condition.split_once("<>") {
                return table.column_index(lhs.trim()).map(|i| (i, true, rhs.trim().to_owned()));
            }
            let (lhs, rhs) = condition.split_once('=')?;
            table.column_index(lhs.trim()).map(|i| (i, false, rhs.trim().to_owned()))
        })
        .collect();
    let before = table.rows.len();
    table.rows.retain(|row| {
        !bound_columns.iter().all(|(index, negated, token)| {
            let expected = resolve_param(params, token);
            let actual = row.get(*index).cloned();
            if *negated {
                actual != expected
            } else {
                actual == expected
            }
        })
    });
    Ok((before - table.rows.len()) as u64)
}

struct VecCursor {
    rows: std::vec::IntoIter<Row>,
    column_names: Vec<String>,
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next_row(&mut self) -> Result<Option<Row>, StoreError> {
        Ok(self.rows.next())
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }
}

/// Buffers writes against a snapshot taken at `begin_transaction` and only
/// folds them back into the store's shared tables on `commit`, so a
/// `rollback` (or a dropped transaction) leaves the store exactly as it was.
struct InMemoryTransaction {
    store: Arc<Mutex<HashMap<String, Table>>>,
    snapshot: HashMap<String, Table>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        if sql.trim_start().starts_with("INSERT") {
            run_insert(&mut self.snapshot, sql, params)
        } else if sql.trim_start().starts_with("DELETE") {
            run_delete(&mut self.snapshot, sql, params)
        } else {
            Err(StoreError::other("fake store's transaction only supports INSERT/DELETE"))
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        *self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = self.snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn RowCursor>, StoreError> {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let rows = run_select(&tables, sql, params)?;
        Ok(Box::new(VecCursor { rows: rows.into_iter(), column_names: Vec::new() }))
    }

    async fn execute_ddl(&self, _sql: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let snapshot = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        Ok(Box::new(InMemoryTransaction { store: Arc::clone(&self.tables), snapshot }))
    }

    async fn cancel(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A quad's three term positions plus its graph, each reduced to a string
/// a blank node's label has already been rewritten into (spec.md §8's
/// round-trip property: "modulo blank-node renaming within solutions").
type CanonicalQuad = (String, String, String, String);

/// Compares two quad sets as multisets, treating blank nodes as equal up
/// to a consistent renaming rather than by their literal label. Used only
/// by round-trip tests (`INSERT DATA { S }` then reading `S` back) — the
/// translator and materializer never need this, since they never invent
/// or rename a blank node themselves.
#[must_use]
pub fn quads_isomorphic_modulo_blank_nodes(expected: &[Quad], actual: &[Quad]) -> bool {
    let mut expected = canonicalize(expected);
    let mut actual = canonicalize(actual);
    expected.sort();
    actual.sort();
    expected == actual
}

/// Assigns each distinct blank-node label a canonical `_:bN` name in the
/// order it is first seen while scanning the quads subject-then-object-
/// then-graph, left to right. Two quad lists that differ only in which
/// arbitrary labels their blank nodes carry collapse to the same sequence.
fn canonicalize(quads: &[Quad]) -> Vec<CanonicalQuad> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    quads
        .iter()
        .map(|quad| {
            (
                canonical_subject(&quad.subject, &mut labels),
                quad.predicate.as_str().to_owned(),
                canonical_term(&quad.object, &mut labels),
                canonical_graph(&quad.graph_name, &mut labels),
            )
        })
        .collect()
}

fn canonical_label(label: &str, labels: &mut HashMap<String, usize>) -> String {
    let next = labels.len();
    let index = *labels.entry(label.to_owned()).or_insert(next);
    format!("_:b{index}")
}

fn canonical_subject(subject: &NamedOrBlankNode, labels: &mut HashMap<String, usize>) -> String {
    match subject {
        NamedOrBlankNode::NamedNode(nn) => nn.to_string(),
        NamedOrBlankNode::BlankNode(bnode) => canonical_label(bnode.as_str(), labels),
    }
}

fn canonical_term(term: &Term, labels: &mut HashMap<String, usize>) -> String {
    match term {
        Term::NamedNode(nn) => nn.to_string(),
        Term::BlankNode(bnode) => canonical_label(bnode.as_str(), labels),
        Term::Literal(lit) => lit.to_string(),
    }
}

fn canonical_graph(graph: &GraphName, labels: &mut HashMap<String, usize>) -> String {
    match graph {
        GraphName::DefaultGraph => "DEFAULT".to_owned(),
        GraphName::NamedNode(nn) => nn.to_string(),
        GraphName::BlankNode(bnode) => canonical_label(bnode.as_str(), labels),
    }
}

#[cfg(test)]
mod isomorphism_tests {
    use super::*;
    use relquad_model::{BlankNode, NamedNode};

    fn quad_with_blank_object(subject: &str, blank_label: &str) -> Quad {
        Quad::new(
            NamedOrBlankNode::NamedNode(NamedNode::new_unchecked(subject)),
            NamedNode::new_unchecked("http://example.org/knows"),
            Term::BlankNode(BlankNode::new_unchecked(blank_label)),
            GraphName::DefaultGraph,
        )
    }

    #[test]
    fn quads_differing_only_by_blank_node_label_are_isomorphic() {
        let expected = vec![quad_with_blank_object("http://example.org/alice", "b0")];
        let actual = vec![quad_with_blank_object("http://example.org/alice", "xyz")];
        assert!(quads_isomorphic_modulo_blank_nodes(&expected, &actual));
    }

    #[test]
    fn quads_with_a_different_named_subject_are_not_isomorphic() {
        let expected = vec![quad_with_blank_object("http://example.org/alice", "b0")];
        let actual = vec![quad_with_blank_object("http://example.org/carol", "b0")];
        assert!(!quads_isomorphic_modulo_blank_nodes(&expected, &actual));
    }

    #[test]
    fn blank_node_correspondence_must_be_consistent_across_quads() {
        // Two blank nodes used consistently (b0 appears as both the first
        // quad's object and, renamed, would need to reappear the same way)
        // versus a set where the second occurrence maps to a different label.
        let expected = vec![
            quad_with_blank_object("http://example.org/alice", "b0"),
            quad_with_blank_object("http://example.org/bob", "b0"),
        ];
        let consistent = vec![
            quad_with_blank_object("http://example.org/alice", "x"),
            quad_with_blank_object("http://example.org/bob", "x"),
        ];
        let inconsistent = vec![
            quad_with_blank_object("http://example.org/alice", "x"),
            quad_with_blank_object("http://example.org/bob", "y"),
        ];
        assert!(quads_isomorphic_modulo_blank_nodes(&expected, &consistent));
        assert!(!quads_isomorphic_modulo_blank_nodes(&expected, &inconsistent));
    }
}

use crate::context::TranslationContext;
use crate::expr::compile_ebv;
use crate::fragment::{SqlFragment, VariableColumn};
use crate::paths::translate_path;
use relquad_algebra::{build_algebra, AliasGenerator, AliasRole, Modifier};
use relquad_common::error::RelquadResult;
use relquad_common::RelquadError;
use relquad_model::{Expression, NamedNodePattern, TermPattern, TermValue, Variable};
use relquad_schema::columns::rdf_quad;
use relquad_schema::TermId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which graph a `Bgp`/`PathTriple` under the current scope reads from
/// (spec.md §4.6): the reserved default graph, a named graph fixed at
/// translation time (`GRAPH <iri>`), or a graph bound to a variable
/// (`GRAPH ?g`), which ties every quad reference's `context_uuid` back to
/// that variable's column.
#[derive(Clone)]
enum GraphContext {
    Default,
    Named(TermId),
    Variable(Variable),
}

/// Recursively translates an algebra node into a [`SqlFragment`]
/// (spec.md §4.6). `aliases` mints fresh identifiers for this node's own
/// quad/term references; children that need isolation (the right side of
/// a `LeftJoin`, either side of a `Union`, a `Minus`'s right side, a
/// `Subquery`) get a [`AliasGenerator::child`] scope instead of sharing
/// this one, since their bindings must not leak untransformed into the
/// parent.
pub fn translate_node(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    node: &relquad_algebra::AlgebraNode,
) -> RelquadResult<SqlFragment> {
    translate_in_graph(ctx, aliases, node, &GraphContext::Default)
}

fn translate_in_graph(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    node: &relquad_algebra::AlgebraNode,
    graph: &GraphContext,
) -> RelquadResult<SqlFragment> {
    use relquad_algebra::AlgebraNode;

    match node {
        AlgebraNode::Bgp(triples) => translate_bgp(ctx, aliases, triples, graph),
        AlgebraNode::PathTriple { subject, path, object } => {
            let condition = graph_condition_template(ctx, graph);
            translate_path(ctx, aliases, subject, path, object, condition.as_deref())
        }
        AlgebraNode::Join(left, right) => {
            let left = translate_in_graph(ctx, aliases, left, graph)?;
            let right = translate_in_graph(ctx, aliases, right, graph)?;
            Ok(merge_join(left, right))
        }
        AlgebraNode::LeftJoin(left, right, filter) => {
            translate_left_join(ctx, aliases, left, right, filter.as_ref(), graph)
        }
        AlgebraNode::Union(left, right) => translate_union(ctx, aliases, left, right, graph),
        AlgebraNode::Graph(term, inner) => translate_graph(ctx, aliases, term, inner),
        AlgebraNode::Filter(expr, inner) => {
            let mut fragment = translate_in_graph(ctx, aliases, inner, graph)?;
            let condition = compile_filter_condition(ctx, aliases, graph, &fragment.bindings, expr)?;
            fragment.where_conditions.push(condition);
            Ok(fragment)
        }
        AlgebraNode::Extend(var, expr, inner) => {
            let mut fragment = translate_in_graph(ctx, aliases, inner, graph)?;
            let compiled = crate::expr::compile_expression(ctx, &fragment.bindings, expr)?;
            fragment
                .bindings
                .insert(var.clone(), VariableColumn::computed(compiled.sql));
            Ok(fragment)
        }
        AlgebraNode::Minus(left, right) => translate_minus(ctx, aliases, left, right, graph),
        AlgebraNode::Values(variables, rows) => translate_values(ctx, aliases, variables, rows),
        AlgebraNode::Subquery { inner, exposed, modifiers } => {
            translate_subquery(ctx, aliases, inner, exposed, modifiers)
        }
    }
}

/// The `context_uuid` equality text a quad alias must satisfy under the
/// current `GRAPH` scope, with `{alias}` left as a placeholder the caller
/// substitutes (callers mint their own alias after this template is
/// built, so the column reference cannot be known up front).
fn graph_condition_template(ctx: &TranslationContext<'_>, graph: &GraphContext) -> Option<String> {
    match graph {
        GraphContext::Default => {
            // The default graph is the reserved all-zero context, not a
            // content-addressed derivation of `default_graph_iri`
            // (SPEC_FULL.md §13(c)); the configured IRI is only a display
            // name for serialization, never part of this comparison.
            Some(format!(
                "{{alias}}.{} = {}",
                rdf_quad::CONTEXT_UUID,
                ctx.bind_uuid(TermId::DEFAULT_GRAPH)
            ))
        }
        GraphContext::Named(id) => Some(format!(
            "{{alias}}.{} = {}",
            rdf_quad::CONTEXT_UUID,
            ctx.bind_uuid(*id)
        )),
        GraphContext::Variable(_) => None,
    }
}

/// Compiles a `FILTER` expression, recognizing `EXISTS`/`NOT EXISTS`
/// (optionally combined with `&&`/`||`/negation) and routing those to a
/// correlated subquery instead of the plain expression compiler, which has
/// no pattern to translate `EXISTS { ... }`'s inner group against.
/// `EXISTS` nested any deeper (e.g. inside `IF(...)` or arithmetic) still
/// falls through to [`compile_ebv`], which rejects it.
fn compile_filter_condition(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    graph: &GraphContext,
    bindings: &BTreeMap<Variable, VariableColumn>,
    expr: &Expression,
) -> RelquadResult<String> {
    match expr {
        Expression::Exists(pattern) => {
            let correlated = translate_correlated_exists(ctx, aliases, bindings, graph, pattern)?;
            Ok(format!("EXISTS (SELECT 1 {})", correlated.render_from_clause()))
        }
        Expression::Not(inner) => match inner.as_ref() {
            Expression::Exists(pattern) => {
                let correlated = translate_correlated_exists(ctx, aliases, bindings, graph, pattern)?;
                Ok(format!("NOT EXISTS (SELECT 1 {})", correlated.render_from_clause()))
            }
            _ => Ok(format!("(NOT {})", compile_filter_condition(ctx, aliases, graph, bindings, inner)?)),
        },
        Expression::And(l, r) => Ok(format!(
            "({} AND {})",
            compile_filter_condition(ctx, aliases, graph, bindings, l)?,
            compile_filter_condition(ctx, aliases, graph, bindings, r)?
        )),
        Expression::Or(l, r) => Ok(format!(
            "({} OR {})",
            compile_filter_condition(ctx, aliases, graph, bindings, l)?,
            compile_filter_condition(ctx, aliases, graph, bindings, r)?
        )),
        _ => compile_ebv(ctx, bindings, expr),
    }
}

/// Translates `EXISTS { pattern }`'s inner group in its own alias scope
/// (so it can never collide with the outer query's aliases, even when two
/// `EXISTS` appear as siblings in the same `FILTER`), then correlates it
/// back to the enclosing scope by equating every variable the two sides
/// share — the same technique `translate_minus` uses for `NOT EXISTS`'s
/// untyped cousin, `MINUS`.
fn translate_correlated_exists(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    outer_bindings: &BTreeMap<Variable, VariableColumn>,
    graph: &GraphContext,
    pattern: &relquad_model::GraphPattern,
) -> RelquadResult<SqlFragment> {
    let algebra = build_algebra(pattern);
    let scope = aliases.next(AliasRole::Cte);
    let child_aliases = aliases.child(&format!("{}_", scope.as_str()));
    let mut inner = translate_in_graph(ctx, &child_aliases, &algebra, graph)?;
    for (var, outer_column) in outer_bindings {
        if let Some(inner_column) = inner.bindings.get(var) {
            inner
                .where_conditions
                .push(format!("{} = {}", outer_column.uuid_expr, inner_column.uuid_expr));
        }
    }
    Ok(inner)
}

fn translate_bgp(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    triples: &[relquad_algebra::AlgebraTriple],
    graph: &GraphContext,
) -> RelquadResult<SqlFragment> {
    let mut fragment = SqlFragment::new();
    let mut seen: BTreeMap<Variable, String> = BTreeMap::new();

    for triple in triples {
        let alias = aliases.next(AliasRole::Quad);
        fragment.from.push(format!("{} AS {alias}", ctx.rdf_quad_table));

        bind_position(ctx, &mut fragment, &mut seen, &alias, rdf_quad::SUBJECT_UUID, &triple.subject)?;
        bind_predicate(ctx, &mut fragment, &mut seen, &alias, &triple.predicate)?;
        bind_position(ctx, &mut fragment, &mut seen, &alias, rdf_quad::OBJECT_UUID, &triple.object)?;

        match graph {
            GraphContext::Default | GraphContext::Named(_) => {
                if let Some(condition) = graph_condition_template(ctx, graph) {
                    fragment.where_conditions.push(condition.replace("{alias}", alias.as_str()));
                }
            }
            GraphContext::Variable(var) => {
                let column = format!("{alias}.{}", rdf_quad::CONTEXT_UUID);
                unify_or_bind(&mut fragment, &mut seen, var.clone(), column);
            }
        }
    }
    Ok(fragment)
}

fn bind_position(
    ctx: &TranslationContext<'_>,
    fragment: &mut SqlFragment,
    seen: &mut BTreeMap<Variable, String>,
    alias: &relquad_algebra::Alias,
    column: &str,
    pattern: &TermPattern,
) -> RelquadResult<()> {
    let expr = format!("{alias}.{column}");
    match term_pattern_binding(pattern) {
        Some(var) => unify_or_bind(fragment, seen, var, expr),
        None => {
            let id = term_pattern_to_term_id(ctx, pattern)?;
            fragment.where_conditions.push(format!("{expr} = {}", ctx.bind_uuid(id)));
        }
    }
    Ok(())
}

fn bind_predicate(
    ctx: &TranslationContext<'_>,
    fragment: &mut SqlFragment,
    seen: &mut BTreeMap<Variable, String>,
    alias: &relquad_algebra::Alias,
    pattern: &NamedNodePattern,
) -> RelquadResult<()> {
    let expr = format!("{alias}.{}", rdf_quad::PREDICATE_UUID);
    match pattern {
        NamedNodePattern::Variable(var) => unify_or_bind(fragment, seen, var.clone(), expr),
        NamedNodePattern::NamedNode(nn) => {
            let id = TermId::from_term(&TermValue::from(nn.as_ref()));
            fragment.where_conditions.push(format!("{expr} = {}", ctx.bind_uuid(id)));
        }
    }
    Ok(())
}

fn unify_or_bind(fragment: &mut SqlFragment, seen: &mut BTreeMap<Variable, String>, var: Variable, expr: String) {
    if let Some(existing) = seen.get(&var) {
        fragment.where_conditions.push(format!("{existing} = {expr}"));
    } else {
        seen.insert(var.clone(), expr.clone());
        fragment.bindings.insert(var, VariableColumn::required(expr));
    }
}

/// `term_pattern_binding` reads a pattern's variable without needing the
/// translation context; only constant patterns need [`term_pattern_to_term_id`]'s
/// store-independent UUID derivation.
pub(crate) fn term_pattern_binding(pattern: &TermPattern) -> Option<Variable> {
    match pattern {
        TermPattern::Variable(var) => Some(var.clone()),
        _ => None,
    }
}

pub(crate) fn term_pattern_to_term_id(_ctx: &TranslationContext<'_>, pattern: &TermPattern) -> RelquadResult<TermId> {
    let value = match pattern {
        TermPattern::NamedNode(nn) => TermValue::from(nn.as_ref()),
        TermPattern::Literal(lit) => TermValue::from(lit.as_ref()),
        TermPattern::BlankNode(bnode) => TermValue::from(bnode.as_ref()),
        TermPattern::Variable(_) => {
            return Err(RelquadError::Type("expected a ground term, found a variable".to_owned()))
        }
    };
    Ok(TermId::from_term(&value))
}

fn merge_join(mut left: SqlFragment, right: SqlFragment) -> SqlFragment {
    for shared in left.bindings.keys().cloned().collect::<Vec<_>>() {
        if let Some(right_column) = right.bindings.get(&shared) {
            let left_column = left.bindings.get(&shared).expect("key from left.bindings");
            left.where_conditions.push(format!("{} = {}", left_column.uuid_expr, right_column.uuid_expr));
        }
    }
    left.merge_bindings_from(&right);
    left.from.extend(right.from);
    left.joins.extend(right.joins);
    left.where_conditions.extend(right.where_conditions);
    left
}

fn translate_left_join(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    left: &Arc<relquad_algebra::AlgebraNode>,
    right: &Arc<relquad_algebra::AlgebraNode>,
    filter: Option<&Expression>,
    graph: &GraphContext,
) -> RelquadResult<SqlFragment> {
    let mut outer = translate_in_graph(ctx, aliases, left, graph)?;
    let child_aliases = aliases.child("opt_");
    let right_fragment = translate_in_graph(ctx, &child_aliases, right, graph)?;

    let right_alias = aliases.next(AliasRole::Cte);
    let shared: Vec<Variable> = right_fragment
        .bindings
        .keys()
        .filter(|var| outer.bindings.contains_key(var))
        .cloned()
        .collect();

    let (derived_sql, column_names) = render_derived_table(&right_fragment);
    let mut on_conditions: Vec<String> = shared
        .iter()
        .map(|var| {
            format!(
                "{} = {right_alias}.{}",
                outer.bindings[var].uuid_expr,
                column_name(var)
            )
        })
        .collect();

    if let Some(filter) = filter {
        // The filter runs in the `ON` clause, where both the outer side's
        // own tables and the derived `{right_alias}` table are in scope,
        // but the right side's pre-flatten aliases (`opt_q0.*`) are not —
        // every right-side variable must be read back through the column
        // the derived table actually projects it as.
        let mut joined_bindings = outer.bindings.clone();
        for (var, column) in &right_fragment.bindings {
            joined_bindings.insert(
                var.clone(),
                VariableColumn {
                    uuid_expr: format!("{right_alias}.{}", column_name(var)),
                    term_alias: None,
                    nullable: column.nullable,
                    computed: column.computed,
                },
            );
        }
        on_conditions.push(compile_ebv(ctx, &joined_bindings, filter)?);
    }
    if on_conditions.is_empty() {
        on_conditions.push("TRUE".to_owned());
    }

    outer
        .joins
        .push(format!("LEFT JOIN ({derived_sql}) AS {right_alias} ON {}", on_conditions.join(" AND ")));

    for (var, name) in right_fragment.bindings.keys().zip(column_names) {
        outer
            .bindings
            .entry(var.clone())
            .or_insert_with(|| VariableColumn::required(format!("{right_alias}.{name}")).nullable());
    }
    Ok(outer)
}

fn column_name(var: &Variable) -> String {
    format!("{}_uuid", var.as_str())
}

/// Projects a fragment's bindings into a flat `SELECT ... FROM ...`
/// derived-table body, returning the SQL and the column names it exposes
/// (in the same order as the fragment's `bindings` map, which is a
/// `BTreeMap` and therefore already deterministic).
fn render_derived_table(fragment: &SqlFragment) -> (String, Vec<String>) {
    let mut select_list = Vec::new();
    let mut names = Vec::new();
    for (var, column) in &fragment.bindings {
        let name = column_name(var);
        select_list.push(format!("{} AS {name}", column.uuid_expr));
        names.push(name);
    }
    if select_list.is_empty() {
        select_list.push("NULL AS placeholder_".to_owned());
    }
    let body = fragment.render_from_clause();
    (format!("SELECT {} {body}", select_list.join(", ")), names)
}

fn translate_union(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    left: &Arc<relquad_algebra::AlgebraNode>,
    right: &Arc<relquad_algebra::AlgebraNode>,
    graph: &GraphContext,
) -> RelquadResult<SqlFragment> {
    let left_fragment = translate_in_graph(ctx, &aliases.child("u_l_"), left, graph)?;
    let right_fragment = translate_in_graph(ctx, &aliases.child("u_r_"), right, graph)?;

    let mut all_vars: Vec<Variable> = left_fragment.bindings.keys().cloned().collect();
    for var in right_fragment.bindings.keys() {
        if !all_vars.contains(var) {
            all_vars.push(var.clone());
        }
    }
    all_vars.sort();

    let left_select = render_union_branch(&left_fragment, &all_vars);
    let right_select = render_union_branch(&right_fragment, &all_vars);
    let alias = aliases.next(AliasRole::Cte);

    let mut fragment = SqlFragment::new();
    fragment.from.push(format!("(({left_select}) UNION ALL ({right_select})) AS {alias}"));
    for var in &all_vars {
        let nullable = !left_fragment.bindings.contains_key(var) || !right_fragment.bindings.contains_key(var);
        let mut column = VariableColumn::required(format!("{alias}.{}", column_name(var)));
        if nullable {
            column = column.nullable();
        }
        fragment.bindings.insert(var.clone(), column);
    }
    Ok(fragment)
}

fn render_union_branch(fragment: &SqlFragment, all_vars: &[Variable]) -> String {
    let select_list = all_vars
        .iter()
        .map(|var| match fragment.bindings.get(var) {
            Some(column) => format!("{} AS {}", column.uuid_expr, column_name(var)),
            None => format!("NULL AS {}", column_name(var)),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {select_list} {}", fragment.render_from_clause())
}

fn translate_minus(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    left: &Arc<relquad_algebra::AlgebraNode>,
    right: &Arc<relquad_algebra::AlgebraNode>,
    graph: &GraphContext,
) -> RelquadResult<SqlFragment> {
    let outer = translate_in_graph(ctx, aliases, left, graph)?;
    let right_fragment = translate_in_graph(ctx, &aliases.child("minus_"), right, graph)?;

    let shared: Vec<&Variable> = right_fragment
        .bindings
        .keys()
        .filter(|var| outer.bindings.contains_key(*var))
        .collect();

    // Spec.md §4.6: a `Minus` with no shared variables excludes nothing,
    // since the right side cannot be compared against the left at all.
    if shared.is_empty() {
        return Ok(outer);
    }

    let mut correlated = right_fragment.clone();
    for var in &shared {
        correlated.where_conditions.push(format!(
            "{} = {}",
            outer.bindings[*var].uuid_expr,
            correlated.bindings[*var].uuid_expr
        ));
    }

    let mut result = outer;
    result.where_conditions.push(format!(
        "NOT EXISTS (SELECT 1 {})",
        correlated.render_from_clause()
    ));
    Ok(result)
}

fn translate_graph(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    term: &TermPattern,
    inner: &Arc<relquad_algebra::AlgebraNode>,
) -> RelquadResult<SqlFragment> {
    let graph = match term_pattern_binding(term) {
        Some(var) => GraphContext::Variable(var),
        None => GraphContext::Named(term_pattern_to_term_id(ctx, term)?),
    };
    let fragment = translate_in_graph(ctx, aliases, inner, &graph)?;
    if let GraphContext::Variable(var) = graph {
        // The binding itself was already recorded per-quad by
        // `translate_bgp`/`translate_path`; nothing further to add here
        // beyond making sure the variable survived translation.
        debug_assert!(fragment.bindings.contains_key(&var) || matches!(&**inner, relquad_algebra::AlgebraNode::Values(..)));
    }
    Ok(fragment)
}

fn translate_values(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    variables: &[Variable],
    rows: &[Vec<Option<relquad_model::GroundTerm>>],
) -> RelquadResult<SqlFragment> {
    let alias = aliases.next(AliasRole::Cte);
    let column_names: Vec<String> = variables.iter().map(column_name).collect();
    let mut fragment = SqlFragment::new();

    if rows.is_empty() {
        let select_list = column_names
            .iter()
            .map(|name| format!("NULL::uuid AS {name}"))
            .collect::<Vec<_>>()
            .join(", ");
        fragment.from.push(format!("(SELECT {select_list} WHERE FALSE) AS {alias}"));
    } else {
        let mut branches = Vec::with_capacity(rows.len());
        for row in rows {
            let mut select_list = Vec::with_capacity(row.len());
            for (value, name) in row.iter().zip(&column_names) {
                let cell = match value {
                    Some(term) => ctx.bind_uuid(TermId::from_term(&ground_term_value(term))),
                    None => "NULL".to_owned(),
                };
                select_list.push(format!("{cell} AS {name}"));
            }
            branches.push(format!("SELECT {}", select_list.join(", ")));
        }
        fragment.from.push(format!("({}) AS {alias}", branches.join(" UNION ALL ")));
    }

    for (var, name) in variables.iter().zip(&column_names) {
        fragment
            .bindings
            .insert(var.clone(), VariableColumn::required(format!("{alias}.{name}")).nullable());
    }
    Ok(fragment)
}

fn ground_term_value(term: &relquad_model::GroundTerm) -> TermValue {
    match term {
        relquad_model::GroundTerm::NamedNode(nn) => TermValue::from(nn.as_ref()),
        relquad_model::GroundTerm::Literal(lit) => TermValue::from(lit.as_ref()),
        #[allow(unreachable_patterns)]
        _ => TermValue::iri(""),
    }
}

/// Translates an isolated `SELECT` subquery, applying `modifiers` inside
/// its own derived table the same way `translate_select` applies the
/// outermost query's modifiers — a nested `{ SELECT ?x WHERE {...} ORDER
/// BY ?x LIMIT 1 }` must sort and truncate before it ever joins back into
/// the enclosing pattern, not after.
fn translate_subquery(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    inner: &Arc<relquad_algebra::AlgebraNode>,
    exposed: &[Variable],
    modifiers: &[Modifier],
) -> RelquadResult<SqlFragment> {
    let child_aliases = aliases.child("sub_");
    let inner_fragment = translate_in_graph(ctx, &child_aliases, inner, &GraphContext::Default)?;
    let alias = aliases.next(AliasRole::Cte);

    let inner_sql = crate::modifiers::render_select(ctx, &inner_fragment, modifiers, exposed)?;
    let aggregates = modifiers.iter().find_map(|m| match m {
        Modifier::Group { aggregates, .. } => Some(aggregates),
        _ => None,
    });

    let mut fragment = SqlFragment::new();
    fragment.from.push(format!("({inner_sql}) AS {alias}"));
    for var in exposed {
        let is_aggregate = aggregates.is_some_and(|aggs| aggs.iter().any(|(name, _)| name == var));
        if is_aggregate {
            let mut column = VariableColumn::required(format!("{alias}.{}", var.as_str()));
            column.computed = true;
            fragment.bindings.insert(var.clone(), column);
        } else if let Some(inner_column) = inner_fragment.bindings.get(var) {
            let mut column = VariableColumn::required(format!("{alias}.{}", var.as_str()));
            column.computed = inner_column.computed;
            if inner_column.nullable {
                column = column.nullable();
            }
            fragment.bindings.insert(var.clone(), column);
        }
    }
    Ok(fragment)
}

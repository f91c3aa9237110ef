use crate::context::TranslationContext;
use crate::fragment::{SqlFragment, VariableColumn};
use crate::pattern::term_pattern_binding;
use relquad_algebra::{AliasGenerator, AliasRole};
use relquad_common::error::RelquadResult;
use relquad_model::{PropertyPathExpression, TermPattern};
use relquad_schema::columns::{rdf_quad, term as term_cols};
use relquad_schema::TermId;

/// One `rdf_quad`-shaped step relation a path compiles down to: a subject
/// column and object column, already restricted to the predicates the
/// path allows and (for `WITH RECURSIVE` paths) to the context the
/// enclosing `GRAPH` clause names.
struct StepRelation {
    from: String,
    where_conditions: Vec<String>,
    subject_col: String,
    object_col: String,
}

/// Translates a property path triple (spec.md §4.6's path table) into a
/// fragment exposing the path's `subject`/`object` bindings. Recursive
/// path operators (`+`, `*`) compile to a `WITH RECURSIVE` CTE bounded by
/// `config.default_recursion_limit` (spec.md §5's cycle-prevention
/// invariant); the other operators rewrite structurally in terms of the
/// base step relation.
pub fn translate_path(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    subject: &TermPattern,
    path: &PropertyPathExpression,
    object: &TermPattern,
    graph_condition: Option<&str>,
) -> RelquadResult<SqlFragment> {
    let step = compile_step(ctx, aliases, path, graph_condition)?;
    let mut fragment = SqlFragment::new();
    fragment.from.push(step.from);
    fragment.where_conditions.extend(step.where_conditions);

    bind_path_endpoint(ctx, &mut fragment, subject, &step.subject_col)?;
    bind_path_endpoint(ctx, &mut fragment, object, &step.object_col)?;
    Ok(fragment)
}

fn bind_path_endpoint(
    ctx: &TranslationContext<'_>,
    fragment: &mut SqlFragment,
    pattern: &TermPattern,
    column: &str,
) -> RelquadResult<()> {
    match term_pattern_binding(pattern) {
        Some(var) => {
            fragment.bindings.insert(var, VariableColumn::required(column));
        }
        None => {
            // Ground term: constrain this endpoint rather than bind a variable.
            let constant = ground_term_id(ctx, pattern)?;
            fragment
                .where_conditions
                .push(format!("{column} = {}", ctx.bind_uuid(constant)));
        }
    }
    Ok(())
}

fn ground_term_id(ctx: &TranslationContext<'_>, pattern: &TermPattern) -> RelquadResult<TermId> {
    crate::pattern::term_pattern_to_term_id(ctx, pattern)
}

/// Builds the step relation a path operator reads from: either the base
/// `rdf_quad` table restricted to a predicate set, or a derived/recursive
/// relation for path composition.
fn compile_step(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    path: &PropertyPathExpression,
    graph_condition: Option<&str>,
) -> RelquadResult<StepRelation> {
    match path {
        PropertyPathExpression::NamedNode(predicate) => {
            let alias = aliases.next(AliasRole::Quad);
            let predicate_id = TermId::from_term(&relquad_model::TermValue::from(predicate.as_ref()));
            let mut conditions = vec![format!(
                "{alias}.{} = {}",
                rdf_quad::PREDICATE_UUID,
                ctx.bind_uuid(predicate_id)
            )];
            if let Some(graph_condition) = graph_condition {
                conditions.push(graph_condition.replace("{alias}", alias.as_str()));
            }
            Ok(StepRelation {
                from: format!("{} AS {alias}", ctx.rdf_quad_table),
                where_conditions: conditions,
                subject_col: format!("{alias}.{}", rdf_quad::SUBJECT_UUID),
                object_col: format!("{alias}.{}", rdf_quad::OBJECT_UUID),
            })
        }
        PropertyPathExpression::Reverse(inner) => {
            let step = compile_step(ctx, aliases, inner, graph_condition)?;
            Ok(StepRelation {
                from: step.from,
                where_conditions: step.where_conditions,
                subject_col: step.object_col,
                object_col: step.subject_col,
            })
        }
        PropertyPathExpression::Sequence(first, second) => {
            let left = compile_step(ctx, aliases, first, graph_condition)?;
            let right = compile_step(ctx, aliases, second, graph_condition)?;
            let mut where_conditions = left.where_conditions;
            where_conditions.extend(right.where_conditions);
            where_conditions.push(format!("{} = {}", left.object_col, right.subject_col));
            Ok(StepRelation {
                from: format!("{}, {}", left.from, right.from),
                where_conditions,
                subject_col: left.subject_col,
                object_col: right.object_col,
            })
        }
        PropertyPathExpression::Alternative(first, second) => {
            let alias = aliases.next(AliasRole::Cte);
            let left = render_step_as_select(ctx, aliases, first, graph_condition)?;
            let right = render_step_as_select(ctx, aliases, second, graph_condition)?;
            Ok(StepRelation {
                from: format!("(({left}) UNION ({right})) AS {alias}"),
                where_conditions: Vec::new(),
                subject_col: format!("{alias}.subject_uuid"),
                object_col: format!("{alias}.object_uuid"),
            })
        }
        PropertyPathExpression::ZeroOrOne(inner) => {
            let alias = aliases.next(AliasRole::Cte);
            let step = render_step_as_select(ctx, aliases, inner, graph_condition)?;
            let identity = identity_select(ctx);
            Ok(StepRelation {
                from: format!("(({step}) UNION ({identity})) AS {alias}"),
                where_conditions: Vec::new(),
                subject_col: format!("{alias}.subject_uuid"),
                object_col: format!("{alias}.object_uuid"),
            })
        }
        PropertyPathExpression::ZeroOrMore(inner) => {
            compile_recursive(ctx, aliases, inner, graph_condition, true)
        }
        PropertyPathExpression::OneOrMore(inner) => {
            compile_recursive(ctx, aliases, inner, graph_condition, false)
        }
        PropertyPathExpression::NegatedPropertySet(predicates) => {
            let alias = aliases.next(AliasRole::Quad);
            let excluded = predicates
                .iter()
                .map(|nn| ctx.bind_uuid(TermId::from_term(&relquad_model::TermValue::from(nn.as_ref()))))
                .collect::<Vec<_>>()
                .join(", ");
            let mut conditions = vec![format!(
                "{alias}.{} NOT IN ({excluded})",
                rdf_quad::PREDICATE_UUID
            )];
            if let Some(graph_condition) = graph_condition {
                conditions.push(graph_condition.replace("{alias}", alias.as_str()));
            }
            Ok(StepRelation {
                from: format!("{} AS {alias}", ctx.rdf_quad_table),
                where_conditions: conditions,
                subject_col: format!("{alias}.{}", rdf_quad::SUBJECT_UUID),
                object_col: format!("{alias}.{}", rdf_quad::OBJECT_UUID),
            })
        }
    }
}

fn render_step_as_select(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    path: &PropertyPathExpression,
    graph_condition: Option<&str>,
) -> RelquadResult<String> {
    let step = compile_step(ctx, aliases, path, graph_condition)?;
    let where_clause = if step.where_conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", step.where_conditions.join(" AND "))
    };
    Ok(format!(
        "SELECT {} AS subject_uuid, {} AS object_uuid FROM {}{where_clause}",
        step.subject_col, step.object_col, step.from
    ))
}

fn identity_select(ctx: &TranslationContext<'_>) -> String {
    format!(
        "SELECT {uuid} AS subject_uuid, {uuid} AS object_uuid FROM {table}",
        uuid = term_cols::TERM_UUID,
        table = ctx.term_table,
    )
}

/// `path+` and `path*` via `WITH RECURSIVE`, capped at
/// `config.default_recursion_limit` hops (spec.md §5): the recursive
/// member joins one more base step and increments a depth counter that
/// the outer query filters on, which also doubles as cycle prevention
/// since a cyclic path can otherwise recurse forever.
fn compile_recursive(
    ctx: &TranslationContext<'_>,
    aliases: &AliasGenerator,
    inner: &PropertyPathExpression,
    graph_condition: Option<&str>,
    zero_or_more: bool,
) -> RelquadResult<StepRelation> {
    let cte_alias = aliases.next(AliasRole::Cte);
    let step_alias = aliases.next(AliasRole::PathStep);
    let base = render_step_as_select(ctx, aliases, inner, graph_condition)?;
    let limit = ctx.config.default_recursion_limit();

    let base_member = if zero_or_more {
        format!(
            "SELECT {uuid} AS subject_uuid, {uuid} AS object_uuid, 0 AS depth FROM {table} \
             UNION ALL SELECT subject_uuid, object_uuid, 1 FROM ({base}) AS base0",
            uuid = term_cols::TERM_UUID,
            table = ctx.term_table,
        )
    } else {
        format!("SELECT subject_uuid, object_uuid, 1 AS depth FROM ({base}) AS base0")
    };

    let recursive_member = format!(
        "SELECT {cte_alias}.subject_uuid, {step_alias}.object_uuid, {cte_alias}.depth + 1 \
         FROM {cte_alias} JOIN ({base}) AS {step_alias} \
         ON {cte_alias}.object_uuid = {step_alias}.subject_uuid \
         WHERE {cte_alias}.depth < {limit}"
    );

    let cte_select = format!(
        "SELECT DISTINCT subject_uuid, object_uuid FROM {cte_alias}"
    );

    Ok(StepRelation {
        from: format!(
            "(WITH RECURSIVE {cte_alias}(subject_uuid, object_uuid, depth) AS \
             ({base_member} UNION ALL {recursive_member}) {cte_select}) AS {cte_alias}_r"
        ),
        where_conditions: Vec::new(),
        subject_col: format!("{cte_alias}_r.subject_uuid"),
        object_col: format!("{cte_alias}_r.object_uuid"),
    })
}

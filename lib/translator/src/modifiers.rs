use crate::context::TranslationContext;
use crate::expr::compile_expression;
use crate::fragment::{SqlFragment, VariableColumn};
use relquad_algebra::Modifier;
use relquad_common::error::RelquadResult;
use relquad_common::RelquadError;
use relquad_model::{AggregateExpression, Expression, Function, OrderExpression, Variable};
use std::fmt::Write as _;

/// Wraps a translated pattern's [`SqlFragment`] with the solution
/// modifiers spargebra nested around it (spec.md §4.7): `GROUP BY` and
/// its aggregates, `ORDER BY`, `DISTINCT`/`REDUCED`, `LIMIT`/`OFFSET`, and
/// the final projection list. `REDUCED` is treated as `DISTINCT`, since a
/// relational engine gives no cheaper way to honor the "may deduplicate"
/// hint (documented as a simplification).
pub fn render_select(
    ctx: &TranslationContext<'_>,
    fragment: &SqlFragment,
    modifiers: &[Modifier],
    default_projection: &[Variable],
) -> RelquadResult<String> {
    let group = modifiers.iter().find_map(|m| match m {
        Modifier::Group { variables, aggregates } => Some((variables, aggregates)),
        _ => None,
    });

    let distinct = modifiers
        .iter()
        .any(|m| matches!(m, Modifier::Distinct | Modifier::Reduced));

    let projected = modifiers
        .iter()
        .find_map(|m| match m {
            Modifier::Project(vars) => Some(vars.as_slice()),
            _ => None,
        })
        .unwrap_or(default_projection);

    let mut sql = String::new();
    let _ = write!(sql, "SELECT {}", if distinct { "DISTINCT " } else { "" });

    let select_list = match group {
        Some((group_vars, aggregates)) => render_grouped_select_list(ctx, fragment, group_vars, aggregates, projected)?,
        None => render_plain_select_list(fragment, projected)?,
    };
    sql.push_str(&select_list.join(", "));
    sql.push(' ');
    sql.push_str(&fragment.render_from_clause());

    if let Some((group_vars, _)) = group {
        if !group_vars.is_empty() {
            let columns = group_vars
                .iter()
                .map(|var| lookup_column(fragment, var).map(|c| c.uuid_expr.clone()))
                .collect::<RelquadResult<Vec<_>>>()?;
            let _ = write!(sql, " GROUP BY {}", columns.join(", "));
        }
    }

    if let Some(order_by) = modifiers.iter().find_map(|m| match m {
        Modifier::OrderBy(exprs) => Some(exprs),
        _ => None,
    }) {
        let clauses = render_order_by(ctx, fragment, order_by)?;
        if !clauses.is_empty() {
            let _ = write!(sql, " ORDER BY {}", clauses.join(", "));
        }
    }

    if let Some(Modifier::Slice { start, length }) = modifiers.iter().find(|m| matches!(m, Modifier::Slice { .. })) {
        if let Some(length) = length {
            let _ = write!(sql, " LIMIT {length}");
        }
        if *start > 0 {
            let _ = write!(sql, " OFFSET {start}");
        }
    }

    Ok(sql)
}

fn lookup_column<'a>(fragment: &'a SqlFragment, var: &Variable) -> RelquadResult<&'a VariableColumn> {
    fragment
        .bindings
        .get(var)
        .ok_or_else(|| RelquadError::Type(format!("?{} is not in scope for this projection", var.as_str())))
}

fn render_plain_select_list(fragment: &SqlFragment, projected: &[Variable]) -> RelquadResult<Vec<String>> {
    projected
        .iter()
        .map(|var| {
            lookup_column(fragment, var).map(|column| format!("{} AS {}", column.uuid_expr, output_name(var)))
        })
        .collect()
}

fn render_grouped_select_list(
    ctx: &TranslationContext<'_>,
    fragment: &SqlFragment,
    group_vars: &[Variable],
    aggregates: &[(Variable, AggregateExpression)],
    projected: &[Variable],
) -> RelquadResult<Vec<String>> {
    let mut list = Vec::new();
    for var in projected {
        if group_vars.contains(var) {
            let column = lookup_column(fragment, var)?;
            list.push(format!("{} AS {}", column.uuid_expr, output_name(var)));
        } else if let Some((_, aggregate)) = aggregates.iter().find(|(name, _)| name == var) {
            list.push(format!("{} AS {}", compile_aggregate(ctx, fragment, aggregate)?, output_name(var)));
        } else {
            return Err(RelquadError::Type(format!(
                "?{} is neither grouped nor aggregated",
                var.as_str()
            )));
        }
    }
    Ok(list)
}

fn compile_aggregate(
    ctx: &TranslationContext<'_>,
    fragment: &SqlFragment,
    aggregate: &AggregateExpression,
) -> RelquadResult<String> {
    let distinct_kw = |distinct: bool| if distinct { "DISTINCT " } else { "" };
    match aggregate {
        AggregateExpression::CountSolutions { distinct: _ } => Ok("COUNT(*)".to_owned()),
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Count, expr, distinct } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("COUNT({}{value})", distinct_kw(*distinct)))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Sum, expr, distinct } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("SUM({}CAST({value} AS DOUBLE PRECISION))", distinct_kw(*distinct)))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Avg, expr, distinct } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("AVG({}CAST({value} AS DOUBLE PRECISION))", distinct_kw(*distinct)))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Min, expr, distinct } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("MIN({}{value})", distinct_kw(*distinct)))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Max, expr, distinct } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("MAX({}{value})", distinct_kw(*distinct)))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Sample, expr, distinct: _ } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            Ok(format!("MIN({value})"))
        }
        AggregateExpression::FunctionCall {
            name: relquad_model::AggregateFunction::GroupConcat { separator },
            expr,
            distinct,
        } => {
            let value = compile_expression(ctx, &fragment.bindings, expr)?.sql;
            let sep = separator.clone().unwrap_or_else(|| " ".to_owned());
            Ok(format!(
                "STRING_AGG({}{value}, '{}')",
                distinct_kw(*distinct),
                sep.replace('\'', "''")
            ))
        }
        AggregateExpression::FunctionCall { name: relquad_model::AggregateFunction::Custom(name), .. } => {
            Err(RelquadError::unsupported_feature(format!("custom aggregate {}", name.as_str())))
        }
    }
}

fn render_order_by(
    ctx: &TranslationContext<'_>,
    fragment: &SqlFragment,
    order_by: &[OrderExpression],
) -> RelquadResult<Vec<String>> {
    order_by
        .iter()
        .map(|item| match item {
            OrderExpression::Asc(expr) => Ok(format!("{} ASC", order_by_column(ctx, fragment, expr)?)),
            OrderExpression::Desc(expr) => Ok(format!("{} DESC", order_by_column(ctx, fragment, expr)?)),
        })
        .collect()
}

/// Language tags are case-insensitive (RFC 5646), so ordering by `LANG(?x)`
/// compares lower-cased text rather than the tag's literal casing.
fn order_by_column(ctx: &TranslationContext<'_>, fragment: &SqlFragment, expr: &Expression) -> RelquadResult<String> {
    let sql = compile_expression(ctx, &fragment.bindings, expr)?.sql;
    match expr {
        Expression::FunctionCall(Function::Lang, _) => Ok(format!("LOWER({sql})")),
        _ => Ok(sql),
    }
}


fn output_name(var: &Variable) -> String {
    var.as_str().to_owned()
}

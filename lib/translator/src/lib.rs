//! Translates a SPARQL algebra tree into one parameterized SQL statement
//! against the quad/term schema (spec.md §4.5-§4.7): the expression
//! compiler, the recursive pattern translator, property-path CTEs, and
//! solution modifiers. Form dispatch (`SELECT`/`ASK`/`CONSTRUCT`/
//! `DESCRIBE`) and execution against a [`relquad_common::RelationalStore`]
//! live in `relquad-execution`; this crate only produces SQL text plus
//! its bind parameters.

mod context;
mod expr;
mod fragment;
mod modifiers;
mod paths;
mod pattern;

pub use context::{root_alias_generator, TranslationContext};
pub use expr::{compile_ebv, compile_expression, CompiledExpr};
pub use fragment::{SqlFragment, VariableColumn};
pub use pattern::translate_node;

use relquad_algebra::{build_algebra, peel_modifiers};
use relquad_common::error::RelquadResult;
use relquad_common::{RelquadConfig, SqlValue};
use relquad_model::{GraphPattern, Variable};

/// Translates a `SELECT`/`CONSTRUCT`/`DESCRIBE` query's `WHERE` pattern
/// into a single `SELECT` statement, honoring the outermost solution
/// modifiers (`DISTINCT`, `ORDER BY`, `LIMIT`/`OFFSET`, `GROUP BY`) the
/// parser left nested around the core pattern.
pub fn translate_select(
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &GraphPattern,
) -> RelquadResult<(String, Vec<SqlValue>)> {
    let (modifiers, core) = peel_modifiers(pattern);
    let algebra = build_algebra(core);
    let ctx = TranslationContext::new(term_table, rdf_quad_table, config);
    let aliases = root_alias_generator();
    let fragment = translate_node(&ctx, &aliases, &algebra)?;

    let default_projection: Vec<Variable> = algebra.visible_variables().into_iter().collect();
    let sql = modifiers::render_select(&ctx, &fragment, &modifiers, &default_projection)?;
    Ok((sql, ctx.into_params()))
}

/// Translates an `ASK` query's pattern into `SELECT EXISTS(...)`
/// (spec.md §4.8): the pattern is translated exactly as for `SELECT`,
/// wrapped in an existence check rather than a row-producing select list.
pub fn translate_ask(
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &GraphPattern,
) -> RelquadResult<(String, Vec<SqlValue>)> {
    let (_, core) = peel_modifiers(pattern);
    let algebra = build_algebra(core);
    let ctx = TranslationContext::new(term_table, rdf_quad_table, config);
    let aliases = root_alias_generator();
    let fragment = translate_node(&ctx, &aliases, &algebra)?;
    let sql = format!("SELECT EXISTS(SELECT 1 {}) AS answer", fragment.render_from_clause());
    Ok((sql, ctx.into_params()))
}

/// Translates a `WHERE` pattern for `CONSTRUCT`/`DESCRIBE` dispatch in
/// `relquad-execution`, honoring the same outermost solution modifiers
/// `translate_select` does (`CONSTRUCT { ... } WHERE { ... } ORDER BY ...
/// LIMIT ...` still sorts and truncates the solutions the template is
/// instantiated against). The returned variable list is the solution's
/// actual projection — `Project` if the pattern specifies one, otherwise
/// every visible variable — for the caller to materialize bindings by.
pub fn translate_pattern(
    config: &RelquadConfig,
    term_table: &str,
    rdf_quad_table: &str,
    pattern: &GraphPattern,
) -> RelquadResult<(String, Vec<SqlValue>, Vec<Variable>)> {
    let (modifiers, core) = peel_modifiers(pattern);
    let algebra = build_algebra(core);
    let ctx = TranslationContext::new(term_table, rdf_quad_table, config);
    let aliases = root_alias_generator();
    let fragment = translate_node(&ctx, &aliases, &algebra)?;

    let default_projection: Vec<Variable> = algebra.visible_variables().into_iter().collect();
    let projection = modifiers
        .iter()
        .find_map(|m| match m {
            relquad_algebra::Modifier::Project(vars) => Some(vars.clone()),
            _ => None,
        })
        .unwrap_or_else(|| default_projection.clone());

    let sql = modifiers::render_select(&ctx, &fragment, &modifiers, &default_projection)?;
    Ok((sql, ctx.into_params(), projection))
}
